//! CLI command definitions and handlers.

use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::ResearchConfig;
use crate::orchestrator::Orchestrator;
use crate::registry::TaskStatus;
use crate::sources::Depth;

/// Research task orchestrator.
#[derive(Debug, Parser)]
#[command(name = "research-forge", version, about)]
pub struct Cli {
    /// Log level when RUST_LOG is not set (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a research task to completion, printing progress.
    Run {
        /// Research topic.
        topic: String,

        /// Research depth: quick, medium or comprehensive. Unrecognized
        /// values fall back to quick.
        #[arg(long, default_value = "medium")]
        depth: String,

        /// Interval between status polls, in milliseconds.
        #[arg(long, default_value_t = 500)]
        poll_ms: u64,
    },

    /// Print the effective configuration as JSON.
    Config,
}

/// Parses CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Runs the parsed CLI command.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let config = ResearchConfig::from_env().context("invalid configuration")?;

    match cli.command {
        Command::Run {
            topic,
            depth,
            poll_ms,
        } => run_task(config, &topic, &depth, poll_ms).await,
        Command::Config => print_config(&config),
    }
}

async fn run_task(
    config: ResearchConfig,
    topic: &str,
    depth: &str,
    poll_ms: u64,
) -> anyhow::Result<()> {
    let depth = Depth::parse_lenient(depth);
    let orchestrator = Orchestrator::new(config);

    println!("Starting research: {topic} (depth: {depth})");
    let receipt = orchestrator.start(topic, depth).await;
    println!("Task {} started", receipt.task_id);

    let status = loop {
        tokio::time::sleep(Duration::from_millis(poll_ms.max(10))).await;

        let status = orchestrator
            .status(receipt.task_id)
            .await
            .context("task disappeared from registry")?;
        println!(
            "  progress: {:>3}%  status: {}  elapsed: {}ms",
            status.progress, status.status, status.duration_ms
        );

        if status.status.is_terminal() {
            break status;
        }
    };

    match status.status {
        TaskStatus::Completed => {
            println!(
                "Research completed in {:.1}s",
                status.duration_ms as f64 / 1000.0
            );
        }
        other => {
            println!("Research ended with status: {other}");
            let task = orchestrator
                .registry()
                .get(receipt.task_id)
                .await
                .context("task disappeared from registry")?;
            for error in &task.errors {
                println!("  error: {error}");
            }
        }
    }

    println!("All tasks:");
    for summary in orchestrator.list(None).await {
        println!(
            "  #{} [{}] {}",
            summary.id, summary.status, summary.topic
        );
    }

    Ok(())
}

fn print_config(config: &ResearchConfig) -> anyhow::Result<()> {
    let view = serde_json::json!({
        "depth": config.depth,
        "parallel": config.parallel,
        "timeout_secs": config.timeout.as_secs(),
        "retry": config.retry,
        "sources": config.sources,
        "reports_dir": config.reports_dir,
    });
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}
