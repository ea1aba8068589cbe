//! Public orchestrator API: start, status, list, stop.
//!
//! This is the boundary the surrounding CLI or tool layer consumes. `start`
//! returns before the pipeline finishes; progress is observed through
//! `status` and `list`.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::config::ResearchConfig;
use crate::error::OrchestratorError;
use crate::pipeline::PipelineEngine;
use crate::registry::{TaskId, TaskRegistry, TaskStatus, TaskSummary};
use crate::report::{FileReportSink, ReportSink};
use crate::sources::{Depth, SourceFetcher, StubSourceFetcher};
use crate::stages::{
    HeuristicPlanner, MarkdownSynthesizer, PassThroughVerifier, Planner, Synthesizer, Verifier,
};

/// Acknowledgement returned by [`Orchestrator::start`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartReceipt {
    pub task_id: TaskId,
    pub topic: String,
    /// Always `"started"`; the pipeline outcome is reported via `status`.
    pub status: &'static str,
}

/// Point-in-time view of a task returned by [`Orchestrator::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskStatusView {
    pub id: TaskId,
    pub topic: String,
    pub status: TaskStatus,
    /// Completed stages over the four total, as a percentage
    /// (0, 25, 50, 75 or 100).
    pub progress: u8,
    /// Wall-clock time elapsed, in milliseconds; live while running.
    pub duration_ms: u64,
}

/// Acknowledgement returned by [`Orchestrator::stop`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopReceipt {
    pub id: TaskId,
    pub status: TaskStatus,
}

/// The research task orchestrator.
///
/// Owns the task registry and the pipeline engine; collaborators are
/// injected through [`OrchestratorBuilder`], with placeholder
/// implementations by default.
pub struct Orchestrator {
    config: Arc<ResearchConfig>,
    registry: Arc<TaskRegistry>,
    engine: Arc<PipelineEngine>,
}

impl Orchestrator {
    /// Creates an orchestrator with the default placeholder collaborators.
    pub fn new(config: ResearchConfig) -> Self {
        OrchestratorBuilder::new().config(config).build()
    }

    /// Returns a builder for collaborator injection.
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Starts a new research task and returns immediately.
    ///
    /// The pipeline run is spawned onto the runtime (fire-and-track); any
    /// failure it hits is recorded on the task, never surfaced here.
    pub async fn start(&self, topic: impl Into<String>, depth: Depth) -> StartReceipt {
        let topic = topic.into();
        let task = self.registry.create(topic.clone(), depth).await;

        info!(task_id = %task.id, topic = %topic, depth = %depth, "Research task started");
        self.engine.spawn(task.id);

        StartReceipt {
            task_id: task.id,
            topic,
            status: "started",
        }
    }

    /// Starts a task at the configured default depth.
    pub async fn start_default(&self, topic: impl Into<String>) -> StartReceipt {
        let depth = self.config.depth;
        self.start(topic, depth).await
    }

    /// Returns the current status, progress and duration of a task.
    pub async fn status(&self, task_id: TaskId) -> Result<TaskStatusView, OrchestratorError> {
        let task = self.registry.get(task_id).await?;
        Ok(TaskStatusView {
            id: task.id,
            topic: task.topic.clone(),
            status: task.status,
            progress: task.progress(),
            duration_ms: task.duration_ms(),
        })
    }

    /// Lists task summaries in insertion order, optionally filtered by
    /// status.
    pub async fn list(&self, filter: Option<TaskStatus>) -> Vec<TaskSummary> {
        self.registry.list(filter).await
    }

    /// Forces a task's status to `stopped`.
    ///
    /// Stop is advisory and non-preemptive: the pipeline run is not
    /// signaled, keeps executing its in-flight stage, and will overwrite
    /// this status when it next reaches a terminal transition. Callers
    /// that need hard cancellation must not rely on this operation.
    pub async fn stop(&self, task_id: TaskId) -> Result<StopReceipt, OrchestratorError> {
        self.registry
            .update(task_id, |task| task.finish(TaskStatus::Stopped))
            .await?;

        info!(task_id = %task_id, "Research task stopped (non-preemptive)");
        Ok(StopReceipt {
            id: task_id,
            status: TaskStatus::Stopped,
        })
    }

    /// The orchestrator's configuration.
    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// The shared task registry.
    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }
}

/// Builder for an [`Orchestrator`] with injectable collaborators.
pub struct OrchestratorBuilder {
    config: ResearchConfig,
    planner: Option<Arc<dyn Planner>>,
    fetcher: Option<Arc<dyn SourceFetcher>>,
    verifier: Option<Arc<dyn Verifier>>,
    synthesizer: Option<Arc<dyn Synthesizer>>,
    sink: Option<Arc<dyn ReportSink>>,
}

impl OrchestratorBuilder {
    /// Creates a builder with the default configuration.
    pub fn new() -> Self {
        Self {
            config: ResearchConfig::default(),
            planner: None,
            fetcher: None,
            verifier: None,
            synthesizer: None,
            sink: None,
        }
    }

    /// Sets the configuration.
    pub fn config(mut self, config: ResearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the planner capability.
    pub fn planner(mut self, planner: Arc<dyn Planner>) -> Self {
        self.planner = Some(planner);
        self
    }

    /// Sets the source fetcher capability.
    pub fn fetcher(mut self, fetcher: Arc<dyn SourceFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Sets the verifier capability.
    pub fn verifier(mut self, verifier: Arc<dyn Verifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Sets the synthesizer capability.
    pub fn synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Sets the report sink.
    pub fn sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Builds the orchestrator, filling unset collaborators with the
    /// placeholder implementations.
    pub fn build(self) -> Orchestrator {
        let config = Arc::new(self.config);
        let registry = Arc::new(TaskRegistry::new());

        let planner = self
            .planner
            .unwrap_or_else(|| Arc::new(HeuristicPlanner::new()));
        let fetcher = self
            .fetcher
            .unwrap_or_else(|| Arc::new(StubSourceFetcher::new()));
        let verifier = self
            .verifier
            .unwrap_or_else(|| Arc::new(PassThroughVerifier::new()));
        let synthesizer = self
            .synthesizer
            .unwrap_or_else(|| Arc::new(MarkdownSynthesizer::new()));
        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(FileReportSink::new(config.reports_dir.clone())));

        let engine = Arc::new(PipelineEngine::new(
            Arc::clone(&config),
            Arc::clone(&registry),
            planner,
            fetcher,
            verifier,
            synthesizer,
            sink,
        ));

        Orchestrator {
            config,
            registry,
            engine,
        }
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_orchestrator() -> Orchestrator {
        // Keep placeholder collaborators but point the sink somewhere safe.
        let dir = std::env::temp_dir().join("research_forge_orchestrator_tests");
        Orchestrator::new(ResearchConfig::default().with_reports_dir(dir))
    }

    #[tokio::test]
    async fn test_start_returns_receipt_immediately() {
        let orchestrator = test_orchestrator();
        let receipt = orchestrator.start("rust executors", Depth::Quick).await;

        assert_eq!(receipt.task_id, TaskId::new(1));
        assert_eq!(receipt.topic, "rust executors");
        assert_eq!(receipt.status, "started");
    }

    #[tokio::test]
    async fn test_start_issues_increasing_ids() {
        let orchestrator = test_orchestrator();
        let first = orchestrator.start("a", Depth::Quick).await;
        let second = orchestrator.start("b", Depth::Quick).await;

        assert!(second.task_id > first.task_id);
    }

    #[tokio::test]
    async fn test_status_unknown_task() {
        let orchestrator = test_orchestrator();
        let err = orchestrator
            .status(TaskId::new(404))
            .await
            .expect_err("unknown task");
        assert!(matches!(err, OrchestratorError::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn test_stop_unknown_task() {
        let orchestrator = test_orchestrator();
        let err = orchestrator
            .stop(TaskId::new(404))
            .await
            .expect_err("unknown task");
        assert!(matches!(err, OrchestratorError::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn test_stop_marks_task_stopped() {
        let orchestrator = test_orchestrator();
        let receipt = orchestrator.start("to stop", Depth::Quick).await;

        let stopped = orchestrator
            .stop(receipt.task_id)
            .await
            .expect("task exists");
        assert_eq!(stopped.status, TaskStatus::Stopped);
    }

    #[tokio::test]
    async fn test_start_default_uses_configured_depth() {
        let dir = std::env::temp_dir().join("research_forge_orchestrator_tests");
        let orchestrator = Orchestrator::new(
            ResearchConfig::default()
                .with_depth(Depth::Comprehensive)
                .with_reports_dir(dir),
        );

        let receipt = orchestrator.start_default("defaulted").await;
        let task = orchestrator
            .registry()
            .get(receipt.task_id)
            .await
            .expect("task exists");
        assert_eq!(task.depth, Depth::Comprehensive);
    }
}
