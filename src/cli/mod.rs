//! Command-line interface for research-forge.
//!
//! Provides a `run` command that drives one research task to completion
//! and a `config` command that prints the effective configuration.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli};
