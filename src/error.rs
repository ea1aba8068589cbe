//! Error types for research-forge operations.
//!
//! Defines error types for the major subsystems:
//! - Task registry lookups and mutations
//! - Source fetching during the execute fan-out
//! - Stage collaborators (planner, verifier, synthesizer)
//! - Report persistence

use std::time::Duration;

use thiserror::Error;

use crate::registry::{Stage, TaskId};
use crate::sources::SourceKind;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Task {0} not found in registry")]
    TaskNotFound(TaskId),
}

/// Errors returned by a source fetcher.
///
/// A fetch error is never fatal to a pipeline run: the engine records it as
/// the per-source outcome and continues with the remaining sources.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The fetcher has no backend for this source.
    #[error("No fetcher available for source '{0}'")]
    UnsupportedSource(SourceKind),

    /// The source backend reported a failure.
    #[error("Source '{source}' failed: {reason}")]
    Backend { source: SourceKind, reason: String },

    /// A single fetch attempt exceeded the configured timeout.
    #[error("Source '{source}' timed out after {timeout:?}")]
    Timeout { source: SourceKind, timeout: Duration },
}

/// Errors returned by the plan, verify and synthesize collaborators.
///
/// A stage error is fatal to the pipeline run that raised it.
#[derive(Debug, Error)]
pub enum StageError {
    /// The collaborator reported a failure.
    #[error("Stage '{stage}' failed: {reason}")]
    Collaborator { stage: Stage, reason: String },

    /// The collaborator call exceeded the configured timeout.
    #[error("Stage '{stage}' timed out after {timeout:?}")]
    Timeout { stage: Stage, timeout: Duration },
}

impl StageError {
    /// Shorthand for a collaborator failure.
    pub fn collaborator(stage: Stage, reason: impl Into<String>) -> Self {
        StageError::Collaborator {
            stage,
            reason: reason.into(),
        }
    }
}

/// Errors that can occur while persisting a report.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the public orchestrator API.
///
/// `status` and `stop` on an unknown task identifier return
/// `TaskNotFound` as a value; the API never panics on bad input.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),
}

impl From<RegistryError> for OrchestratorError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::TaskNotFound(id) => OrchestratorError::TaskNotFound(id),
        }
    }
}
