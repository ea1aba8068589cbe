//! Report persistence.
//!
//! Saving is best-effort from the pipeline's point of view: a completed
//! task stays completed even if its report cannot be written, with the
//! failure recorded on the task.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::error::SinkError;
use crate::registry::TaskId;
use crate::stages::Report;

/// Capability that persists a finished report.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Persists the report and returns where it landed.
    async fn save(&self, task_id: TaskId, topic: &str, report: &Report)
        -> Result<PathBuf, SinkError>;
}

/// Lower-cases the topic and collapses whitespace runs into single
/// hyphens, for use in report filenames.
pub fn slugify(topic: &str) -> String {
    topic
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Writes reports as markdown files under a configured directory.
///
/// Filenames follow `research-<date>-<slug>-<task id>.md`.
#[derive(Debug, Clone)]
pub struct FileReportSink {
    reports_dir: PathBuf,
}

impl FileReportSink {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
        }
    }

    /// The directory reports are written to.
    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    fn file_name(task_id: TaskId, topic: &str) -> String {
        let date = Utc::now().format("%Y-%m-%d");
        format!("research-{date}-{}-{task_id}.md", slugify(topic))
    }
}

#[async_trait]
impl ReportSink for FileReportSink {
    async fn save(
        &self,
        task_id: TaskId,
        topic: &str,
        report: &Report,
    ) -> Result<PathBuf, SinkError> {
        tokio::fs::create_dir_all(&self.reports_dir).await?;

        let path = self.reports_dir.join(Self::file_name(task_id, topic));
        tokio::fs::write(&path, report.as_str()).await?;

        debug!(task_id = %task_id, path = %path.display(), "Report written");
        Ok(path)
    }
}
