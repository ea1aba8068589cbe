//! Task types: identity, status, per-stage state and results.
//!
//! A task is one research run through the pipeline. All mutation goes
//! through the small transition methods here so the stage state machine
//! (pending → running → completed/failed, never backwards) and the
//! terminal-timestamp invariant live in one place.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sources::{Depth, SourceOutcomes};
use crate::stages::{Plan, Report, VerifiedBundle};

/// Number of pipeline stages; progress is computed against this.
const STAGE_COUNT: u32 = 4;

/// Unique task identifier.
///
/// Allocated by the registry from a monotonically increasing counter;
/// identifiers are never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Overall status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// The pipeline is (or is about to start) driving this task.
    Running,
    /// All four stages completed.
    Completed,
    /// A fatal stage failure or unexpected fault ended the run.
    Failed,
    /// An external stop call forced the task terminal.
    Stopped,
}

impl TaskStatus {
    /// Returns whether no further transition is expected from this status.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Running)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four fixed pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Plan,
    Execute,
    Verify,
    Synthesize,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; STAGE_COUNT as usize] =
        [Stage::Plan, Stage::Execute, Stage::Verify, Stage::Synthesize];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Stage::Plan => "plan",
            Stage::Execute => "execute",
            Stage::Verify => "verify",
            Stage::Synthesize => "synthesize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single stage within a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Per-stage status map with exactly one slot per pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageStates {
    pub plan: StageStatus,
    pub execute: StageStatus,
    pub verify: StageStatus,
    pub synthesize: StageStatus,
}

impl Default for StageStates {
    fn default() -> Self {
        Self {
            plan: StageStatus::Pending,
            execute: StageStatus::Pending,
            verify: StageStatus::Pending,
            synthesize: StageStatus::Pending,
        }
    }
}

impl StageStates {
    /// Status of the given stage.
    pub fn get(&self, stage: Stage) -> StageStatus {
        match stage {
            Stage::Plan => self.plan,
            Stage::Execute => self.execute,
            Stage::Verify => self.verify,
            Stage::Synthesize => self.synthesize,
        }
    }

    fn slot_mut(&mut self, stage: Stage) -> &mut StageStatus {
        match stage {
            Stage::Plan => &mut self.plan,
            Stage::Execute => &mut self.execute,
            Stage::Verify => &mut self.verify,
            Stage::Synthesize => &mut self.synthesize,
        }
    }

    /// Number of stages whose status is exactly `Completed`.
    pub fn completed_count(&self) -> u32 {
        Stage::ALL
            .iter()
            .filter(|s| self.get(**s) == StageStatus::Completed)
            .count() as u32
    }
}

/// Outputs collected as stages complete.
///
/// A slot is populated exactly when its stage reaches `Completed`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageResults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<SourceOutcomes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<VerifiedBundle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<Report>,
}

/// One research run through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier, never reused.
    pub id: TaskId,
    /// Research topic, immutable after creation.
    pub topic: String,
    /// Requested depth, immutable after creation.
    pub depth: Depth,
    /// Overall status; see [`TaskStatus`].
    pub status: TaskStatus,
    /// When the task was created.
    pub started_at: DateTime<Utc>,
    /// Set on the terminal transition.
    ///
    /// An external `stop` followed by the engine finishing a run can
    /// overwrite this along with the status; that race is a documented
    /// property of non-cooperative stop.
    pub finished_at: Option<DateTime<Utc>>,
    /// Per-stage statuses.
    pub stages: StageStates,
    /// Outputs of completed stages.
    pub results: StageResults,
    /// Accumulated error messages, append-only.
    pub errors: Vec<String>,
}

impl Task {
    /// Creates a task in status `Running` with all stages pending.
    pub fn new(id: TaskId, topic: impl Into<String>, depth: Depth) -> Self {
        Self {
            id,
            topic: topic.into(),
            depth,
            status: TaskStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            stages: StageStates::default(),
            results: StageResults::default(),
            errors: Vec::new(),
        }
    }

    /// Marks a stage as running.
    pub fn start_stage(&mut self, stage: Stage) {
        *self.stages.slot_mut(stage) = StageStatus::Running;
    }

    /// Marks a stage as completed.
    pub fn complete_stage(&mut self, stage: Stage) {
        *self.stages.slot_mut(stage) = StageStatus::Completed;
    }

    /// Marks a stage as failed.
    pub fn fail_stage(&mut self, stage: Stage) {
        *self.stages.slot_mut(stage) = StageStatus::Failed;
    }

    /// Appends an error message.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Moves the task to a terminal status and stamps the end time.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if called with `TaskStatus::Running`.
    pub fn finish(&mut self, status: TaskStatus) {
        debug_assert!(status.is_terminal(), "finish requires a terminal status");
        self.status = status;
        self.finished_at = Some(Utc::now());
    }

    /// Progress percentage: completed stages over the four total, rounded.
    ///
    /// Always one of 0, 25, 50, 75, 100; failed stages do not count.
    pub fn progress(&self) -> u8 {
        let completed = self.stages.completed_count();
        ((completed * 100 + STAGE_COUNT / 2) / STAGE_COUNT) as u8
    }

    /// Wall-clock duration in milliseconds: live while running, frozen at
    /// the end timestamp once terminal.
    pub fn duration_ms(&self) -> u64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds().max(0) as u64
    }

    /// Read-only summary for listings.
    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            id: self.id,
            topic: self.topic.clone(),
            status: self.status,
            started_at: self.started_at,
        }
    }
}

/// Read-only view of a task for `list` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: TaskId,
    pub topic: String,
    pub status: TaskStatus,
    pub started_at: DateTime<Utc>,
}
