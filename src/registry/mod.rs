//! In-memory task registry.
//!
//! The registry is the single shared mutable resource of the orchestrator:
//! every task ever created lives here for the process lifetime, keyed by a
//! monotonically increasing identifier. It is strictly additive; there is
//! no delete or eviction operation.
//!
//! Concurrency discipline: each task has a single writer (the pipeline run
//! driving it, or an external `stop`), with arbitrarily many readers.
//! Reads hand out cloned snapshots taken under the lock, so a reader never
//! observes a partially updated stage map.

mod task;

pub use task::{
    Stage, StageResults, StageStates, StageStatus, Task, TaskId, TaskStatus, TaskSummary,
};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use crate::error::RegistryError;
use crate::sources::Depth;

/// Task table guarded by the registry lock.
///
/// Insertion order is tracked separately so `list` output is stable.
#[derive(Default)]
struct TaskTable {
    order: Vec<TaskId>,
    by_id: HashMap<TaskId, Task>,
}

/// Additive, in-memory store of all tasks.
#[derive(Default)]
pub struct TaskRegistry {
    next_id: AtomicU64,
    tasks: RwLock<TaskTable>,
}

impl TaskRegistry {
    /// Creates an empty registry. The first allocated identifier is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next identifier, inserts a new running task and
    /// returns a snapshot of it.
    pub async fn create(&self, topic: impl Into<String>, depth: Depth) -> Task {
        let id = TaskId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let task = Task::new(id, topic, depth);

        let mut table = self.tasks.write().await;
        table.order.push(id);
        table.by_id.insert(id, task.clone());

        task
    }

    /// Returns a snapshot of the task with the given identifier.
    pub async fn get(&self, id: TaskId) -> Result<Task, RegistryError> {
        let table = self.tasks.read().await;
        table
            .by_id
            .get(&id)
            .cloned()
            .ok_or(RegistryError::TaskNotFound(id))
    }

    /// Returns summaries of all tasks in insertion order, optionally
    /// restricted to one status.
    pub async fn list(&self, filter: Option<TaskStatus>) -> Vec<TaskSummary> {
        let table = self.tasks.read().await;
        table
            .order
            .iter()
            .filter_map(|id| table.by_id.get(id))
            .filter(|task| filter.map_or(true, |status| task.status == status))
            .map(Task::summary)
            .collect()
    }

    /// Applies a mutation to the task with the given identifier.
    ///
    /// This is the only mutation path; the closure runs under the write
    /// lock, so the whole update is atomic with respect to readers.
    pub async fn update<F>(&self, id: TaskId, mutate: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut Task),
    {
        let mut table = self.tasks.write().await;
        let task = table
            .by_id
            .get_mut(&id)
            .ok_or(RegistryError::TaskNotFound(id))?;
        mutate(task);
        Ok(())
    }

    /// Number of tasks ever created.
    pub async fn len(&self) -> usize {
        self.tasks.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
