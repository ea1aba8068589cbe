//! End-to-end tests for the orchestrator and pipeline engine, using
//! scripted collaborators in place of real search and synthesis backends.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use research_forge::config::ResearchConfig;
use research_forge::error::{FetchError, SinkError, StageError};
use research_forge::orchestrator::Orchestrator;
use research_forge::registry::{Stage, StageStatus, Task, TaskId, TaskStatus};
use research_forge::report::ReportSink;
use research_forge::sources::{Depth, SourceData, SourceFetcher, SourceKind};
use research_forge::stages::{Plan, Planner, Report};

/// Planner scripted to fail on demand.
struct ScriptedPlanner {
    fail: bool,
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn plan(&self, topic: &str, depth: Depth) -> Result<Plan, StageError> {
        if self.fail {
            return Err(StageError::collaborator(Stage::Plan, "scripted failure"));
        }
        Ok(Plan::new(topic, depth))
    }
}

/// Fetcher scripted to fail for selected sources, count calls, and
/// optionally wait on a gate before answering.
struct ScriptedFetcher {
    fail_sources: HashSet<SourceKind>,
    calls: Mutex<HashMap<SourceKind, usize>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedFetcher {
    fn new() -> Self {
        Self {
            fail_sources: HashSet::new(),
            calls: Mutex::new(HashMap::new()),
            gate: None,
        }
    }

    fn failing_for(mut self, sources: impl IntoIterator<Item = SourceKind>) -> Self {
        self.fail_sources = sources.into_iter().collect();
        self
    }

    fn gated_on(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    fn call_count(&self, source: SourceKind) -> usize {
        *self
            .calls
            .lock()
            .expect("lock not poisoned")
            .get(&source)
            .unwrap_or(&0)
    }
}

#[async_trait]
impl SourceFetcher for ScriptedFetcher {
    async fn fetch(&self, source: SourceKind, plan: &Plan) -> Result<SourceData, FetchError> {
        {
            let mut calls = self.calls.lock().expect("lock not poisoned");
            *calls.entry(source).or_insert(0) += 1;
        }

        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.expect("gate not closed");
            permit.forget();
        }

        if self.fail_sources.contains(&source) {
            return Err(FetchError::Backend {
                source,
                reason: "scripted backend outage".to_string(),
            });
        }

        Ok(SourceData::empty(source, plan.topic.clone()))
    }
}

/// Sink scripted to fail on demand, recording saved paths otherwise.
struct ScriptedSink {
    fail: bool,
    saves: AtomicUsize,
}

impl ScriptedSink {
    fn new(fail: bool) -> Self {
        Self {
            fail,
            saves: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ReportSink for ScriptedSink {
    async fn save(
        &self,
        task_id: TaskId,
        _topic: &str,
        _report: &Report,
    ) -> Result<PathBuf, SinkError> {
        if self.fail {
            return Err(SinkError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "scripted sink failure",
            )));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(PathBuf::from(format!("/virtual/report-{task_id}.md")))
    }
}

fn fast_config() -> ResearchConfig {
    ResearchConfig::default()
        .with_timeout(Duration::from_secs(5))
        .with_retry(1)
}

/// Polls until the task leaves `Running` or the deadline passes.
async fn wait_for_terminal(orchestrator: &Orchestrator, task_id: TaskId) -> Task {
    for _ in 0..500 {
        let task = orchestrator
            .registry()
            .get(task_id)
            .await
            .expect("task exists");
        if task.status.is_terminal() {
            return task;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("task {task_id} did not reach a terminal status in time");
}

#[tokio::test]
async fn test_successful_run_completes_all_stages() {
    let dir = tempfile::tempdir().expect("temp dir");
    let orchestrator = Orchestrator::builder()
        .config(fast_config().with_reports_dir(dir.path()))
        .build();

    let receipt = orchestrator.start("Rust Task Orchestrators", Depth::Medium).await;
    assert_eq!(receipt.status, "started");

    let task = wait_for_terminal(&orchestrator, receipt.task_id).await;

    assert_eq!(task.status, TaskStatus::Completed);
    for stage in Stage::ALL {
        assert_eq!(task.stages.get(stage), StageStatus::Completed);
    }

    let report = task.results.report.as_ref().expect("report stored");
    assert!(!report.is_empty());

    let status = orchestrator.status(receipt.task_id).await.expect("status");
    assert_eq!(status.progress, 100);

    // The default file sink writes the slugified report file shortly
    // after the terminal transition.
    let mut files: Vec<String> = Vec::new();
    for _ in 0..200 {
        files = std::fs::read_dir(dir.path())
            .map(|entries| {
                entries
                    .map(|e| e.expect("dir entry").file_name().into_string().unwrap())
                    .collect()
            })
            .unwrap_or_default();
        if !files.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("research-"));
    assert!(files[0].contains("rust-task-orchestrators"));
    assert!(files[0].ends_with(&format!("-{}.md", receipt.task_id)));
}

#[tokio::test]
async fn test_planner_failure_fails_task_with_later_stages_pending() {
    let orchestrator = Orchestrator::builder()
        .config(fast_config())
        .planner(Arc::new(ScriptedPlanner { fail: true }))
        .sink(Arc::new(ScriptedSink::new(false)))
        .build();

    let receipt = orchestrator.start("doomed", Depth::Quick).await;
    let task = wait_for_terminal(&orchestrator, receipt.task_id).await;

    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.stages.get(Stage::Plan), StageStatus::Failed);
    assert_eq!(task.stages.get(Stage::Execute), StageStatus::Pending);
    assert_eq!(task.stages.get(Stage::Verify), StageStatus::Pending);
    assert_eq!(task.stages.get(Stage::Synthesize), StageStatus::Pending);
    assert!(!task.errors.is_empty());
    assert!(task.errors[0].contains("scripted failure"));

    let status = orchestrator.status(receipt.task_id).await.expect("status");
    assert_eq!(status.progress, 0);
}

#[tokio::test]
async fn test_partial_source_failure_does_not_abort_run() {
    let fetcher = Arc::new(ScriptedFetcher::new().failing_for([SourceKind::Github]));
    let orchestrator = Orchestrator::builder()
        .config(fast_config())
        .fetcher(Arc::clone(&fetcher) as Arc<dyn SourceFetcher>)
        .sink(Arc::new(ScriptedSink::new(false)))
        .build();

    // Medium depth fans out to web_search and github.
    let receipt = orchestrator.start("partial", Depth::Medium).await;
    let task = wait_for_terminal(&orchestrator, receipt.task_id).await;

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.stages.get(Stage::Execute), StageStatus::Completed);
    assert_eq!(task.stages.get(Stage::Verify), StageStatus::Completed);

    let outcomes = task.results.sources.as_ref().expect("outcomes stored");
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[&SourceKind::WebSearch].is_success());
    assert!(!outcomes[&SourceKind::Github].is_success());
    assert!(outcomes[&SourceKind::Github]
        .error()
        .unwrap()
        .contains("scripted backend outage"));

    // The per-source failure is also visible on the task's error list.
    assert!(task
        .errors
        .iter()
        .any(|e| e.contains("github") && e.contains("scripted backend outage")));
}

#[tokio::test]
async fn test_depth_controls_source_fan_out() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let orchestrator = Orchestrator::builder()
        .config(fast_config())
        .fetcher(Arc::clone(&fetcher) as Arc<dyn SourceFetcher>)
        .sink(Arc::new(ScriptedSink::new(false)))
        .build();

    let quick = orchestrator.start("q", Depth::Quick).await;
    let task = wait_for_terminal(&orchestrator, quick.task_id).await;
    let plan = task.results.plan.as_ref().expect("plan stored");
    assert_eq!(plan.sources, vec![SourceKind::WebSearch]);
    assert_eq!(task.results.sources.as_ref().unwrap().len(), 1);

    let comprehensive = orchestrator.start("c", Depth::Comprehensive).await;
    let task = wait_for_terminal(&orchestrator, comprehensive.task_id).await;
    let plan = task.results.plan.as_ref().expect("plan stored");
    assert_eq!(
        plan.sources,
        vec![SourceKind::WebSearch, SourceKind::Github, SourceKind::Arxiv]
    );
    assert_eq!(task.results.sources.as_ref().unwrap().len(), 3);
}

#[tokio::test]
async fn test_list_filters_by_status_in_insertion_order() {
    let orchestrator = Orchestrator::builder()
        .config(fast_config())
        .planner(Arc::new(ScriptedPlanner { fail: true }))
        .sink(Arc::new(ScriptedSink::new(false)))
        .build();

    let first = orchestrator.start("first failure", Depth::Quick).await;
    let second = orchestrator.start("second failure", Depth::Quick).await;
    wait_for_terminal(&orchestrator, first.task_id).await;
    wait_for_terminal(&orchestrator, second.task_id).await;

    let failed = orchestrator.list(Some(TaskStatus::Failed)).await;
    assert_eq!(failed.len(), 2);
    assert_eq!(failed[0].id, first.task_id);
    assert_eq!(failed[1].id, second.task_id);
    assert!(failed.iter().all(|s| s.status == TaskStatus::Failed));

    let completed = orchestrator.list(Some(TaskStatus::Completed)).await;
    assert!(completed.is_empty());
}

#[tokio::test]
async fn test_concurrent_starts_issue_distinct_increasing_ids() {
    let orchestrator = Arc::new(
        Orchestrator::builder()
            .config(fast_config())
            .sink(Arc::new(ScriptedSink::new(false)))
            .build(),
    );

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move {
                orchestrator
                    .start(format!("topic {i}"), Depth::Quick)
                    .await
                    .task_id
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.expect("start"));
    }

    let mut sorted = ids.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), 8);
}

#[tokio::test]
async fn test_status_on_unknown_id_is_structured_error() {
    let orchestrator = Orchestrator::builder().config(fast_config()).build();

    assert!(orchestrator.status(TaskId::new(9999)).await.is_err());
    assert!(orchestrator.stop(TaskId::new(9999)).await.is_err());
}

#[tokio::test]
async fn test_stop_is_non_preemptive_and_engine_overwrites() {
    // One gated source (quick depth); the fetch blocks until released.
    let gate = Arc::new(Semaphore::new(0));
    let fetcher = Arc::new(ScriptedFetcher::new().gated_on(Arc::clone(&gate)));
    let orchestrator = Orchestrator::builder()
        .config(fast_config())
        .fetcher(Arc::clone(&fetcher) as Arc<dyn SourceFetcher>)
        .sink(Arc::new(ScriptedSink::new(false)))
        .build();

    let receipt = orchestrator.start("stoppable", Depth::Quick).await;

    // Wait until the run is inside the execute stage.
    for _ in 0..500 {
        if fetcher.call_count(SourceKind::WebSearch) > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(fetcher.call_count(SourceKind::WebSearch), 1);

    let stopped = orchestrator.stop(receipt.task_id).await.expect("stop");
    assert_eq!(stopped.status, TaskStatus::Stopped);
    let status = orchestrator.status(receipt.task_id).await.expect("status");
    assert_eq!(status.status, TaskStatus::Stopped);

    // Stop does not signal the engine: once the fetch unblocks, the run
    // continues and overwrites the stopped status with its own terminal
    // status. This race is an acknowledged property of non-cooperative
    // stop.
    gate.add_permits(1);
    for _ in 0..500 {
        let task = orchestrator
            .registry()
            .get(receipt.task_id)
            .await
            .expect("task exists");
        if task.status == TaskStatus::Completed {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("engine never overwrote the stopped status");
}

#[tokio::test]
async fn test_sink_failure_keeps_task_completed() {
    let orchestrator = Orchestrator::builder()
        .config(fast_config())
        .sink(Arc::new(ScriptedSink::new(true)))
        .build();

    let receipt = orchestrator.start("unsaved", Depth::Quick).await;
    let task = wait_for_terminal(&orchestrator, receipt.task_id).await;

    // Give the post-completion save a moment to record its failure.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let task_after = orchestrator
        .registry()
        .get(receipt.task_id)
        .await
        .expect("task exists");

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task_after.status, TaskStatus::Completed);
    assert!(task_after
        .errors
        .iter()
        .any(|e| e.contains("report save failed")));
}

#[tokio::test]
async fn test_fetch_retry_honors_configured_attempts() {
    let fetcher = Arc::new(ScriptedFetcher::new().failing_for([SourceKind::WebSearch]));
    let orchestrator = Orchestrator::builder()
        .config(fast_config().with_retry(3))
        .fetcher(Arc::clone(&fetcher) as Arc<dyn SourceFetcher>)
        .sink(Arc::new(ScriptedSink::new(false)))
        .build();

    let receipt = orchestrator.start("retry me", Depth::Quick).await;
    let task = wait_for_terminal(&orchestrator, receipt.task_id).await;

    // The lone source failed every attempt; the run still completes with
    // the failure recorded as data.
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(fetcher.call_count(SourceKind::WebSearch), 3);
    let outcomes = task.results.sources.as_ref().expect("outcomes stored");
    assert!(!outcomes[&SourceKind::WebSearch].is_success());
}

#[tokio::test]
async fn test_progress_is_monotonic_during_run() {
    let gate = Arc::new(Semaphore::new(0));
    let fetcher = Arc::new(ScriptedFetcher::new().gated_on(Arc::clone(&gate)));
    let orchestrator = Orchestrator::builder()
        .config(fast_config())
        .fetcher(Arc::clone(&fetcher) as Arc<dyn SourceFetcher>)
        .sink(Arc::new(ScriptedSink::new(false)))
        .build();

    let receipt = orchestrator.start("watched", Depth::Quick).await;
    gate.add_permits(1);

    let mut last = 0;
    loop {
        let status = orchestrator.status(receipt.task_id).await.expect("status");
        assert!(
            status.progress >= last,
            "progress regressed from {last} to {}",
            status.progress
        );
        assert!(matches!(status.progress, 0 | 25 | 50 | 75 | 100));
        last = status.progress;

        if status.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    assert_eq!(last, 100);
}
