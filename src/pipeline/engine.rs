//! The pipeline engine: stage sequencing, fan-out/fan-in and failure
//! handling for a single task.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::ResearchConfig;
use crate::error::{FetchError, RegistryError, StageError};
use crate::registry::{Stage, TaskId, TaskRegistry, TaskStatus};
use crate::report::ReportSink;
use crate::sources::{SourceFetcher, SourceKind, SourceOutcomes, SourceResult};
use crate::stages::{Plan, Planner, Synthesizer, Verifier};

/// Faults the engine cannot convert into task state by itself.
///
/// Everything else (stage failures, source failures, sink failures) is
/// recorded on the task and handled inside [`PipelineEngine::run`]; this
/// error only surfaces when the registry itself refuses an update, and the
/// supervising task turns it into a failed-task marking as a last resort.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Drives tasks through the four-stage research pipeline.
///
/// The engine is shared behind an `Arc`; each [`PipelineEngine::spawn`]
/// launches an independent run that is the sole writer of its task's
/// state.
pub struct PipelineEngine {
    config: Arc<ResearchConfig>,
    registry: Arc<TaskRegistry>,
    planner: Arc<dyn Planner>,
    fetcher: Arc<dyn SourceFetcher>,
    verifier: Arc<dyn Verifier>,
    synthesizer: Arc<dyn Synthesizer>,
    sink: Arc<dyn ReportSink>,
}

impl PipelineEngine {
    /// Creates an engine over the given registry and collaborators.
    pub fn new(
        config: Arc<ResearchConfig>,
        registry: Arc<TaskRegistry>,
        planner: Arc<dyn Planner>,
        fetcher: Arc<dyn SourceFetcher>,
        verifier: Arc<dyn Verifier>,
        synthesizer: Arc<dyn Synthesizer>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            config,
            registry,
            planner,
            fetcher,
            verifier,
            synthesizer,
            sink,
        }
    }

    /// Launches a pipeline run for the task without awaiting it.
    ///
    /// Fire-and-track: the run is spawned onto the runtime and supervised
    /// by a second task that converts a returned error or a panic into a
    /// `failed` marking on the task. No fault escapes to the caller.
    pub fn spawn(self: &Arc<Self>, task_id: TaskId) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let run = tokio::spawn({
                let engine = Arc::clone(&engine);
                async move { engine.run(task_id).await }
            });

            let failure = match run.await {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(err.to_string()),
                Err(join_err) => Some(format!("pipeline run aborted: {join_err}")),
            };

            if let Some(message) = failure {
                error!(task_id = %task_id, error = %message, "Pipeline run did not finish cleanly");
                let _ = engine
                    .registry
                    .update(task_id, |task| {
                        task.record_error(message);
                        task.finish(TaskStatus::Failed);
                    })
                    .await;
            }
        });
    }

    /// Runs the pipeline for one task to a terminal status.
    ///
    /// Returns `Err` only for registry-level faults; stage and source
    /// failures are recorded on the task and reported as `Ok(())`.
    pub async fn run(&self, task_id: TaskId) -> Result<(), PipelineError> {
        let task = self.registry.get(task_id).await?;
        let topic = task.topic.clone();
        let depth = task.depth;

        info!(task_id = %task_id, topic = %topic, depth = %depth, "Pipeline run started");

        // Stage 1: plan.
        self.registry
            .update(task_id, |t| t.start_stage(Stage::Plan))
            .await?;

        let plan = match self
            .call_stage(Stage::Plan, self.planner.plan(&topic, depth))
            .await
        {
            Ok(plan) => {
                let stored = plan.clone();
                self.registry
                    .update(task_id, |t| {
                        t.complete_stage(Stage::Plan);
                        t.results.plan = Some(stored);
                    })
                    .await?;
                debug!(task_id = %task_id, sources = plan.sources.len(), "Plan stage completed");
                plan
            }
            Err(err) => {
                return self.fail(task_id, Stage::Plan, err).await;
            }
        };

        // Stage 2: execute. Individual source failures are data; the stage
        // itself always completes once every fetch has settled.
        self.registry
            .update(task_id, |t| t.start_stage(Stage::Execute))
            .await?;

        let outcomes = self.fetch_all(task_id, &plan).await;

        let stored = outcomes.clone();
        self.registry
            .update(task_id, |t| {
                for (kind, result) in &stored {
                    if let Some(error) = result.error() {
                        t.record_error(format!("source '{kind}' failed: {error}"));
                    }
                }
                t.complete_stage(Stage::Execute);
                t.results.sources = Some(stored);
            })
            .await?;
        debug!(
            task_id = %task_id,
            total = outcomes.len(),
            failed = outcomes.values().filter(|r| !r.is_success()).count(),
            "Execute stage completed"
        );

        // Stage 3: verify.
        self.registry
            .update(task_id, |t| t.start_stage(Stage::Verify))
            .await?;

        let verified = match self
            .call_stage(Stage::Verify, self.verifier.verify(&outcomes))
            .await
        {
            Ok(verified) => {
                let stored = verified.clone();
                self.registry
                    .update(task_id, |t| {
                        t.complete_stage(Stage::Verify);
                        t.results.verified = Some(stored);
                    })
                    .await?;
                debug!(task_id = %task_id, confidence = verified.confidence, "Verify stage completed");
                verified
            }
            Err(err) => {
                return self.fail(task_id, Stage::Verify, err).await;
            }
        };

        // Stage 4: synthesize.
        self.registry
            .update(task_id, |t| t.start_stage(Stage::Synthesize))
            .await?;

        let report = match self
            .call_stage(
                Stage::Synthesize,
                self.synthesizer.synthesize(&topic, &verified),
            )
            .await
        {
            Ok(report) => {
                let stored = report.clone();
                self.registry
                    .update(task_id, |t| {
                        t.complete_stage(Stage::Synthesize);
                        t.results.report = Some(stored);
                    })
                    .await?;
                report
            }
            Err(err) => {
                return self.fail(task_id, Stage::Synthesize, err).await;
            }
        };

        // All four stages completed.
        self.registry
            .update(task_id, |t| t.finish(TaskStatus::Completed))
            .await?;
        info!(task_id = %task_id, topic = %topic, "Pipeline run completed");

        // Persistence is best-effort: a sink failure is recorded but never
        // reverts the terminal status.
        match self.sink.save(task_id, &topic, &report).await {
            Ok(path) => {
                info!(task_id = %task_id, path = %path.display(), "Report saved");
            }
            Err(err) => {
                warn!(task_id = %task_id, error = %err, "Report save failed");
                self.registry
                    .update(task_id, |t| {
                        t.record_error(format!("report save failed: {err}"));
                    })
                    .await?;
            }
        }

        Ok(())
    }

    /// Records a fatal stage failure and marks the task failed.
    async fn fail(
        &self,
        task_id: TaskId,
        stage: Stage,
        err: StageError,
    ) -> Result<(), PipelineError> {
        warn!(task_id = %task_id, stage = %stage, error = %err, "Stage failed, aborting pipeline");
        self.registry
            .update(task_id, |t| {
                t.fail_stage(stage);
                t.record_error(err.to_string());
                t.finish(TaskStatus::Failed);
            })
            .await?;
        Ok(())
    }

    /// Wraps a collaborator call in the configured timeout.
    async fn call_stage<T, F>(&self, stage: Stage, call: F) -> Result<T, StageError>
    where
        F: Future<Output = Result<T, StageError>>,
    {
        match tokio::time::timeout(self.config.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StageError::Timeout {
                stage,
                timeout: self.config.timeout,
            }),
        }
    }

    /// Fans out one fetch per planned source and joins on all of them.
    ///
    /// Every fetch settles into a `SourceResult` before this returns; a
    /// failing source never cancels its siblings.
    async fn fetch_all(&self, task_id: TaskId, plan: &Plan) -> SourceOutcomes {
        let fetches = plan.sources.iter().copied().map(|kind| {
            let fetcher = Arc::clone(&self.fetcher);
            let plan = plan.clone();
            let timeout = self.config.timeout;
            let attempts = self.config.retry.max(1);
            async move {
                let result = fetch_one(fetcher, kind, &plan, timeout, attempts).await;
                match &result {
                    SourceResult::Success { data } => {
                        debug!(task_id = %task_id, source = %kind, items = data.item_count(), "Source fetch succeeded");
                    }
                    SourceResult::Failed { error } => {
                        warn!(task_id = %task_id, source = %kind, error = %error, "Source fetch failed");
                    }
                }
                (kind, result)
            }
        });

        join_all(fetches).await.into_iter().collect()
    }
}

/// Runs one source fetch with retry and per-attempt timeout, settling into
/// a `SourceResult` rather than an error.
async fn fetch_one(
    fetcher: Arc<dyn SourceFetcher>,
    kind: SourceKind,
    plan: &Plan,
    timeout: Duration,
    attempts: u32,
) -> SourceResult {
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match tokio::time::timeout(timeout, fetcher.fetch(kind, plan)).await {
            Ok(Ok(data)) => return SourceResult::Success { data },
            Ok(Err(err)) => {
                debug!(source = %kind, attempt, error = %err, "Fetch attempt failed");
                last_error = err.to_string();
            }
            Err(_) => {
                let err = FetchError::Timeout {
                    source: kind,
                    timeout,
                };
                debug!(source = %kind, attempt, error = %err, "Fetch attempt timed out");
                last_error = err.to_string();
            }
        }
    }

    SourceResult::Failed { error: last_error }
}
