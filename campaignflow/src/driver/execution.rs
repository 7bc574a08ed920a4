use super::{DriverConfig, FinalArtifact, RunResult};
use crate::backend::{Backend, SubmissionHandle};
use crate::cancellation::CancellationToken;
use crate::core::{ArtifactRef, RunStatus};
use crate::errors::{BackendError, Result};
use crate::events::{EventSink, NoOpEventSink, RunEvent};
use crate::graph::StageGraph;
use crate::observability::SpanTimer;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Submits stage graphs and waits for their outcome.
///
/// The driver polls the backend at a fixed interval until the run reaches a
/// terminal status, the optional maximum wait elapses, or the caller cancels.
/// Timing out or cancelling only stops the wait; the remote submission keeps
/// running. Submissions that reached a terminal status are released on the
/// backend once their result is in hand.
pub struct ExecutionDriver {
    backend: Arc<dyn Backend>,
    config: DriverConfig,
    sink: Arc<dyn EventSink>,
}

impl fmt::Debug for ExecutionDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionDriver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Bookkeeping of one submission while it is being watched.
struct ActiveRun {
    handle: SubmissionHandle,
    fingerprint: String,
    started_at: DateTime<Utc>,
    timer: SpanTimer,
    polls: u32,
}

impl ActiveRun {
    fn finish(self, status: RunStatus, final_artifact: Option<FinalArtifact>) -> RunResult {
        let elapsed_ms = self.timer.finish();
        info!(
            handle = %self.handle,
            status = %status,
            polls = self.polls,
            elapsed_ms,
            "Run finished"
        );
        RunResult {
            status,
            handle: self.handle,
            fingerprint: self.fingerprint,
            final_artifact,
            polls: self.polls,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

enum WaitOutcome {
    Terminal(RunStatus),
    TimedOut,
    Cancelled,
}

impl ExecutionDriver {
    /// Creates a driver over `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, config: DriverConfig) -> Self {
        Self {
            backend,
            config,
            sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sends lifecycle events to `sink`.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the polling settings.
    #[must_use]
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Runs a graph to a terminal status.
    ///
    /// # Errors
    ///
    /// See [`Self::run_with_cancellation`].
    pub async fn run(&self, graph: &StageGraph) -> Result<RunResult> {
        self.run_with_cancellation(graph, &CancellationToken::new())
            .await
    }

    /// Runs a graph, giving up when `token` is cancelled.
    ///
    /// A backend-side failure is not an error here: it yields a
    /// [`RunResult`] with status `Failed`. Use [`RunResult::into_result`] to
    /// turn it into an [`ExecutionFailure`](crate::errors::ExecutionFailure).
    ///
    /// # Errors
    ///
    /// Returns `GraphError::MissingPost` before submitting a graph without a
    /// final Post stage, and `BackendError` when the backend cannot be
    /// reached or does not hold the final artifact.
    pub async fn run_with_cancellation(
        &self,
        graph: &StageGraph,
        token: &CancellationToken,
    ) -> Result<RunResult> {
        let final_ref = graph.final_artifact()?;

        let timer = SpanTimer::start("run");
        let started_at = Utc::now();
        let fingerprint = graph.fingerprint();
        let handle = self.backend.submit(graph).await?;

        info!(
            workflow = graph.name(),
            handle = %handle,
            stages = graph.stage_count(),
            "Graph submitted"
        );
        self.sink
            .emit(&RunEvent::Submitted {
                workflow: graph.name().to_string(),
                handle: handle.to_string(),
                fingerprint: fingerprint.clone(),
            })
            .await;

        let mut run = ActiveRun {
            handle,
            fingerprint,
            started_at,
            timer,
            polls: 0,
        };

        match self.wait(&mut run, token).await? {
            WaitOutcome::Terminal(RunStatus::Succeeded) => {
                let artifact = self.retrieve(&run.handle, final_ref).await?;
                self.release(&run.handle).await;
                self.sink
                    .emit(&RunEvent::Completed {
                        handle: run.handle.to_string(),
                        artifact: Some(artifact.local_path.display().to_string()),
                        polls: run.polls,
                        elapsed_ms: run.timer.elapsed_ms(),
                    })
                    .await;
                Ok(run.finish(RunStatus::Succeeded, Some(artifact)))
            }
            WaitOutcome::Terminal(status) => {
                warn!(handle = %run.handle, status = %status, "Run did not succeed");
                self.release(&run.handle).await;
                self.sink
                    .emit(&RunEvent::Failed {
                        handle: run.handle.to_string(),
                        reason: format!("backend reported {status}"),
                    })
                    .await;
                Ok(run.finish(status, None))
            }
            WaitOutcome::TimedOut => {
                let waited_ms = run.timer.elapsed_ms();
                warn!(handle = %run.handle, waited_ms, "Stopped waiting for run");
                self.sink
                    .emit(&RunEvent::TimedOut {
                        handle: run.handle.to_string(),
                        waited_ms,
                    })
                    .await;
                Ok(run.finish(RunStatus::TimedOut, None))
            }
            WaitOutcome::Cancelled => {
                let reason = token.reason();
                info!(handle = %run.handle, reason = ?reason, "Run wait cancelled");
                self.sink
                    .emit(&RunEvent::Cancelled {
                        handle: run.handle.to_string(),
                        reason,
                    })
                    .await;
                Ok(run.finish(RunStatus::Cancelled, None))
            }
        }
    }

    async fn wait(&self, run: &mut ActiveRun, token: &CancellationToken) -> Result<WaitOutcome> {
        let interval = self.config.poll_interval();
        let deadline = self.config.max_wait().map(|max_wait| Instant::now() + max_wait);
        let mut status = RunStatus::Pending;

        loop {
            if token.is_cancelled() {
                return Ok(WaitOutcome::Cancelled);
            }

            let observed = RunStatus::from(self.backend.query_status(&run.handle).await?);
            run.polls += 1;

            if observed != status {
                debug!(handle = %run.handle, from = %status, to = %observed, poll = run.polls, "Status changed");
                self.sink.try_emit(&RunEvent::StatusChanged {
                    handle: run.handle.to_string(),
                    from: status,
                    to: observed,
                    poll: run.polls,
                });
                status = observed;
            }
            if status.is_terminal() {
                return Ok(WaitOutcome::Terminal(status));
            }

            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(WaitOutcome::TimedOut);
                    }
                    interval.min(deadline - now)
                }
                None => interval,
            };

            tokio::select! {
                () = tokio::time::sleep(pause) => {}
                () = token.cancelled() => {}
            }
        }
    }

    async fn release(&self, handle: &SubmissionHandle) {
        if let Err(err) = self.backend.release(handle).await {
            warn!(handle = %handle, error = %err, "Failed to release submission");
        }
    }

    async fn retrieve(&self, handle: &SubmissionHandle, reference: ArtifactRef) -> Result<FinalArtifact> {
        let outputs = self
            .backend
            .query_stage_outputs(handle, &reference.producer)
            .await?;
        if !outputs.contains(&reference.slot) {
            return Err(BackendError::MissingOutput {
                stage: reference.producer,
                slot: reference.slot,
            }
            .into());
        }

        let local_path = self.backend.fetch_artifact(handle, &reference).await?;
        debug!(handle = %handle, artifact = %reference, path = %local_path.display(), "Final artifact fetched");
        Ok(FinalArtifact {
            reference,
            local_path,
        })
    }
}
