//! Background task monitor
//!
//! One monitor runs per accepted task. It polls the remote service until the
//! task reaches a terminal remote status or the attempt budget is spent,
//! fetches the artifacts of a successful task and records every step in the
//! [`TaskRegistry`].
//!
//! ```text
//! Pending -> Processing* -> Succeeded | Failed | Canceled
//!                        -> TimedOut        (budget exhausted)
//!                        -> ErroredLocally  (local defect)
//! ```

use crate::artifact::{self, ArtifactFetcher};
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::registry::TaskRegistry;
use crate::remote::GenerationService;
use crate::types::{Event, RemoteStatus, RemoteTask, TaskId, TaskKind, TaskStatus};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Error text recorded when the remote side fails without a reason
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Drives tasks from submission to a terminal state
///
/// Cloneable; every spawned loop holds its own clone.
#[derive(Clone)]
pub struct TaskMonitor {
    registry: TaskRegistry,
    remote: Arc<dyn GenerationService>,
    fetcher: Arc<ArtifactFetcher>,
    config: MonitorConfig,
    event_tx: broadcast::Sender<Event>,
    cancel: CancellationToken,
}

impl TaskMonitor {
    /// Create a monitor sharing the given registry, remote client and fetcher
    pub fn new(
        registry: TaskRegistry,
        remote: Arc<dyn GenerationService>,
        fetcher: Arc<ArtifactFetcher>,
        config: MonitorConfig,
        event_tx: broadcast::Sender<Event>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            registry,
            remote,
            fetcher,
            config,
            event_tx,
            cancel,
        }
    }

    /// Start a detached monitor loop for a task
    pub fn spawn(&self, task_id: TaskId, kind: TaskKind) -> JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move { monitor.run(task_id, kind).await })
    }

    /// Run the monitor loop to completion
    ///
    /// The loop body runs in its own task so a panic inside it can be turned
    /// into an `ErroredLocally` record. Cancellation aborts the loop without
    /// touching the record.
    pub async fn run(self, task_id: TaskId, kind: TaskKind) {
        tracing::info!(task_id = %task_id, kind = %kind, "Monitoring task");

        let inner = self.clone();
        let id = task_id.clone();
        let mut handle = tokio::spawn(async move { inner.drive(&id, kind).await });

        let outcome = tokio::select! {
            _ = self.cancel.cancelled() => {
                handle.abort();
                tracing::debug!(task_id = %task_id, "Monitor cancelled");
                return;
            }
            outcome = &mut handle => outcome,
        };

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => self.mark_errored(&task_id, e.to_string()).await,
            Err(join_err) if join_err.is_panic() => {
                let payload = join_err.into_panic();
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                self.mark_errored(&task_id, format!("monitor panicked: {}", reason))
                    .await;
            }
            Err(_) => {
                tracing::debug!(task_id = %task_id, "Monitor task aborted");
            }
        }
    }

    /// Poll loop; an `Err` is a local defect
    async fn drive(&self, task_id: &TaskId, kind: TaskKind) -> Result<()> {
        let max_attempts = self.config.max_attempts(kind);

        for attempt in 1..=max_attempts {
            let payload = match self.remote.poll(kind, task_id).await {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(
                        task_id = %task_id,
                        attempt,
                        error = %e,
                        "Polling remote task failed"
                    );
                    self.registry
                        .update(task_id, |r| r.poll_attempts = attempt)
                        .await;
                    tokio::time::sleep(self.config.error_backoff).await;
                    continue;
                }
            };

            let remote_status = payload.remote_status();
            tracing::debug!(
                task_id = %task_id,
                attempt,
                status = ?remote_status,
                progress = payload.progress_percent(),
                "Polled remote task"
            );

            match remote_status {
                RemoteStatus::Succeeded => {
                    // Publish the payload now; the status stays non-terminal
                    // until the artifacts are on disk.
                    let progress = payload.progress_percent();
                    let snapshot = payload.clone();
                    self.registry
                        .update(task_id, |r| {
                            r.status = remote_status.next_local(r.status);
                            r.progress = progress;
                            r.remote = snapshot;
                            r.poll_attempts = attempt;
                        })
                        .await;
                    return self.complete(task_id, kind, payload, attempt).await;
                }
                RemoteStatus::Failed | RemoteStatus::Canceled => {
                    self.fail(task_id, remote_status, payload, attempt).await;
                    return Ok(());
                }
                _ => {
                    let progress = payload.progress_percent();
                    let mut observed = None;
                    let applied = self
                        .registry
                        .update(task_id, |r| {
                            r.status = remote_status.next_local(r.status);
                            r.progress = progress;
                            r.remote = payload;
                            r.poll_attempts = attempt;
                            observed = Some(r.status);
                        })
                        .await;
                    if applied && let Some(status) = observed {
                        self.emit_event(Event::TaskProgress {
                            task_id: task_id.clone(),
                            status,
                            progress,
                        });
                    }
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }

        tracing::warn!(
            task_id = %task_id,
            attempts = max_attempts,
            "Task did not finish within its poll budget"
        );
        let applied = self
            .registry
            .update(task_id, |r| {
                r.status = TaskStatus::TimedOut;
                r.poll_attempts = max_attempts;
                r.error_message = Some(format!(
                    "Task did not finish within {} poll attempts",
                    max_attempts
                ));
            })
            .await;
        if applied {
            self.emit_event(Event::TaskTimedOut {
                task_id: task_id.clone(),
                attempts: max_attempts,
            });
        }
        Ok(())
    }

    /// Fetch artifacts and commit `Succeeded` in one update
    ///
    /// Remote fetch failures are recorded but keep the task `Succeeded`;
    /// local write failures are returned as errors.
    async fn complete(
        &self,
        task_id: &TaskId,
        kind: TaskKind,
        payload: RemoteTask,
        attempt: u32,
    ) -> Result<()> {
        let mut fetch_errors = Vec::new();

        let model_path = match payload.glb_url() {
            Some(url) => {
                self.fetch_artifact(
                    task_id,
                    url,
                    &artifact::model_filename(kind, task_id),
                    &mut fetch_errors,
                )
                .await?
            }
            None => {
                tracing::warn!(task_id = %task_id, "Succeeded task has no GLB model URL");
                None
            }
        };

        let thumbnail_path = match payload.thumbnail() {
            Some(url) => {
                self.fetch_artifact(
                    task_id,
                    url,
                    &artifact::thumbnail_filename(kind, task_id),
                    &mut fetch_errors,
                )
                .await?
            }
            None => None,
        };

        let error_message = (!fetch_errors.is_empty()).then(|| fetch_errors.join("; "));
        let event_model_path = model_path.clone();

        let applied = self
            .registry
            .update(task_id, |r| {
                r.status = TaskStatus::Succeeded;
                r.progress = 100;
                r.remote = payload;
                r.poll_attempts = attempt;
                r.local_model_path = model_path;
                r.local_thumbnail_path = thumbnail_path;
                r.error_message = error_message;
            })
            .await;
        if !applied {
            tracing::debug!(task_id = %task_id, "Task removed before completion");
            return Ok(());
        }

        tracing::info!(
            task_id = %task_id,
            model = ?event_model_path,
            "Task succeeded"
        );
        self.emit_event(Event::TaskSucceeded {
            task_id: task_id.clone(),
            model_path: event_model_path,
        });
        Ok(())
    }

    async fn fetch_artifact(
        &self,
        task_id: &TaskId,
        url: &str,
        filename: &str,
        fetch_errors: &mut Vec<String>,
    ) -> Result<Option<String>> {
        match self.fetcher.fetch(url, filename).await {
            Ok(path) => {
                self.emit_event(Event::ArtifactStored {
                    task_id: task_id.clone(),
                    path: path.clone(),
                });
                Ok(Some(path))
            }
            Err(e) if e.is_local() => Err(e.into()),
            Err(e) => {
                tracing::warn!(
                    task_id = %task_id,
                    url = %url,
                    error = %e,
                    "Artifact download failed"
                );
                self.emit_event(Event::ArtifactFetchFailed {
                    task_id: task_id.clone(),
                    url: url.to_string(),
                    error: e.to_string(),
                });
                fetch_errors.push(e.to_string());
                Ok(None)
            }
        }
    }

    async fn fail(
        &self,
        task_id: &TaskId,
        remote_status: RemoteStatus,
        payload: RemoteTask,
        attempt: u32,
    ) {
        let message = payload.error_message().unwrap_or(UNKNOWN_ERROR).to_string();
        let status = remote_status.next_local(TaskStatus::Processing);
        let progress = payload.progress_percent();
        let recorded = message.clone();

        let applied = self
            .registry
            .update(task_id, |r| {
                r.status = status;
                r.progress = progress;
                r.remote = payload;
                r.poll_attempts = attempt;
                r.error_message = Some(recorded);
            })
            .await;
        if !applied {
            tracing::debug!(task_id = %task_id, "Task removed before failure was recorded");
            return;
        }

        tracing::warn!(
            task_id = %task_id,
            status = %status,
            error = %message,
            "Remote task failed"
        );
        self.emit_event(Event::TaskFailed {
            task_id: task_id.clone(),
            status,
            error: message,
        });
    }

    async fn mark_errored(&self, task_id: &TaskId, error: String) {
        tracing::error!(task_id = %task_id, error = %error, "Monitor stopped by local error");
        let recorded = error.clone();
        let applied = self
            .registry
            .update(task_id, |r| {
                r.status = TaskStatus::ErroredLocally;
                r.error_message = Some(recorded);
            })
            .await;
        if applied {
            self.emit_event(Event::TaskErrored {
                task_id: task_id.clone(),
                error,
            });
        }
    }

    fn emit_event(&self, event: Event) {
        // send() returns Err if there are no receivers, which is fine - we just drop the event
        self.event_tx.send(event).ok();
    }
}
