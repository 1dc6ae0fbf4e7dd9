//! Waiting helpers for task lifecycle tests

use meshgate::{Event, TaskId, TaskStatus};
use std::time::Duration;
use tokio::sync::broadcast;

/// Terminal outcome observed on the event channel
#[derive(Debug, PartialEq)]
pub enum WaitResult {
    /// Task succeeded, with the stored model path if any
    Succeeded(Option<String>),
    /// Remote failure or cancellation
    Failed(TaskStatus, String),
    /// Poll budget exhausted
    TimedOut(u32),
    /// Local defect
    Errored(String),
    /// Nothing terminal arrived in time
    Timeout,
    /// Event channel closed
    ChannelClosed,
}

/// Wait for the terminal event of `task_id`
///
/// Subscribe before creating the task so no event is missed.
pub async fn wait_for_terminal(
    events: &mut broadcast::Receiver<Event>,
    task_id: &TaskId,
    timeout: Duration,
) -> WaitResult {
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::TaskSucceeded { task_id: id, model_path }) if &id == task_id => {
                    return WaitResult::Succeeded(model_path);
                }
                Ok(Event::TaskFailed {
                    task_id: id,
                    status,
                    error,
                }) if &id == task_id => {
                    return WaitResult::Failed(status, error);
                }
                Ok(Event::TaskTimedOut { task_id: id, attempts }) if &id == task_id => {
                    return WaitResult::TimedOut(attempts);
                }
                Ok(Event::TaskErrored { task_id: id, error }) if &id == task_id => {
                    return WaitResult::Errored(error);
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return WaitResult::ChannelClosed,
            }
        }
    })
    .await;

    result.unwrap_or(WaitResult::Timeout)
}

/// Progress values reported for `task_id`, in order
pub fn progress_values(events: &[Event], task_id: &TaskId) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::TaskProgress {
                task_id: id,
                progress,
                ..
            } if id == task_id => Some(*progress),
            _ => None,
        })
        .collect()
}

/// Collect events until an artifact whose path ends with `suffix` is stored
///
/// Panics if it does not arrive within `timeout`.
pub async fn collect_until_stored(
    events: &mut broadcast::Receiver<Event>,
    suffix: &str,
    timeout: Duration,
) -> Vec<Event> {
    let mut seen = Vec::new();
    tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let done = matches!(
                        &event,
                        Event::ArtifactStored { path, .. } if path.ends_with(suffix)
                    );
                    seen.push(event);
                    if done {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("artifact was not stored in time");
    seen
}
