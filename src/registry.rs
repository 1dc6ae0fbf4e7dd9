//! In-memory task registry
//!
//! The registry is the single source of truth for task state. It is injected
//! into the service and every monitor, so each test can work on a fresh one.

use crate::error::{Result, TaskError};
use crate::types::{TaskId, TaskKind, TaskRecord, TaskSummary};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared map of task id to [`TaskRecord`] (cloneable - the map is Arc-wrapped)
#[derive(Clone, Default)]
pub struct TaskRegistry {
    tasks: Arc<RwLock<HashMap<TaskId, TaskRecord>>>,
}

impl TaskRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh `Pending` record
    ///
    /// # Errors
    /// [`TaskError::AlreadyExists`] if a record with this id is present
    pub async fn create(&self, task_id: TaskId, kind: TaskKind) -> Result<TaskRecord> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task_id) {
            return Err(TaskError::AlreadyExists {
                id: task_id.to_string(),
            }
            .into());
        }
        let record = TaskRecord::new(task_id.clone(), kind);
        tasks.insert(task_id, record.clone());
        Ok(record)
    }

    /// Snapshot of a record
    ///
    /// # Errors
    /// [`TaskError::NotFound`] if the id is unknown
    pub async fn get(&self, task_id: &TaskId) -> Result<TaskRecord> {
        self.tasks
            .read()
            .await
            .get(task_id)
            .cloned()
            .ok_or_else(|| {
                TaskError::NotFound {
                    id: task_id.to_string(),
                }
                .into()
            })
    }

    /// Apply `mutator` to a record atomically
    ///
    /// The mutator runs on a copy. The copy replaces the stored record only if
    /// the status change it makes is allowed; progress never goes down while
    /// the task is not terminal. Returns `false` when the id is unknown or the
    /// change was discarded.
    pub async fn update<F>(&self, task_id: &TaskId, mutator: F) -> bool
    where
        F: FnOnce(&mut TaskRecord),
    {
        let mut tasks = self.tasks.write().await;
        let Some(current) = tasks.get_mut(task_id) else {
            tracing::debug!(task_id = %task_id, "Update for unknown task ignored");
            return false;
        };

        let mut next = current.clone();
        mutator(&mut next);

        if !current.status.can_transition_to(next.status) {
            tracing::warn!(
                task_id = %task_id,
                from = %current.status,
                to = %next.status,
                "Rejected invalid status transition"
            );
            return false;
        }

        next.task_id = current.task_id.clone();
        next.kind = current.kind;
        next.progress = next.progress.min(100);
        if !next.status.is_terminal() {
            next.progress = next.progress.max(current.progress);
        }
        next.updated_at = Utc::now();
        *current = next;
        true
    }

    /// Remove a record; returns whether it existed
    ///
    /// A running monitor for the id is not signalled; its later updates
    /// become no-ops.
    pub async fn delete(&self, task_id: &TaskId) -> bool {
        self.tasks.write().await.remove(task_id).is_some()
    }

    /// Summaries of every record, in no particular order
    pub async fn list(&self) -> Vec<TaskSummary> {
        self.tasks
            .read()
            .await
            .values()
            .map(TaskRecord::summary)
            .collect()
    }

    /// Whether a record with this id exists
    pub async fn contains(&self, task_id: &TaskId) -> bool {
        self.tasks.read().await.contains_key(task_id)
    }

    /// Number of records
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Whether the registry holds no records
    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}
