//! Read and delete operations layered on the registry.

use super::TaskService;
use crate::error::{Result, TaskError};
use crate::types::{
    DownloadLinks, Event, MessageResponse, TaskId, TaskList, TaskStatus, TaskStatusView,
};

impl TaskService {
    /// Summaries of all tracked tasks, in no particular order
    pub async fn list_tasks(&self) -> TaskList {
        TaskList {
            tasks: self.registry.list().await,
        }
    }

    /// Current status of one task
    ///
    /// `thumbnail_url` is the local thumbnail path, not the remote one.
    pub async fn task_status(&self, task_id: &TaskId) -> Result<TaskStatusView> {
        let record = self.registry.get(task_id).await?;
        Ok(TaskStatusView {
            task_id: record.task_id,
            status: record.status,
            progress: record.progress,
            model_urls: record.remote.model_urls,
            thumbnail_url: record.local_thumbnail_path,
            texture_urls: record.remote.texture_urls,
            created_at: record.remote.created_at,
            finished_at: record.remote.finished_at,
        })
    }

    /// Local download links of a finished task
    ///
    /// # Errors
    ///
    /// - [`TaskError::NotFound`] if the task is unknown
    /// - [`TaskError::NotReady`] if the task has not succeeded
    /// - [`TaskError::ModelMissing`] if it succeeded without a stored model
    pub async fn download_links(&self, task_id: &TaskId) -> Result<DownloadLinks> {
        let record = self.registry.get(task_id).await?;

        if record.status != TaskStatus::Succeeded {
            return Err(TaskError::NotReady {
                id: task_id.to_string(),
                status: record.status.to_string(),
            }
            .into());
        }

        let model_url = record.local_model_path.ok_or_else(|| TaskError::ModelMissing {
            id: task_id.to_string(),
        })?;

        Ok(DownloadLinks {
            model_url,
            thumbnail_url: record.local_thumbnail_path,
            status: "ready".to_string(),
        })
    }

    /// Remove a task from the registry
    ///
    /// Stored artifacts stay on disk and a running monitor is not stopped.
    pub async fn delete_task(&self, task_id: &TaskId) -> Result<MessageResponse> {
        if !self.registry.delete(task_id).await {
            return Err(TaskError::NotFound {
                id: task_id.to_string(),
            }
            .into());
        }

        tracing::info!(task_id = %task_id, "Task deleted");
        self.emit_event(Event::TaskDeleted {
            task_id: task_id.clone(),
        });

        Ok(MessageResponse {
            message: format!("Task {} deleted", task_id),
        })
    }
}
