//! Task handlers: creation from uploads, status, download links, deletion.

use super::GenerationQuery;
use crate::api::AppState;
use crate::error::Error;
use crate::types::{
    CreateTaskResponse, DownloadLinks, ImageUpload, MessageResponse, TaskId, TaskKind, TaskList,
    TaskStatusView,
};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
};

/// Collect every upload in the multipart field `field_name`
async fn read_images(mut multipart: Multipart, field_name: &str) -> Result<Vec<ImageUpload>, Error> {
    let mut images = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return Err(Error::Validation(format!(
                    "Failed to read multipart body: {}",
                    e
                )));
            }
        };

        if field.name() != Some(field_name) {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::Validation(format!("Failed to read file: {}", e)))?;

        images.push(ImageUpload {
            content_type,
            bytes: bytes.to_vec(),
            filename,
        });
    }

    Ok(images)
}

/// POST /create-task - Create a task from one image
#[utoipa::path(
    post,
    path = "/api/meshy/create-task",
    tag = "tasks",
    params(GenerationQuery),
    request_body(content = Vec<u8>, description = "Image upload in multipart field `file`", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Task accepted by the remote service", body = CreateTaskResponse),
        (status = 400, description = "Missing file, wrong content type", body = crate::error::ApiError),
        (status = 502, description = "Remote service rejected the request", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn create_task(
    State(state): State<AppState>,
    Query(query): Query<GenerationQuery>,
    multipart: Multipart,
) -> Result<Json<CreateTaskResponse>, Error> {
    let images = read_images(multipart, "file").await?;
    if images.is_empty() {
        return Err(Error::Validation(
            "No image provided in 'file' field".to_string(),
        ));
    }

    let created = state
        .service
        .create_task(
            TaskKind::SingleImage,
            images,
            query.into_options(TaskKind::SingleImage),
        )
        .await?;
    Ok(Json(created))
}

/// POST /create-multi-image-task - Create a task from 1-4 images
#[utoipa::path(
    post,
    path = "/api/meshy/create-multi-image-task",
    tag = "tasks",
    params(GenerationQuery),
    request_body(content = Vec<u8>, description = "1-4 image uploads in multipart field `files`", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Task accepted by the remote service", body = CreateTaskResponse),
        (status = 400, description = "Wrong image count or content type", body = crate::error::ApiError),
        (status = 502, description = "Remote service rejected the request", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn create_multi_image_task(
    State(state): State<AppState>,
    Query(query): Query<GenerationQuery>,
    multipart: Multipart,
) -> Result<Json<CreateTaskResponse>, Error> {
    let images = read_images(multipart, "files").await?;
    let created = state
        .service
        .create_multi_image_task(images, query.into_options(TaskKind::MultiImage))
        .await?;
    Ok(Json(created))
}

/// GET /task-status/:task_id - Task status
#[utoipa::path(
    get,
    path = "/api/meshy/task-status/{task_id}",
    tag = "tasks",
    params(
        ("task_id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Current task status", body = TaskStatusView),
        (status = 404, description = "Task not found", body = crate::error::ApiError)
    )
)]
pub async fn get_task_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskStatusView>, Error> {
    let view = state.service.task_status(&TaskId::from(task_id)).await?;
    Ok(Json(view))
}

/// GET /download-model/:task_id - Local model links
#[utoipa::path(
    get,
    path = "/api/meshy/download-model/{task_id}",
    tag = "tasks",
    params(
        ("task_id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Model is stored locally", body = DownloadLinks),
        (status = 404, description = "Task or model file not found", body = crate::error::ApiError),
        (status = 412, description = "Model is not ready yet", body = crate::error::ApiError)
    )
)]
pub async fn download_model(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<DownloadLinks>, Error> {
    let links = state.service.download_links(&TaskId::from(task_id)).await?;
    Ok(Json(links))
}

/// GET /tasks - List all tasks
#[utoipa::path(
    get,
    path = "/api/meshy/tasks",
    tag = "tasks",
    responses(
        (status = 200, description = "All tracked tasks", body = TaskList)
    )
)]
pub async fn list_tasks(State(state): State<AppState>) -> Json<TaskList> {
    Json(state.service.list_tasks().await)
}

/// DELETE /task/:task_id - Forget a task
#[utoipa::path(
    delete,
    path = "/api/meshy/task/{task_id}",
    tag = "tasks",
    params(
        ("task_id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task removed", body = MessageResponse),
        (status = 404, description = "Task not found", body = crate::error::ApiError)
    )
)]
pub async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<MessageResponse>, Error> {
    let deleted = state.service.delete_task(&TaskId::from(task_id)).await?;
    Ok(Json(deleted))
}
