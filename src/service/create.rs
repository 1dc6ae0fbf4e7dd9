//! Task creation: validation, remote submission and monitor spawning.

use super::TaskService;
use crate::error::{Error, Result};
use crate::types::{CreateTaskResponse, Event, GenerationOptions, ImageUpload, TaskKind};
use std::sync::atomic::Ordering;

/// MIME types accepted for input images
pub const ACCEPTED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/jpg", "image/png"];

/// Upper bound on images per multi-image task
pub const MAX_MULTI_IMAGES: usize = 4;

/// Check image count and content types for a task kind
///
/// Runs before anything is sent to the remote service.
pub fn validate_images(kind: TaskKind, images: &[ImageUpload]) -> Result<()> {
    match kind {
        TaskKind::SingleImage if images.len() != 1 => {
            return Err(Error::Validation(format!(
                "Image to 3D requires exactly one image, got {}",
                images.len()
            )));
        }
        TaskKind::MultiImage if images.is_empty() || images.len() > MAX_MULTI_IMAGES => {
            return Err(Error::Validation(format!(
                "Multi-Image to 3D requires 1-{} images, got {}",
                MAX_MULTI_IMAGES,
                images.len()
            )));
        }
        _ => {}
    }

    for image in images {
        let mime = image
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if !mime.starts_with("image/") {
            return Err(Error::Validation(format!(
                "File must be an image, got '{}'",
                image.content_type
            )));
        }
        if !ACCEPTED_CONTENT_TYPES.contains(&mime.as_str()) {
            return Err(Error::Validation(format!(
                "Supported formats: JPG, JPEG, PNG (got '{}')",
                image.content_type
            )));
        }
    }

    Ok(())
}

impl TaskService {
    /// Submit a single-image generation task
    pub async fn create_single_image_task(
        &self,
        image: ImageUpload,
        options: GenerationOptions,
    ) -> Result<CreateTaskResponse> {
        self.create_task(TaskKind::SingleImage, vec![image], options)
            .await
    }

    /// Submit a multi-image generation task (1 to 4 images)
    pub async fn create_multi_image_task(
        &self,
        images: Vec<ImageUpload>,
        options: GenerationOptions,
    ) -> Result<CreateTaskResponse> {
        self.create_task(TaskKind::MultiImage, images, options).await
    }

    /// Validate, submit, register and start monitoring
    ///
    /// Returns as soon as the remote service has accepted the task; the
    /// monitor runs detached from the caller.
    pub async fn create_task(
        &self,
        kind: TaskKind,
        images: Vec<ImageUpload>,
        options: GenerationOptions,
    ) -> Result<CreateTaskResponse> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        validate_images(kind, &images)?;

        let task_id = self.remote.submit(kind, &images, &options).await?;
        let record = self.registry.create(task_id.clone(), kind).await?;

        self.emit_event(Event::TaskCreated {
            task_id: task_id.clone(),
            kind,
        });
        self.monitor.spawn(task_id.clone(), kind);

        tracing::info!(
            task_id = %task_id,
            kind = %kind,
            images = images.len(),
            "Task created"
        );

        let message = match kind {
            TaskKind::SingleImage => "Task created successfully. Processing started.".to_string(),
            TaskKind::MultiImage => format!(
                "Multi-Image task created successfully with {} images. Processing started.",
                images.len()
            ),
        };

        Ok(CreateTaskResponse {
            task_id,
            status: record.status,
            progress: record.progress,
            message,
        })
    }
}
