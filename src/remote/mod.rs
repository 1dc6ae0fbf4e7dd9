//! Client side of the remote image-to-3D generation service
//!
//! The monitor and the service only talk to the remote side through the
//! [`GenerationService`] trait, so tests can drive them with scripted
//! implementations. [`MeshyClient`] is the production implementation.

use crate::error::{Error, Result};
use crate::types::{GenerationOptions, ImageUpload, RemoteTask, TaskId, TaskKind};
use async_trait::async_trait;
use base64::Engine as _;
use serde::Serialize;

mod meshy;

pub use meshy::MeshyClient;

/// Submit and poll contract of the remote generation service
///
/// Implementations are stateless with respect to tasks; all task state lives
/// in the [`TaskRegistry`](crate::registry::TaskRegistry).
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Submit a generation job and return the remote task id
    ///
    /// # Errors
    ///
    /// - [`Error::RemoteStatus`] when the remote side answers with anything
    ///   other than 200 or 202
    /// - [`Error::RemoteProtocol`] when the answer carries no task id
    /// - [`Error::Network`] on transport failures
    async fn submit(
        &self,
        kind: TaskKind,
        images: &[ImageUpload],
        options: &GenerationOptions,
    ) -> Result<TaskId>;

    /// Fetch the current remote state of a task
    async fn poll(&self, kind: TaskKind, task_id: &TaskId) -> Result<RemoteTask>;
}

/// Encode an image as a `data:<mime>;base64,<body>` URI
pub fn data_uri(image: &ImageUpload) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(&image.bytes);
    format!("data:{};base64,{}", image.content_type, encoded)
}

/// JSON body sent to the remote creation endpoints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    /// Single-image input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Multi-image input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_urls: Option<Vec<String>>,
    /// Remote model name
    pub ai_model: String,
    /// Mesh topology
    pub topology: String,
    /// Target polygon count
    pub target_polycount: u32,
    /// Whether to texture the model
    pub should_texture: bool,
    /// PBR maps, only understood by the single-image endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_pbr: Option<bool>,
    /// Texture guidance prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texture_prompt: Option<String>,
}

impl GenerationRequest {
    /// Build the request body for a task kind
    ///
    /// Empty texture prompts are dropped.
    pub fn build(
        kind: TaskKind,
        images: &[ImageUpload],
        options: &GenerationOptions,
    ) -> Result<Self> {
        let (image_url, image_urls, enable_pbr) = match kind {
            TaskKind::SingleImage => {
                let [image] = images else {
                    return Err(Error::Validation(format!(
                        "single-image generation takes exactly one image, got {}",
                        images.len()
                    )));
                };
                (Some(data_uri(image)), None, Some(options.enable_pbr))
            }
            TaskKind::MultiImage => {
                if images.is_empty() {
                    return Err(Error::Validation(
                        "multi-image generation needs at least one image".to_string(),
                    ));
                }
                (None, Some(images.iter().map(data_uri).collect()), None)
            }
        };

        let texture_prompt = options
            .texture_prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        Ok(Self {
            image_url,
            image_urls,
            ai_model: options.ai_model.clone(),
            topology: options.topology.clone(),
            target_polycount: options.target_polycount,
            should_texture: options.should_texture,
            enable_pbr,
            texture_prompt,
        })
    }
}
