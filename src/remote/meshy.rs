//! reqwest implementation of [`GenerationService`] for the Meshy API

use super::{GenerationRequest, GenerationService};
use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::types::{GenerationOptions, ImageUpload, RemoteTask, TaskId, TaskKind};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

/// Creation response: the remote task id lives in `result`
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    result: Option<String>,
}

/// HTTP client for the Meshy image-to-3D API
#[derive(Clone, Debug)]
pub struct MeshyClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MeshyClient {
    /// Create a client from the remote section of the configuration
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("meshgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, kind: TaskKind) -> String {
        format!("{}/{}", self.base_url, kind.endpoint())
    }
}

#[async_trait]
impl GenerationService for MeshyClient {
    async fn submit(
        &self,
        kind: TaskKind,
        images: &[ImageUpload],
        options: &GenerationOptions,
    ) -> Result<TaskId> {
        let body = GenerationRequest::build(kind, images, options)?;

        tracing::info!(
            kind = %kind,
            images = images.len(),
            ai_model = %options.ai_model,
            "Submitting generation request"
        );

        let response = self
            .http
            .post(self.endpoint(kind))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status != StatusCode::OK && status != StatusCode::ACCEPTED {
            tracing::warn!(
                kind = %kind,
                status = status.as_u16(),
                "Remote service rejected generation request"
            );
            return Err(Error::RemoteStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: SubmitResponse = serde_json::from_str(&text).map_err(|e| {
            Error::RemoteProtocol(format!("undecodable creation response: {}", e))
        })?;

        match parsed.result.filter(|id| !id.trim().is_empty()) {
            Some(id) => {
                tracing::info!(task_id = %id, kind = %kind, "Remote task created");
                Ok(TaskId::new(id))
            }
            None => Err(Error::RemoteProtocol(
                "creation response carries no task id".to_string(),
            )),
        }
    }

    async fn poll(&self, kind: TaskKind, task_id: &TaskId) -> Result<RemoteTask> {
        let url = format!("{}/{}", self.endpoint(kind), task_id);

        let response = self.http.get(&url).bearer_auth(&self.api_key).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::RemoteStatus {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| Error::RemoteProtocol(format!("undecodable status response: {}", e)))
    }
}
