//! Artifact fetching into the local model directory
//!
//! Finished models and thumbnails are streamed from the remote artifact host
//! into [`StorageConfig::models_dir`] and handed back as addressable URL
//! paths (`/models/<file>`), never as filesystem paths.

use crate::config::StorageConfig;
use crate::error::{Error, FetchError, Result};
use crate::types::{TaskId, TaskKind};
use futures::StreamExt;
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Connect timeout for artifact downloads
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Local file name of the GLB model for a task
pub fn model_filename(kind: TaskKind, task_id: &TaskId) -> String {
    format!("{}{}.glb", kind.file_prefix(), sanitize_id(task_id.as_str()))
}

/// Local file name of the thumbnail for a task
pub fn thumbnail_filename(kind: TaskKind, task_id: &TaskId) -> String {
    format!(
        "{}{}_thumbnail.png",
        kind.file_prefix(),
        sanitize_id(task_id.as_str())
    )
}

/// Replace anything that could escape the artifact directory
fn sanitize_id(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

/// Streams remote artifacts into the local model directory
#[derive(Clone, Debug)]
pub struct ArtifactFetcher {
    http: reqwest::Client,
    dir: PathBuf,
    url_prefix: String,
    chunk_size: usize,
}

impl ArtifactFetcher {
    /// Create a fetcher with its own HTTP client
    ///
    /// Each download is bounded by [`StorageConfig::download_timeout`], body
    /// included, so a stalled host surfaces as a transport error.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(storage: &StorageConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(storage.download_timeout)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self::with_client(http, storage))
    }

    /// Create a fetcher around an existing HTTP client
    pub fn with_client(http: reqwest::Client, storage: &StorageConfig) -> Self {
        Self {
            http,
            dir: storage.models_dir.clone(),
            url_prefix: storage.url_prefix.trim_end_matches('/').to_string(),
            chunk_size: storage.chunk_size.max(1),
        }
    }

    /// Directory artifacts are written to
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the artifact directory if it does not exist
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create model directory '{}': {}",
                    self.dir.display(),
                    e
                ),
            ))
        })
    }

    /// Addressable URL path of a stored artifact
    pub fn addressable_path(&self, filename: &str) -> String {
        format!("{}/{}", self.url_prefix, filename)
    }

    /// Download `url` into `<dir>/<filename>` and return its addressable path
    ///
    /// Only HTTP 200 is accepted. A failure part-way through the body can
    /// leave a truncated file behind; only an `Ok` result means the artifact
    /// is complete.
    pub async fn fetch(&self, url: &str, filename: &str) -> std::result::Result<String, FetchError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let path = self.dir.join(filename);
        let write_err = |source: std::io::Error| FetchError::Write {
            path: path.clone(),
            source,
        };

        let mut file = tokio::fs::File::create(&path).await.map_err(write_err)?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;
            for piece in chunk.chunks(self.chunk_size) {
                file.write_all(piece).await.map_err(write_err)?;
            }
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(write_err)?;

        tracing::debug!(
            path = %path.display(),
            bytes = written,
            "Artifact stored"
        );

        Ok(self.addressable_path(filename))
    }
}
