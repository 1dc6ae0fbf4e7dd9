//! Configuration types for meshgate

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Environment variable that overrides [`RemoteConfig::api_key`]
pub const API_KEY_ENV: &str = "MESHY_API_KEY";

/// Remote generation service settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RemoteConfig {
    /// Base URL of the generation API (default: "https://api.meshy.ai/openapi/v1")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token sent with every request
    #[serde(default)]
    pub api_key: String,

    /// Timeout for a single submit or poll request (default: 60 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub request_timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Background monitor settings
///
/// The effective timeout of a task is bounded by attempt count, not by a
/// wall-clock deadline.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct MonitorConfig {
    /// Poll attempts for single-image tasks (default: 300)
    #[serde(default = "default_single_image_attempts")]
    pub single_image_max_attempts: u32,

    /// Poll attempts for multi-image tasks (default: 600)
    #[serde(default = "default_multi_image_attempts")]
    pub multi_image_max_attempts: u32,

    /// Delay after a successful non-terminal poll, in milliseconds (default: 2000)
    #[serde(default = "default_poll_interval", with = "duration_millis_serde")]
    #[schema(value_type = u64)]
    pub poll_interval: Duration,

    /// Delay after a failed poll, in milliseconds (default: 5000)
    #[serde(default = "default_error_backoff", with = "duration_millis_serde")]
    #[schema(value_type = u64)]
    pub error_backoff: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            single_image_max_attempts: default_single_image_attempts(),
            multi_image_max_attempts: default_multi_image_attempts(),
            poll_interval: default_poll_interval(),
            error_backoff: default_error_backoff(),
        }
    }
}

impl MonitorConfig {
    /// Attempt budget for a task kind
    pub fn max_attempts(&self, kind: crate::types::TaskKind) -> u32 {
        match kind {
            crate::types::TaskKind::SingleImage => self.single_image_max_attempts,
            crate::types::TaskKind::MultiImage => self.multi_image_max_attempts,
        }
    }
}

/// Local artifact storage settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StorageConfig {
    /// Directory downloaded artifacts are written to (default: "./models")
    #[serde(default = "default_models_dir")]
    #[schema(value_type = String)]
    pub models_dir: PathBuf,

    /// URL prefix the directory is served under (default: "/models")
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,

    /// Write chunk size in bytes (default: 8192)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Total time allowed for one artifact download in seconds (default: 300)
    #[serde(default = "default_download_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub download_timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            url_prefix: default_url_prefix(),
            chunk_size: default_chunk_size(),
            download_timeout: default_download_timeout(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:8000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: the local frontend dev server)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,

    /// Maximum request body size for image uploads in bytes (default: 64 MiB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Groups settings for external access.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// Main configuration for [`TaskService`](crate::TaskService)
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Remote generation service
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Background monitor
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Artifact storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// API and external server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Load a JSON configuration file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config file '{}': {}", path.display(), e),
            ))
        })?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV)
            && !key.trim().is_empty()
        {
            self.remote.api_key = key.trim().to_string();
        }
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        let base = self.remote.base_url.trim();
        if base.is_empty() {
            return Err(config_error("base URL must not be empty", "remote.base_url"));
        }
        url::Url::parse(base).map_err(|e| {
            config_error(
                &format!("invalid base URL '{}': {}", base, e),
                "remote.base_url",
            )
        })?;

        if self.monitor.single_image_max_attempts == 0 {
            return Err(config_error(
                "attempt budget must be at least 1",
                "monitor.single_image_max_attempts",
            ));
        }
        if self.monitor.multi_image_max_attempts == 0 {
            return Err(config_error(
                "attempt budget must be at least 1",
                "monitor.multi_image_max_attempts",
            ));
        }

        if self.storage.chunk_size == 0 {
            return Err(config_error(
                "chunk size must be at least 1 byte",
                "storage.chunk_size",
            ));
        }
        if self.storage.download_timeout.is_zero() {
            return Err(config_error(
                "download timeout must be greater than zero",
                "storage.download_timeout",
            ));
        }
        if !self.storage.url_prefix.starts_with('/') {
            return Err(config_error(
                "URL prefix must start with '/'",
                "storage.url_prefix",
            ));
        }

        Ok(())
    }

    /// Base URL without a trailing slash
    pub fn remote_base(&self) -> &str {
        self.remote.base_url.trim().trim_end_matches('/')
    }
}

fn config_error(message: &str, key: &str) -> Error {
    Error::Config {
        message: message.to_string(),
        key: Some(key.to_string()),
    }
}

// Default value functions
fn default_base_url() -> String {
    "https://api.meshy.ai/openapi/v1".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_single_image_attempts() -> u32 {
    300
}

fn default_multi_image_attempts() -> u32 {
    600
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_error_backoff() -> Duration {
    Duration::from_secs(5)
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_url_prefix() -> String {
    "/models".to_string()
}

fn default_chunk_size() -> usize {
    8192
}

fn default_download_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn default_max_upload_bytes() -> usize {
    64 * 1024 * 1024
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".into(),
        "http://127.0.0.1:3000".into(),
    ]
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds)
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
