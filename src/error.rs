//! Error types for meshgate
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (task lookup, artifact fetching)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for meshgate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for meshgate
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "remote.base_url")
        key: Option<String>,
    },

    /// Rejected input (image count, content type, options)
    #[error("validation error: {0}")]
    Validation(String),

    /// Task lookup or state error
    #[error(transparent)]
    Task(#[from] TaskError),

    /// Remote service answered with an unexpected HTTP status
    #[error("remote service error ({status}): {body}")]
    RemoteStatus {
        /// HTTP status code returned by the remote service
        status: u16,
        /// Response body returned by the remote service
        body: String,
    },

    /// Remote service answered with a body that violates its contract
    #[error("invalid response from remote service: {0}")]
    RemoteProtocol(String),

    /// Artifact download failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error talking to the remote service
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Shutdown in progress - not accepting new tasks
    #[error("shutdown in progress: not accepting new tasks")]
    ShuttingDown,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Task lookup and state errors
#[derive(Debug, Error)]
pub enum TaskError {
    /// No record for this id
    #[error("task {id} not found")]
    NotFound {
        /// The task id that was not found
        id: String,
    },

    /// Model requested before the task succeeded
    #[error("model for task {id} is not ready yet (status {status})")]
    NotReady {
        /// The task id
        id: String,
        /// Current status label
        status: String,
    },

    /// Task succeeded but no local model was stored
    #[error("model file for task {id} not found")]
    ModelMissing {
        /// The task id
        id: String,
    },

    /// A record with this id already exists
    #[error("task {id} already exists")]
    AlreadyExists {
        /// The duplicate task id
        id: String,
    },
}

/// Artifact download errors
#[derive(Debug, Error)]
pub enum FetchError {
    /// Artifact host answered with a status other than 200
    #[error("failed to download {url}: HTTP {status}")]
    Status {
        /// Remote URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Connection or stream failure while downloading
    #[error("failed to download {url}: {source}")]
    Transport {
        /// Remote URL
        url: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// Local filesystem failure while storing the artifact
    #[error("failed to write artifact {path}: {source}")]
    Write {
        /// Local file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Whether the failure originates on this host rather than the remote side
    pub fn is_local(&self) -> bool {
        matches!(self, FetchError::Write { .. })
    }
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "task_not_found",
///     "message": "task abc123 not found",
///     "details": {
///       "task_id": "abc123"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "task_not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::Validation(_) => 400,

            Error::Task(TaskError::NotFound { .. }) => 404,
            Error::Task(TaskError::ModelMissing { .. }) => 404,
            Error::Task(TaskError::NotReady { .. }) => 412,
            Error::Task(TaskError::AlreadyExists { .. }) => 409,

            // 502 Bad Gateway - remote service misbehaved
            Error::RemoteStatus { .. } => 502,
            Error::RemoteProtocol(_) => 502,
            Error::Network(_) => 502,
            Error::Fetch(e) if !e.is_local() => 502,

            // 500 Internal Server Error - Server-side issues
            Error::Fetch(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::Task(e) => match e {
                TaskError::NotFound { .. } => "task_not_found",
                TaskError::NotReady { .. } => "task_not_ready",
                TaskError::ModelMissing { .. } => "model_not_found",
                TaskError::AlreadyExists { .. } => "task_exists",
            },
            Error::RemoteStatus { .. } => "remote_error",
            Error::RemoteProtocol(_) => "remote_protocol_error",
            Error::Fetch(e) => match e {
                FetchError::Status { .. } | FetchError::Transport { .. } => "artifact_fetch_failed",
                FetchError::Write { .. } => "artifact_write_failed",
            },
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::ShuttingDown => "shutting_down",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Task(TaskError::NotFound { id })
            | Error::Task(TaskError::ModelMissing { id })
            | Error::Task(TaskError::AlreadyExists { id }) => Some(serde_json::json!({
                "task_id": id,
            })),
            Error::Task(TaskError::NotReady { id, status }) => Some(serde_json::json!({
                "task_id": id,
                "status": status,
            })),
            Error::RemoteStatus { status, .. } => Some(serde_json::json!({
                "remote_status": status,
            })),
            Error::Fetch(FetchError::Status { url, status }) => Some(serde_json::json!({
                "url": url,
                "remote_status": status,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
