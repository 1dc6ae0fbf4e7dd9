//! Core types for meshgate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// Identifier assigned to a generation task by the remote service
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Create a new TaskId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which remote pipeline a task was submitted to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum TaskKind {
    /// One input image (`/image-to-3d`)
    #[serde(rename = "single-image")]
    SingleImage,
    /// One to four input images (`/multi-image-to-3d`)
    #[serde(rename = "multi-image")]
    MultiImage,
}

impl TaskKind {
    /// Remote endpoint segment for this kind
    pub fn endpoint(&self) -> &'static str {
        match self {
            TaskKind::SingleImage => "image-to-3d",
            TaskKind::MultiImage => "multi-image-to-3d",
        }
    }

    /// Prefix applied to the task id when naming local artifacts.
    ///
    /// Keeps single- and multi-image artifacts for the same raw id apart.
    pub fn file_prefix(&self) -> &'static str {
        match self {
            TaskKind::SingleImage => "",
            TaskKind::MultiImage => "multi_",
        }
    }

    /// Human-readable label used in log lines and messages
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::SingleImage => "single-image",
            TaskKind::MultiImage => "multi-image",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Local lifecycle status of a task
///
/// Serialized with the labels the frontend already understands, so
/// `Processing` goes over the wire as `IN_PROGRESS`, `TimedOut` as `TIMEOUT`
/// and `ErroredLocally` as `ERROR`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum TaskStatus {
    /// Accepted by the remote service, not polled yet
    #[serde(rename = "PENDING")]
    Pending,
    /// Remote service is working on it
    #[serde(rename = "IN_PROGRESS")]
    Processing,
    /// Remote service finished successfully
    #[serde(rename = "SUCCEEDED")]
    Succeeded,
    /// Remote service reported a failure
    #[serde(rename = "FAILED")]
    Failed,
    /// Remote service reported the task as canceled
    #[serde(rename = "CANCELED")]
    Canceled,
    /// Poll budget exhausted before a terminal remote status
    #[serde(rename = "TIMEOUT")]
    TimedOut,
    /// A local defect stopped the monitor
    #[serde(rename = "ERROR")]
    ErroredLocally,
}

impl TaskStatus {
    /// Whether no further transitions are allowed
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Pending | TaskStatus::Processing)
    }

    /// Whether moving from `self` to `next` respects the state machine.
    ///
    /// Terminal states only "transition" to themselves; `Processing` never goes
    /// back to `Pending`.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        match self {
            TaskStatus::Pending => true,
            TaskStatus::Processing => next != TaskStatus::Pending,
            terminal => *terminal == next,
        }
    }

    /// Wire label, identical to the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Processing => "IN_PROGRESS",
            TaskStatus::Succeeded => "SUCCEEDED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Canceled => "CANCELED",
            TaskStatus::TimedOut => "TIMEOUT",
            TaskStatus::ErroredLocally => "ERROR",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status label reported by the remote service
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteStatus {
    /// Queued remotely
    Pending,
    /// Being processed remotely
    InProgress,
    /// Terminal success
    Succeeded,
    /// Terminal failure
    Failed,
    /// Terminal cancellation
    Canceled,
    /// Missing or unrecognised label
    Unknown(String),
}

impl RemoteStatus {
    /// Parse the remote `status` field; absence yields `Unknown("")`
    pub fn parse(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            Some("PENDING") => RemoteStatus::Pending,
            Some("IN_PROGRESS") | Some("PROCESSING") => RemoteStatus::InProgress,
            Some("SUCCEEDED") => RemoteStatus::Succeeded,
            Some("FAILED") => RemoteStatus::Failed,
            Some("CANCELED") | Some("CANCELLED") => RemoteStatus::Canceled,
            Some(other) => RemoteStatus::Unknown(other.to_string()),
            None => RemoteStatus::Unknown(String::new()),
        }
    }

    /// Local status a record moves to after observing this remote status.
    ///
    /// `SUCCEEDED` is not mapped here: the monitor commits it only after the
    /// artifacts have been fetched.
    pub fn next_local(&self, current: TaskStatus) -> TaskStatus {
        match self {
            RemoteStatus::Pending if current == TaskStatus::Pending => TaskStatus::Pending,
            RemoteStatus::Failed => TaskStatus::Failed,
            RemoteStatus::Canceled => TaskStatus::Canceled,
            _ => TaskStatus::Processing,
        }
    }
}

/// Error block of a remote status response
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteTaskError {
    /// Remote failure reason
    #[serde(default)]
    pub message: Option<String>,
}

/// Decoded remote status response.
///
/// The fields the proxy consumes are typed; everything else lands in `extra`
/// and is kept for pass-through.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteTask {
    /// Remote task id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Remote status label (`PENDING`, `IN_PROGRESS`, `SUCCEEDED`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Remote progress, nominally 0..=100
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_int::deserialize"
    )]
    pub progress: Option<i64>,
    /// Model download URLs keyed by format (`glb`, `fbx`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_urls: Option<Map<String, Value>>,
    /// Remote thumbnail URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Texture URL sets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture_urls: Option<Vec<Value>>,
    /// Remote creation timestamp (milliseconds)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_int::deserialize"
    )]
    pub created_at: Option<i64>,
    /// Remote completion timestamp (milliseconds)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_int::deserialize"
    )]
    pub finished_at: Option<i64>,
    /// Remote error block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_error: Option<RemoteTaskError>,
    /// Fields not modelled above
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RemoteTask {
    /// Parsed remote status
    pub fn remote_status(&self) -> RemoteStatus {
        RemoteStatus::parse(self.status.as_deref())
    }

    /// Remote progress clamped to 0..=100
    pub fn progress_percent(&self) -> u8 {
        self.progress.unwrap_or(0).clamp(0, 100) as u8
    }

    /// Downloadable GLB model URL, if any
    pub fn glb_url(&self) -> Option<&str> {
        self.model_urls
            .as_ref()
            .and_then(|urls| urls.get("glb"))
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
    }

    /// Downloadable thumbnail URL, if any
    pub fn thumbnail(&self) -> Option<&str> {
        self.thumbnail_url.as_deref().filter(|url| !url.is_empty())
    }

    /// Remote error message, if the remote service supplied a non-empty one
    pub fn error_message(&self) -> Option<&str> {
        self.task_error
            .as_ref()
            .and_then(|e| e.message.as_deref())
            .filter(|m| !m.is_empty())
    }
}

// Remote numbers sometimes arrive as floats or numeric strings. Anything that
// does not read as a number decodes to `None` instead of failing the poll.
mod lenient_int {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(as_int))
    }

    fn as_int(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
            }
            _ => None,
        }
    }
}

/// One generation job as tracked by the registry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Remote task id
    pub task_id: TaskId,
    /// Remote pipeline
    pub kind: TaskKind,
    /// Local lifecycle status
    pub status: TaskStatus,
    /// Progress percentage (0..=100)
    pub progress: u8,
    /// Last remote status response
    pub remote: RemoteTask,
    /// Addressable path of the downloaded model
    pub local_model_path: Option<String>,
    /// Addressable path of the downloaded thumbnail
    pub local_thumbnail_path: Option<String>,
    /// Failure reason
    pub error_message: Option<String>,
    /// Poll attempts consumed by the monitor
    pub poll_attempts: u32,
    /// When the record was created locally
    pub created_at: DateTime<Utc>,
    /// When the record was last changed
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    /// Fresh `Pending` record with zero progress
    pub fn new(task_id: TaskId, kind: TaskKind) -> Self {
        let now = Utc::now();
        Self {
            task_id,
            kind,
            status: TaskStatus::Pending,
            progress: 0,
            remote: RemoteTask::default(),
            local_model_path: None,
            local_thumbnail_path: None,
            error_message: None,
            poll_attempts: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Project into a list entry
    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            task_id: self.task_id.clone(),
            status: self.status,
            progress: self.progress,
            kind: self.kind,
            has_model: self.local_model_path.is_some(),
        }
    }
}

/// Input image accepted from the frontend
#[derive(Clone, Debug)]
pub struct ImageUpload {
    /// Declared MIME type
    pub content_type: String,
    /// Raw image bytes
    pub bytes: Vec<u8>,
    /// Original file name, when supplied
    pub filename: Option<String>,
}

impl ImageUpload {
    /// Create an upload from a content type and body
    pub fn new(content_type: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: content_type.into(),
            bytes: bytes.into(),
            filename: None,
        }
    }
}

/// Generation options forwarded to the remote service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GenerationOptions {
    /// Remote model name (`meshy-4`, `meshy-5`, ...)
    pub ai_model: String,
    /// Mesh topology (`triangle` or `quad`)
    pub topology: String,
    /// Target polygon count
    pub target_polycount: u32,
    /// Whether to generate textures
    pub should_texture: bool,
    /// Whether to generate PBR maps (single-image only)
    pub enable_pbr: bool,
    /// Optional texture guidance prompt
    pub texture_prompt: Option<String>,
}

impl GenerationOptions {
    /// Defaults for the given pipeline
    pub fn for_kind(kind: TaskKind) -> Self {
        let ai_model = match kind {
            TaskKind::SingleImage => "meshy-4",
            TaskKind::MultiImage => "meshy-5",
        };
        Self {
            ai_model: ai_model.to_string(),
            topology: "triangle".to_string(),
            target_polycount: 30_000,
            should_texture: true,
            enable_pbr: false,
            texture_prompt: None,
        }
    }
}

/// Entry of the task list
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TaskSummary {
    /// Task id
    pub task_id: TaskId,
    /// Local status
    pub status: TaskStatus,
    /// Progress percentage
    pub progress: u8,
    /// Pipeline the task was submitted to
    #[serde(rename = "type")]
    pub kind: TaskKind,
    /// Whether a local model file is available
    pub has_model: bool,
}

/// Response for GET /tasks
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskList {
    /// All tracked tasks
    pub tasks: Vec<TaskSummary>,
}

/// Status view of a single task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TaskStatusView {
    /// Task id
    pub task_id: TaskId,
    /// Local status
    pub status: TaskStatus,
    /// Progress percentage
    pub progress: u8,
    /// Remote model URLs keyed by format
    #[schema(value_type = Option<Object>)]
    pub model_urls: Option<Map<String, Value>>,
    /// Local thumbnail path (the remote thumbnail URL is not exposed)
    pub thumbnail_url: Option<String>,
    /// Remote texture URL sets
    #[schema(value_type = Option<Vec<Object>>)]
    pub texture_urls: Option<Vec<Value>>,
    /// Remote creation timestamp
    pub created_at: Option<i64>,
    /// Remote completion timestamp
    pub finished_at: Option<i64>,
}

/// Local download links of a finished task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DownloadLinks {
    /// Addressable model path
    pub model_url: String,
    /// Addressable thumbnail path
    pub thumbnail_url: Option<String>,
    /// Always `"ready"`
    pub status: String,
}

/// Response for the task creation endpoints
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreateTaskResponse {
    /// Remote task id
    pub task_id: TaskId,
    /// Initial status (always `PENDING`)
    pub status: TaskStatus,
    /// Initial progress (always 0)
    pub progress: u8,
    /// Human-readable confirmation
    pub message: String,
}

/// Plain confirmation message (`{"message": ...}`)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    /// Human-readable confirmation
    pub message: String,
}

/// Event emitted during the task lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Task accepted by the remote service and registered
    TaskCreated {
        /// Task id
        task_id: TaskId,
        /// Pipeline
        kind: TaskKind,
    },

    /// A poll returned a non-terminal status
    TaskProgress {
        /// Task id
        task_id: TaskId,
        /// Local status after the poll
        status: TaskStatus,
        /// Progress percentage
        progress: u8,
    },

    /// Task finished and artifacts were fetched (where available)
    TaskSucceeded {
        /// Task id
        task_id: TaskId,
        /// Local model path, if one was stored
        #[serde(skip_serializing_if = "Option::is_none")]
        model_path: Option<String>,
    },

    /// Remote service reported FAILED or CANCELED
    TaskFailed {
        /// Task id
        task_id: TaskId,
        /// FAILED or CANCELED
        status: TaskStatus,
        /// Failure reason
        error: String,
    },

    /// Poll budget exhausted
    TaskTimedOut {
        /// Task id
        task_id: TaskId,
        /// Attempts consumed
        attempts: u32,
    },

    /// Local defect stopped the monitor
    TaskErrored {
        /// Task id
        task_id: TaskId,
        /// Error text
        error: String,
    },

    /// Artifact written to the local artifact directory
    ArtifactStored {
        /// Task id
        task_id: TaskId,
        /// Addressable path
        path: String,
    },

    /// Artifact download failed after the remote task succeeded
    ArtifactFetchFailed {
        /// Task id
        task_id: TaskId,
        /// Remote URL that failed
        url: String,
        /// Error text
        error: String,
    },

    /// Task removed from the registry
    TaskDeleted {
        /// Task id
        task_id: TaskId,
    },

    /// Service is shutting down
    Shutdown,
}

impl Event {
    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            Event::TaskCreated { .. } => "task_created",
            Event::TaskProgress { .. } => "task_progress",
            Event::TaskSucceeded { .. } => "task_succeeded",
            Event::TaskFailed { .. } => "task_failed",
            Event::TaskTimedOut { .. } => "task_timed_out",
            Event::TaskErrored { .. } => "task_errored",
            Event::ArtifactStored { .. } => "artifact_stored",
            Event::ArtifactFetchFailed { .. } => "artifact_fetch_failed",
            Event::TaskDeleted { .. } => "task_deleted",
            Event::Shutdown => "shutdown",
        }
    }
}
