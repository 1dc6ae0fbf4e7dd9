//! # meshgate
//!
//! Backend proxy for image-to-3D generation.
//!
//! meshgate accepts images from a frontend, submits them to the Meshy
//! image-to-3D service, follows each remote task in the background and
//! stores the finished GLB model and thumbnail locally so the frontend can
//! load them from `/models`.
//!
//! - **Fire and forget** - task creation returns as soon as the remote
//!   service accepted the job; a monitor loop does the rest
//! - **Single source of truth** - every task lives in one injected
//!   [`TaskRegistry`](registry::TaskRegistry)
//! - **Event-driven** - consumers can subscribe to task events instead of polling
//!
//! ## Quick Start
//!
//! ```no_run
//! use meshgate::{Config, GenerationOptions, ImageUpload, TaskKind, TaskService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.apply_env_overrides();
//!
//!     let service = TaskService::new(config).await?;
//!
//!     let mut events = service.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let image = ImageUpload::new("image/png", std::fs::read("chair.png")?);
//!     let created = service
//!         .create_single_image_task(image, GenerationOptions::for_kind(TaskKind::SingleImage))
//!         .await?;
//!     println!("submitted {}", created.task_id);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Artifact downloads into the local model directory
pub mod artifact;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Background task monitor
pub mod monitor;
/// In-memory task registry
pub mod registry;
/// Remote generation service client
pub mod remote;
/// Task service facade
pub mod service;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{ApiConfig, Config, MonitorConfig, RemoteConfig, StorageConfig};
pub use error::{ApiError, Error, ErrorDetail, FetchError, Result, TaskError, ToHttpStatus};
pub use registry::TaskRegistry;
pub use remote::{GenerationService, MeshyClient};
pub use service::TaskService;
pub use types::{
    CreateTaskResponse, DownloadLinks, Event, GenerationOptions, ImageUpload, RemoteTask, TaskId,
    TaskKind, TaskList, TaskRecord, TaskStatus, TaskStatusView, TaskSummary,
};

/// Serve the REST API until a termination signal arrives, then shut the
/// service down.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use meshgate::{Config, TaskService, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let service = TaskService::new(Config::default()).await?;
///     run_with_shutdown(service).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(service: TaskService) -> Result<()> {
    let service = std::sync::Arc::new(service);
    let config = service.config().clone();

    api::serve_until(service.clone(), config, wait_for_signal()).await?;
    service.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register Unix signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Received Ctrl+C signal");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
