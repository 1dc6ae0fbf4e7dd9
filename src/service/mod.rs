//! Task service facade
//!
//! `TaskService` owns the components of the proxy and is what the REST API
//! and embedding applications talk to:
//! - [`create`] - Input validation, remote submission and monitor spawning
//! - [`query`] - Task listing, status, download links and deletion
//!
//! Shutdown stops accepting new tasks and cancels every running monitor.

mod create;
mod query;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use create::{ACCEPTED_CONTENT_TYPES, MAX_MULTI_IMAGES, validate_images};

use crate::artifact::ArtifactFetcher;
use crate::config::Config;
use crate::error::Result;
use crate::monitor::TaskMonitor;
use crate::registry::TaskRegistry;
use crate::remote::{GenerationService, MeshyClient};
use crate::types::Event;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Main service instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct TaskService {
    /// Task registry, the single source of truth for task state
    pub(crate) registry: TaskRegistry,
    /// Remote generation service
    pub(crate) remote: Arc<dyn GenerationService>,
    /// Monitor factory shared by every spawned loop
    pub(crate) monitor: TaskMonitor,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Configuration
    pub(crate) config: Arc<Config>,
    /// Flag to indicate whether new tasks are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Cancels every running monitor on shutdown
    pub(crate) cancel: CancellationToken,
}

impl TaskService {
    /// Create a service talking to the configured Meshy endpoint
    ///
    /// Validates the configuration and creates the model directory if it
    /// does not exist.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        if config.remote.api_key.is_empty() {
            tracing::warn!("No remote API key configured; generation requests will be rejected");
        }
        let remote: Arc<dyn GenerationService> = Arc::new(MeshyClient::new(&config.remote)?);
        Self::with_remote(config, remote).await
    }

    /// Create a service around a custom [`GenerationService`] implementation
    pub async fn with_remote(config: Config, remote: Arc<dyn GenerationService>) -> Result<Self> {
        let fetcher = ArtifactFetcher::new(&config.storage)?;
        fetcher.ensure_dir().await?;

        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let registry = TaskRegistry::new();
        let cancel = CancellationToken::new();

        let monitor = TaskMonitor::new(
            registry.clone(),
            remote.clone(),
            Arc::new(fetcher),
            config.monitor.clone(),
            event_tx.clone(),
            cancel.clone(),
        );

        tracing::info!(
            models_dir = %config.storage.models_dir.display(),
            remote = %config.remote_base(),
            "Task service initialized"
        );

        Ok(Self {
            registry,
            remote,
            monitor,
            event_tx,
            config: Arc::new(config),
            accepting_new: Arc::new(AtomicBool::new(true)),
            cancel,
        })
    }

    /// Subscribe to task lifecycle events
    ///
    /// Slow receivers lag and miss events rather than blocking monitors.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The task registry backing this service
    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Current configuration
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Whether new tasks are accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }

    /// Stop accepting tasks and cancel all running monitors
    ///
    /// Records are left as they are; in-flight remote tasks are orphaned.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.accepting_new.store(false, Ordering::SeqCst);
        self.cancel.cancel();

        let remaining = self.registry.len().await;
        tracing::info!(tasks = remaining, "Cancelled task monitors");

        self.emit_event(Event::Shutdown);
        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Spawn the REST API server in a background task
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let service = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(service, config).await })
    }

    pub(crate) fn emit_event(&self, event: Event) {
        // send() returns Err if there are no receivers, which is fine - we just drop the event
        self.event_tx.send(event).ok();
    }
}
