//! meshgate server entry point.
//!
//! Startup order:
//! 1. Initialise tracing (`RUST_LOG`, JSON output when `MESHGATE_LOG_JSON` is set).
//! 2. Load configuration from `MESHGATE_CONFIG` (JSON) or defaults, then
//!    apply environment overrides.
//! 3. Build the task service and serve the API until SIGINT/SIGTERM.

use meshgate::{Config, TaskService};
use std::path::PathBuf;
use tracing::info;

/// Path of an optional JSON configuration file
const CONFIG_ENV: &str = "MESHGATE_CONFIG";
/// Any non-empty value switches log output to JSON
const LOG_JSON_ENV: &str = "MESHGATE_LOG_JSON";

#[tokio::main]
async fn main() -> meshgate::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    let log_json = std::env::var(LOG_JSON_ENV).is_ok_and(|v| !v.is_empty() && v != "0");
    if log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "meshgate starting");

    let mut config = match std::env::var_os(CONFIG_ENV) {
        Some(path) => {
            let path = PathBuf::from(path);
            info!(path = %path.display(), "Loading configuration file");
            Config::from_file(&path).await?
        }
        None => Config::default(),
    };
    config.apply_env_overrides();

    let service = TaskService::new(config).await?;
    meshgate::run_with_shutdown(service).await?;

    info!("meshgate stopped");
    Ok(())
}
