//! REST API server module
//!
//! Exposes the task service to the frontend: task creation from uploaded
//! images, status polling, model download links, the event stream and the
//! stored artifacts themselves.

use crate::{Config, Result, TaskService};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{delete, get, post},
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Prefix of the task endpoints
pub const TASK_API_PREFIX: &str = "/api/meshy";

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Tasks (under `/api/meshy`)
/// - `POST /create-task` - Create a task from one image (multipart field `file`)
/// - `POST /create-multi-image-task` - Create a task from 1-4 images (field `files`)
/// - `GET /task-status/:task_id` - Task status
/// - `GET /download-model/:task_id` - Local model links
/// - `GET /tasks` - List all tasks
/// - `DELETE /task/:task_id` - Forget a task
///
/// ## System
/// - `GET /` - Welcome message
/// - `GET /health` - Health check
/// - `GET /events` - Server-sent events stream
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
///
/// ## Artifacts
/// - `GET /models/*` - Stored models and thumbnails
pub fn create_router(service: Arc<TaskService>, config: Arc<Config>) -> Router {
    let state = AppState::new(service, config.clone());

    let tasks = Router::new()
        .route("/create-task", post(routes::create_task))
        .route(
            "/create-multi-image-task",
            post(routes::create_multi_image_task),
        )
        .route("/task-status/:task_id", get(routes::get_task_status))
        .route("/download-model/:task_id", get(routes::download_model))
        .route("/tasks", get(routes::list_tasks))
        .route("/task/:task_id", delete(routes::delete_task));

    let router = Router::new()
        .nest(TASK_API_PREFIX, tasks)
        .route("/", get(routes::root))
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream))
        .nest_service(
            &config.storage.url_prefix,
            ServeDir::new(&config.storage.models_dir),
        );

    // Swagger UI serves its own copy of the document so it does not clash
    // with the /openapi.json route above
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.server.api.max_upload_bytes))
        .layer(TraceLayer::new_for_http());

    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` or an empty list allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the server fails; see [`serve_until`] for a graceful variant.
///
/// # Example
///
/// ```no_run
/// use meshgate::{Config, TaskService};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let service = Arc::new(TaskService::new((*config).clone()).await?);
///
/// meshgate::api::start_api_server(service, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(service: Arc<TaskService>, config: Arc<Config>) -> Result<()> {
    serve_until(service, config, std::future::pending()).await
}

/// Start the API server and stop accepting connections once `shutdown` resolves
pub async fn serve_until<F>(service: Arc<TaskService>, config: Arc<Config>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind_address = config.server.api.bind_address;

    tracing::info!(
        address = %bind_address,
        "Starting API server"
    );

    let app = create_router(service, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %bind_address,
        "API server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
