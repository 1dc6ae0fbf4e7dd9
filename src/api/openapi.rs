//! OpenAPI documentation and schema generation
//!
//! Defines the OpenAPI document for the meshgate REST API using utoipa for
//! compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the meshgate REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "meshgate REST API",
        version = "0.1.0",
        description = "Image-to-3D generation proxy: submit images, follow task progress and fetch the generated models",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server")
    ),
    paths(
        // Tasks
        crate::api::routes::create_task,
        crate::api::routes::create_multi_image_task,
        crate::api::routes::get_task_status,
        crate::api::routes::download_model,
        crate::api::routes::list_tasks,
        crate::api::routes::delete_task,

        // System
        crate::api::routes::root,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(
        schemas(
            // Task types
            crate::types::TaskId,
            crate::types::TaskKind,
            crate::types::TaskStatus,
            crate::types::TaskSummary,
            crate::types::TaskList,
            crate::types::TaskStatusView,
            crate::types::DownloadLinks,
            crate::types::CreateTaskResponse,
            crate::types::MessageResponse,
            crate::types::GenerationOptions,
            crate::types::Event,

            // Request types
            crate::api::routes::GenerationQuery,

            // Error types
            crate::error::ApiError,
            crate::error::ErrorDetail,
        )
    ),
    tags(
        (name = "tasks", description = "Image-to-3D task creation and tracking"),
        (name = "system", description = "Health, events and API documentation")
    )
)]
pub struct ApiDoc;
