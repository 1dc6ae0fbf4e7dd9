use super::*;
use crate::service::test_helpers::{create_test_service, mount_create, mount_poll_in_progress};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::time::Duration;
use tower::ServiceExt;
use wiremock::MockServer;


/// Helper to create a test TaskService instance wrapped in Arc
async fn create_test_app(server: &MockServer) -> (Arc<TaskService>, Arc<Config>, tempfile::TempDir) {
    let (service, temp_dir) = create_test_service(server).await;
    let config = service.config().clone();
    (Arc::new(service), config, temp_dir)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

const BOUNDARY: &str = "meshgate-test-boundary";

/// Build a multipart/form-data body from (field, content type, bytes) parts
fn multipart_body<B: AsRef<[u8]>>(parts: &[(&str, &str, B)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (i, (field, content_type, bytes)) in parts.iter().enumerate() {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"image{i}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(bytes.as_ref());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request<B: AsRef<[u8]>>(uri: &str, parts: &[(&str, &str, B)]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let server = MockServer::start().await;
    let (service, config, _temp_dir) = create_test_app(&server).await;

    let mut config = (*config).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap(); // Port 0 = OS assigns a free port
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let service = service.clone();
        let config = config.clone();
        async move { start_api_server(service, config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished());
    api_handle.abort();
}

#[tokio::test]
async fn test_serve_until_stops_on_signal() {
    let server = MockServer::start().await;
    let (service, config, _temp_dir) = create_test_app(&server).await;

    let mut config = (*config).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(serve_until(service, Arc::new(config), async move {
        rx.await.ok();
    }));

    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_root_and_health() {
    let server = MockServer::start().await;
    let (service, config, _temp_dir) = create_test_app(&server).await;
    let app = create_router(service, config);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["message"].is_string());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["accepting_tasks"], true);
    assert_eq!(body["tasks"], 0);
}

#[tokio::test]
async fn test_cors_allows_frontend_origin() {
    let server = MockServer::start().await;
    let (service, config, _temp_dir) = create_test_app(&server).await;
    let app = create_router(service, config);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "http://localhost:3000"
    );
}

#[tokio::test]
async fn test_cors_rejects_unknown_origin() {
    let server = MockServer::start().await;
    let (service, config, _temp_dir) = create_test_app(&server).await;
    let app = create_router(service, config);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://evil.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        response
            .headers()
            .get("access-control-allow-origin")
            .is_none()
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let server = MockServer::start().await;
    let (service, config, _temp_dir) = create_test_app(&server).await;

    let mut config = (*config).clone();
    config.server.api.cors_enabled = false;
    let app = create_router(service, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        response
            .headers()
            .get("access-control-allow-origin")
            .is_none()
    );
}

#[tokio::test]
async fn test_openapi_endpoint() {
    let server = MockServer::start().await;
    let (service, config, _temp_dir) = create_test_app(&server).await;
    let app = create_router(service, config);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["info"]["title"], "meshgate REST API");
}

#[tokio::test]
async fn test_swagger_ui_toggle() {
    let server = MockServer::start().await;
    let (service, config, _temp_dir) = create_test_app(&server).await;

    let app = create_router(service.clone(), config.clone());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut disabled = (*config).clone();
    disabled.server.api.swagger_ui = false;
    let app = create_router(service, Arc::new(disabled));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_event_stream_content_type() {
    let server = MockServer::start().await;
    let (service, config, _temp_dir) = create_test_app(&server).await;
    let app = create_router(service, config);

    let response = app
        .oneshot(Request::builder().uri("/events").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );
}

#[tokio::test]
async fn test_models_directory_is_served() {
    let server = MockServer::start().await;
    let (service, config, _temp_dir) = create_test_app(&server).await;
    tokio::fs::write(config.storage.models_dir.join("abc.glb"), b"glTF")
        .await
        .unwrap();
    let app = create_router(service, config);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/models/abc.glb")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"glTF");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/models/missing.glb")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_shutdown_turns_creation_into_503() {
    let server = MockServer::start().await;
    mount_create(&server, "late").await;
    mount_poll_in_progress(&server).await;
    let (service, config, _temp_dir) = create_test_app(&server).await;
    service.shutdown().await.unwrap();
    let app = create_router(service, config);

    let response = app
        .oneshot(multipart_request(
            "/api/meshy/create-task",
            &[("file", "image/png", b"png")],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["error"]["code"], "shutting_down");
}
