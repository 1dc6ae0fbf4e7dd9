//! Shared test helpers for creating TaskService instances in tests.

use crate::config::Config;
use crate::service::TaskService;
use serde_json::json;
use std::time::Duration;
use tempfile::{TempDir, tempdir};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Config pointing at a mock remote service with millisecond poll timing
pub(crate) fn test_config(remote_uri: &str, temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.remote.base_url = format!("{}/openapi/v1", remote_uri);
    config.remote.api_key = "test-key".to_string();
    config.remote.request_timeout = Duration::from_secs(5);
    config.monitor.single_image_max_attempts = 50;
    config.monitor.multi_image_max_attempts = 50;
    config.monitor.poll_interval = Duration::from_millis(5);
    config.monitor.error_backoff = Duration::from_millis(5);
    config.storage.models_dir = temp_dir.path().join("models");
    config
}

/// Helper to create a test TaskService talking to `server`.
/// Returns the service and the tempdir (which must be kept alive).
pub(crate) async fn create_test_service(server: &MockServer) -> (TaskService, TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(&server.uri(), &temp_dir);
    let service = TaskService::new(config).await.unwrap();
    (service, temp_dir)
}

/// Accept creation requests on both endpoints, answering with `task_id`
pub(crate) async fn mount_create(server: &MockServer, task_id: &str) {
    Mock::given(method("POST"))
        .and(path_regex(r"^/openapi/v1/(multi-)?image-to-3d$"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"result": task_id})))
        .mount(server)
        .await;
}

/// Report every polled task as still running
pub(crate) async fn mount_poll_in_progress(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/openapi/v1/(multi-)?image-to-3d/.+$"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "IN_PROGRESS", "progress": 10})),
        )
        .mount(server)
        .await;
}

/// Serve a finished task whose model lives on the same mock server
pub(crate) async fn mount_succeeded(server: &MockServer, endpoint: &str, task_id: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/openapi/v1/{}/{}", endpoint, task_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": task_id,
            "status": "SUCCEEDED",
            "progress": 100,
            "model_urls": {"glb": format!("{}/cdn/{}.glb", server.uri(), task_id)},
            "thumbnail_url": format!("{}/cdn/{}.png", server.uri(), task_id),
            "created_at": 1_700_000_000_000i64,
            "finished_at": 1_700_000_060_000i64
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/cdn/{}.glb", task_id)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"glTF".to_vec()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/cdn/{}.png", task_id)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
        .mount(server)
        .await;
}
