//! Mock remote service, image fixtures and test configuration

use meshgate::{Config, ImageUpload, TaskService};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// PNG signature plus an IHDR chunk header; enough to pass as an image upload
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
];

/// JPEG start-of-image marker
pub const TINY_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0];

/// A PNG upload
pub fn png_upload() -> ImageUpload {
    ImageUpload::new("image/png", TINY_PNG.to_vec())
}

/// A JPEG upload
pub fn jpeg_upload() -> ImageUpload {
    ImageUpload::new("image/jpeg", TINY_JPEG.to_vec())
}

/// Configuration pointing at `remote` with millisecond poll timing
pub fn test_config(remote: &MockServer, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.remote.base_url = format!("{}/openapi/v1", remote.uri());
    config.remote.api_key = "integration-key".to_string();
    config.remote.request_timeout = Duration::from_secs(5);
    config.monitor.single_image_max_attempts = 40;
    config.monitor.multi_image_max_attempts = 40;
    config.monitor.poll_interval = Duration::from_millis(5);
    config.monitor.error_backoff = Duration::from_millis(5);
    config.storage.models_dir = dir.path().join("models");
    config
}

/// Build a service against `remote`; keep the returned TempDir alive
pub async fn create_service(remote: &MockServer) -> (TaskService, TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let service = TaskService::new(test_config(remote, &dir))
        .await
        .expect("create service");
    (service, dir)
}

/// Remote task that reports progress twice, then succeeds with a model and thumbnail
pub async fn mount_remote_success(remote: &MockServer, endpoint: &str, task_id: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/openapi/v1/{}", endpoint)))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"result": task_id})))
        .up_to_n_times(1)
        .mount(remote)
        .await;

    let status_path = format!("/openapi/v1/{}/{}", endpoint, task_id);
    for progress in [15, 40] {
        Mock::given(method("GET"))
            .and(path(status_path.clone()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": task_id,
                "status": "IN_PROGRESS",
                "progress": progress
            })))
            .up_to_n_times(1)
            .mount(remote)
            .await;
    }
    Mock::given(method("GET"))
        .and(path(status_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": task_id,
            "status": "SUCCEEDED",
            "progress": 100,
            "model_urls": {"glb": format!("{}/assets/{}.glb", remote.uri(), task_id)},
            "thumbnail_url": format!("{}/assets/{}.png", remote.uri(), task_id),
            "texture_urls": [{"base_color": format!("{}/assets/{}_base.png", remote.uri(), task_id)}]
        })))
        .mount(remote)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/assets/{}.glb", task_id)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"glTF-model".to_vec()))
        .mount(remote)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/assets/{}.png", task_id)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(TINY_PNG.to_vec()))
        .mount(remote)
        .await;
}

/// Remote task that fails with `message`
pub async fn mount_remote_failure(remote: &MockServer, endpoint: &str, task_id: &str, message: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/openapi/v1/{}", endpoint)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": task_id})))
        .up_to_n_times(1)
        .mount(remote)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/openapi/v1/{}/{}", endpoint, task_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": task_id,
            "status": "FAILED",
            "progress": 0,
            "task_error": {"message": message}
        })))
        .mount(remote)
        .await;
}
