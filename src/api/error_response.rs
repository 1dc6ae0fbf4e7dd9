//! HTTP error response handling for the API
//!
//! Converts domain errors into HTTP responses with appropriate status codes
//! and JSON error bodies.

use crate::error::{ApiError, Error, ToHttpStatus};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Implement IntoResponse for Error to automatically convert errors to HTTP responses
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status_code.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "Request failed");
        }

        let api_error: ApiError = self.into();

        (status_code, Json(api_error)).into_response()
    }
}

/// Implement IntoResponse for ApiError for explicit error responses
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Errors with a known status go through Error::into_response
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn not_found_renders_404_with_details() {
        let response = Error::Task(TaskError::NotFound { id: "abc".into() }).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "task_not_found");
        assert_eq!(body["error"]["details"]["task_id"], "abc");
    }

    #[tokio::test]
    async fn not_ready_renders_412() {
        let response = Error::Task(TaskError::NotReady {
            id: "abc".into(),
            status: "IN_PROGRESS".into(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);

        let body = body_json(response).await;
        assert_eq!(body["error"]["details"]["status"], "IN_PROGRESS");
    }

    #[tokio::test]
    async fn remote_failure_renders_502() {
        let response = Error::RemoteStatus {
            status: 401,
            body: "unauthorized".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "remote_error");
        assert_eq!(body["error"]["details"]["remote_status"], 401);
    }

    #[tokio::test]
    async fn validation_renders_400_without_details() {
        let response = Error::Validation("Supported formats: JPG, JPEG, PNG".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "validation_error");
        assert!(body["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn bare_api_error_is_500() {
        let response = ApiError::internal("boom").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
