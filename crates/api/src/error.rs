use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::services::WebhookError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg)
            }
        };

        let body = ErrorBody {
            error: error_code,
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::Validation(msg) => ApiError::Validation(msg),
            WebhookError::NotFound(msg) => ApiError::NotFound(msg),
            WebhookError::Storage(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        WebhookError::from(errors).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persistence::StoreError;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_response() {
        let response = ApiError::NotFound("Webhook abc not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "not_found");
        assert_eq!(body["message"], "Webhook abc not found");
    }

    #[tokio::test]
    async fn test_validation_response() {
        let response = ApiError::Validation("url: Invalid URL format".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response = ApiError::Internal("connection refused".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], "An internal error occurred");
    }

    #[test]
    fn test_service_unavailable_status() {
        let response = ApiError::ServiceUnavailable("db down".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_from_webhook_error() {
        assert!(matches!(
            ApiError::from(WebhookError::Validation("x".into())),
            ApiError::Validation(_)
        ));
        assert!(matches!(
            ApiError::from(WebhookError::NotFound("x".into())),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(WebhookError::Storage(StoreError::Corrupt("x".into()))),
            ApiError::Internal(_)
        ));
    }
}
