//! HTTP Error Handling
//!
//! 业务错误统一以 HTTP 200 + errno 返回

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::application::ApplicationError;

/// 统一错误响应格式
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errno: i32,
    pub error: String,
    pub data: Option<()>,
}

impl ErrorResponse {
    pub fn new(errno: i32, error: impl Into<String>) -> Self {
        Self {
            errno,
            error: error.into(),
            data: None,
        }
    }
}

/// 错误码定义
pub mod errno {
    pub const BAD_REQUEST: i32 = 400;
    pub const NOT_FOUND: i32 = 404;
    pub const CONFLICT: i32 = 409;
    pub const INTERNAL_ERROR: i32 = 500;
    pub const SERVICE_UNAVAILABLE: i32 = 503;
}

/// API 错误
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
    Conflict(String),
    ServiceUnavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, response) = match &self {
            ApiError::NotFound(msg) => {
                tracing::warn!(errno = errno::NOT_FOUND, error = %msg, "Resource not found");
                (
                    StatusCode::OK,
                    ErrorResponse::new(errno::NOT_FOUND, msg.clone()),
                )
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(errno = errno::BAD_REQUEST, error = %msg, "Bad request");
                (
                    StatusCode::OK,
                    ErrorResponse::new(errno::BAD_REQUEST, msg.clone()),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(errno = errno::INTERNAL_ERROR, error = %msg, "Internal server error");
                (
                    StatusCode::OK,
                    ErrorResponse::new(errno::INTERNAL_ERROR, msg.clone()),
                )
            }
            ApiError::Conflict(msg) => {
                tracing::warn!(errno = errno::CONFLICT, error = %msg, "Resource conflict");
                (
                    StatusCode::OK,
                    ErrorResponse::new(errno::CONFLICT, msg.clone()),
                )
            }
            ApiError::ServiceUnavailable(msg) => {
                tracing::error!(errno = errno::SERVICE_UNAVAILABLE, error = %msg, "Service unavailable");
                (
                    StatusCode::OK,
                    ErrorResponse::new(errno::SERVICE_UNAVAILABLE, msg.clone()),
                )
            }
        };

        (status, Json(response)).into_response()
    }
}

impl From<ApplicationError> for ApiError {
    fn from(e: ApplicationError) -> Self {
        match e {
            ApplicationError::NotFound { resource_type, id } => {
                ApiError::NotFound(format!("{} not found: {}", resource_type, id))
            }
            ApplicationError::ValidationError(msg) => ApiError::BadRequest(msg),
            ApplicationError::BusinessRuleViolation(msg) => ApiError::BadRequest(msg),
            ApplicationError::InvalidState(msg) => ApiError::BadRequest(msg),
            ApplicationError::Busy(msg) => ApiError::Conflict(msg),
            ApplicationError::ExternalServiceError(msg) => ApiError::ServiceUnavailable(msg),
            ApplicationError::InternalError(msg) => ApiError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(error: ApiError) -> serde_json::Value {
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_busy_maps_to_conflict() {
        let error = ApiError::from(ApplicationError::busy("Submission in progress"));
        let body = body_json(error).await;
        assert_eq!(body["errno"], errno::CONFLICT);
        assert_eq!(body["error"], "Submission in progress");
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn test_not_found_message() {
        let error = ApiError::from(ApplicationError::not_found("Flow", "abc"));
        let body = body_json(error).await;
        assert_eq!(body["errno"], errno::NOT_FOUND);
        assert_eq!(body["error"], "Flow not found: abc");
    }

    #[tokio::test]
    async fn test_external_failure_is_service_unavailable() {
        let error = ApiError::from(ApplicationError::ExternalServiceError(
            "API endpoint not found".to_string(),
        ));
        let body = body_json(error).await;
        assert_eq!(body["errno"], errno::SERVICE_UNAVAILABLE);
    }
}
