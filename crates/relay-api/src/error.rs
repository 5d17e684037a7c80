//! API error types and HTTP response mapping.

use std::collections::BTreeMap;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use relay_engine::Error as EngineError;

/// API result type.
pub type ApiResult<T> = Result<T, ApiError>;

/// Standard JSON error response body.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message (safe for clients).
    pub message: String,
    /// Per-field validation messages, present on validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}

/// HTTP API error with stable machine-readable code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    errors: Option<BTreeMap<String, String>>,
}

impl ApiError {
    /// Returns an error response for invalid input.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// Returns a 400 carrying a field -> message map.
    #[must_use]
    pub fn validation(errors: BTreeMap<String, String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "VALIDATION_ERROR",
            message: "request validation failed".to_string(),
            errors: Some(errors),
        }
    }

    /// Returns an error response for missing resources.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// Returns an error response for conflicting writes.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "CONFLICT", message)
    }

    /// Returns an internal error response.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", message)
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// Returns the human-readable error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            errors: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ApiErrorBody {
                code: self.code.to_string(),
                message: self.message,
                errors: self.errors,
            }),
        )
            .into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(value: EngineError) -> Self {
        match value {
            EngineError::TaskNotFound { task_id } => {
                Self::not_found(format!("task not found: {task_id}"))
            }
            EngineError::RetryNotAllowed { task_id, status } => Self::bad_request(format!(
                "task {task_id} is {status}, only FAILED tasks can be retried"
            )),
            EngineError::DuplicateTask { task_id } => {
                Self::conflict(format!("task already exists: {task_id}"))
            }
            EngineError::InvalidStateTransition { from, to } => {
                Self::conflict(format!("invalid state transition: {from} -> {to}"))
            }
            EngineError::Core(relay_core::Error::Validation { message }) => {
                Self::bad_request(message)
            }
            EngineError::Core(relay_core::Error::InvalidId { message }) => {
                Self::bad_request(message)
            }
            EngineError::Storage { message, .. }
            | EngineError::Serialization { message }
            | EngineError::Configuration { message } => Self::internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::TaskId;
    use relay_engine::TaskStatus;

    #[test]
    fn validation_error_carries_field_map() {
        let mut fields = BTreeMap::new();
        fields.insert("targetUrl".to_string(), "must start with http(s)".to_string());
        let error = ApiError::validation(fields);

        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.code(), "VALIDATION_ERROR");

        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn engine_not_found_maps_to_404() {
        let engine_err = EngineError::TaskNotFound {
            task_id: TaskId::generate(),
        };
        let api_err = ApiError::from(engine_err);
        assert_eq!(api_err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn engine_retry_not_allowed_maps_to_400() {
        let engine_err = EngineError::RetryNotAllowed {
            task_id: TaskId::generate(),
            status: TaskStatus::Pending,
        };
        let api_err = ApiError::from(engine_err);
        assert_eq!(api_err.status(), StatusCode::BAD_REQUEST);
        assert!(api_err.message().contains("PENDING"));
    }

    #[test]
    fn engine_storage_maps_to_500() {
        let api_err = ApiError::from(EngineError::storage("store down"));
        assert_eq!(api_err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
