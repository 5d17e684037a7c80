//! Notification intake, status, logs, and manual retry routes.
//!
//! ## Routes
//!
//! - `POST /v1/notifications` - Submit a notification for async delivery
//! - `GET /v1/notifications/:task_id` - Status projection of a task
//! - `GET /v1/notifications/:task_id/logs` - Per-attempt delivery log
//! - `POST /v1/notifications/:task_id/retry` - Re-queue a failed task

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use relay_core::TaskId;
use relay_engine::intake::NewTask;
use relay_engine::log::AttemptLog;
use relay_engine::task::{HttpMethod, NotificationTask, TaskStatus};

use crate::error::{ApiError, ApiErrorBody};
use crate::server::AppState;

/// Longest accepted `sourceSystem` value.
const SOURCE_SYSTEM_MAX_CHARS: usize = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for `POST /v1/notifications`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    /// Originator tag, 1..100 chars.
    pub source_system: String,
    /// Absolute target URL, `http://` or `https://`.
    pub target_url: String,
    /// Outbound method; defaults to POST.
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "POST")]
    pub http_method: Option<HttpMethod>,
    /// Request headers to set on the outbound call.
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
    /// JSON payload forwarded verbatim. Required and non-null.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub body: Option<serde_json::Value>,
    /// Retry budget, 1..=10; the configured default applies when omitted.
    #[serde(default)]
    pub max_retries: Option<u32>,
}

impl CreateNotificationRequest {
    /// Validates the request and converts it into an engine `NewTask`.
    ///
    /// # Errors
    ///
    /// Returns a validation error carrying a field -> message map.
    pub fn into_new_task(self, default_max_retries: u32) -> Result<NewTask, ApiError> {
        let mut errors = BTreeMap::new();

        let source_chars = self.source_system.chars().count();
        if self.source_system.trim().is_empty() {
            errors.insert(
                "sourceSystem".to_string(),
                "must not be blank".to_string(),
            );
        } else if source_chars > SOURCE_SYSTEM_MAX_CHARS {
            errors.insert(
                "sourceSystem".to_string(),
                format!("must be at most {SOURCE_SYSTEM_MAX_CHARS} characters"),
            );
        }

        if !(self.target_url.starts_with("http://") || self.target_url.starts_with("https://")) {
            errors.insert(
                "targetUrl".to_string(),
                "must be an absolute http:// or https:// URL".to_string(),
            );
        }

        let body = match self.body {
            Some(body) if !body.is_null() => Some(body),
            _ => {
                errors.insert("body".to_string(), "is required".to_string());
                None
            }
        };

        if let Some(max_retries) = self.max_retries {
            if !(1..=10).contains(&max_retries) {
                errors.insert(
                    "maxRetries".to_string(),
                    "must be between 1 and 10".to_string(),
                );
            }
        }

        if !errors.is_empty() {
            return Err(ApiError::validation(errors));
        }

        Ok(NewTask {
            source_system: self.source_system,
            target_url: self.target_url,
            http_method: self.http_method.unwrap_or_default(),
            headers: self.headers.unwrap_or_default(),
            body: body.unwrap_or(serde_json::Value::Null),
            max_retries: self.max_retries.unwrap_or(default_max_retries),
        })
    }
}

/// Response body for accepted submissions and manual retries.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    /// The task's external handle.
    #[schema(value_type = String)]
    pub task_id: TaskId,
    /// Current status (PENDING on acceptance).
    #[schema(value_type = String, example = "PENDING")]
    pub status: TaskStatus,
    /// Human-readable note.
    pub message: String,
}

/// Status projection of a task.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusResponse {
    /// The task's external handle.
    #[schema(value_type = String)]
    pub task_id: TaskId,
    /// Originator tag.
    pub source_system: String,
    /// Target endpoint.
    pub target_url: String,
    /// Current delivery state.
    #[schema(value_type = String, example = "SUCCESS")]
    pub status: TaskStatus,
    /// Attempts completed so far.
    pub retry_count: u32,
    /// Retry budget.
    pub max_retries: u32,
    /// Last observed HTTP status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_http_status: Option<u16>,
    /// Last failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Next dispatch eligibility instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_retry_at: Option<DateTime<Utc>>,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When the task reached a terminal state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<NotificationTask> for TaskStatusResponse {
    fn from(task: NotificationTask) -> Self {
        Self {
            task_id: task.task_id,
            source_system: task.source_system,
            target_url: task.target_url,
            status: task.status,
            retry_count: task.retry_count,
            max_retries: task.max_retries,
            last_http_status: task.last_http_status,
            last_error: task.last_error,
            next_retry_at: task.next_retry_at,
            created_at: task.created_at,
            completed_at: task.completed_at,
        }
    }
}

/// One row of the per-attempt delivery log.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttemptLogResponse {
    /// The task this attempt belongs to.
    #[schema(value_type = String)]
    pub task_id: TaskId,
    /// 1-based attempt number.
    pub attempt_number: u32,
    /// HTTP status observed, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    /// Truncated response body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
    /// Truncated failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Attempt duration in milliseconds.
    pub latency_ms: u64,
    /// Whether the attempt delivered.
    pub success: bool,
    /// When the attempt was logged.
    pub created_at: DateTime<Utc>,
}

impl From<AttemptLog> for AttemptLogResponse {
    fn from(log: AttemptLog) -> Self {
        Self {
            task_id: log.task_id,
            attempt_number: log.attempt_number,
            http_status: log.http_status,
            response_body: log.response_body,
            error_message: log.error_message,
            latency_ms: log.latency_ms,
            success: log.success,
            created_at: log.created_at,
        }
    }
}

// ============================================================================
// Routes
// ============================================================================

/// Notification routes under `/v1`.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notifications", post(create_notification))
        .route("/notifications/:task_id", get(get_notification_status))
        .route("/notifications/:task_id/logs", get(get_notification_logs))
        .route("/notifications/:task_id/retry", post(retry_notification))
}

fn parse_task_id(raw: &str) -> Result<TaskId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::not_found(format!("task not found: {raw}")))
}

/// Submit a notification request.
///
/// POST /v1/notifications
#[utoipa::path(
    post,
    path = "/v1/notifications",
    tag = "notifications",
    request_body = CreateNotificationRequest,
    responses(
        (status = 202, description = "Accepted for asynchronous delivery", body = NotificationResponse),
        (status = 400, description = "Validation failure", body = ApiErrorBody),
        (status = 500, description = "Internal error", body = ApiErrorBody),
    )
)]
pub(crate) async fn create_notification(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateNotificationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) =
        payload.map_err(|e| ApiError::bad_request(format!("invalid request body: {e}")))?;

    tracing::info!(
        source_system = %request.source_system,
        target_url = %request.target_url,
        "notification received"
    );

    let new_task = request.into_new_task(state.default_max_retries)?;
    let task = state.service.create_task(new_task).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(NotificationResponse {
            task_id: task.task_id,
            status: task.status,
            message: "notification accepted for delivery".to_string(),
        }),
    ))
}

/// Query a task's status.
///
/// GET /v1/notifications/:task_id
#[utoipa::path(
    get,
    path = "/v1/notifications/{task_id}",
    tag = "notifications",
    params(("task_id" = String, Path, description = "Task id")),
    responses(
        (status = 200, description = "Status projection", body = TaskStatusResponse),
        (status = 404, description = "Unknown task", body = ApiErrorBody),
    )
)]
pub(crate) async fn get_notification_status(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskStatusResponse>, ApiError> {
    let task_id = parse_task_id(&task_id)?;
    let task = state
        .service
        .find_task(task_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("task not found: {task_id}")))?;
    Ok(Json(task.into()))
}

/// Query a task's delivery attempts.
///
/// GET /v1/notifications/:task_id/logs
#[utoipa::path(
    get,
    path = "/v1/notifications/{task_id}/logs",
    tag = "notifications",
    params(("task_id" = String, Path, description = "Task id")),
    responses(
        (status = 200, description = "Attempt list, ascending", body = [AttemptLogResponse]),
        (status = 404, description = "No attempts logged for this id", body = ApiErrorBody),
    )
)]
pub(crate) async fn get_notification_logs(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<Vec<AttemptLogResponse>>, ApiError> {
    let task_id = parse_task_id(&task_id)?;
    let logs = state.service.task_logs(task_id).await?;
    if logs.is_empty() {
        return Err(ApiError::not_found(format!(
            "no delivery attempts logged for task {task_id}"
        )));
    }
    Ok(Json(logs.into_iter().map(Into::into).collect()))
}

/// Re-queue a terminally failed task.
///
/// POST /v1/notifications/:task_id/retry
#[utoipa::path(
    post,
    path = "/v1/notifications/{task_id}/retry",
    tag = "notifications",
    params(("task_id" = String, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task re-queued", body = NotificationResponse),
        (status = 400, description = "Task is not FAILED", body = ApiErrorBody),
        (status = 404, description = "Unknown task", body = ApiErrorBody),
    )
)]
pub(crate) async fn retry_notification(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let task_id = parse_task_id(&task_id)?;
    let task = state.service.retry_task(task_id).await?;
    Ok(Json(NotificationResponse {
        task_id: task.task_id,
        status: task.status,
        message: "task re-queued for delivery".to_string(),
    }))
}
