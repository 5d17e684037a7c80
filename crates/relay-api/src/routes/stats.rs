//! Observability routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{ApiError, ApiErrorBody};
use crate::server::AppState;

/// Per-status task counts, keyed the way statuses appear on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct TaskStats {
    /// Tasks waiting to be dispatched.
    #[serde(rename = "PENDING")]
    pub pending: usize,
    /// Tasks claimed by a worker right now.
    #[serde(rename = "PROCESSING")]
    pub processing: usize,
    /// Tasks delivered successfully.
    #[serde(rename = "SUCCESS")]
    pub success: usize,
    /// Tasks terminally failed.
    #[serde(rename = "FAILED")]
    pub failed: usize,
}

/// Response body for `GET /v1/stats`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// Ids currently sitting in the queue.
    pub queue_size: usize,
    /// Per-status task counts.
    pub task_stats: TaskStats,
    /// Server time of the snapshot.
    pub timestamp: DateTime<Utc>,
}

/// Stats routes under `/v1`.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/stats", get(get_stats))
}

/// Queue depth and per-status task counts.
///
/// GET /v1/stats
#[utoipa::path(
    get,
    path = "/v1/stats",
    tag = "stats",
    responses(
        (status = 200, description = "Current relay load", body = StatsResponse),
        (status = 500, description = "Internal error", body = ApiErrorBody),
    )
)]
pub(crate) async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.service.stats().await?;
    Ok(Json(StatsResponse {
        queue_size: stats.queue_size,
        task_stats: TaskStats {
            pending: stats.pending,
            processing: stats.processing,
            success: stats.success,
            failed: stats.failed,
        },
        timestamp: Utc::now(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_stats_serialize_with_status_keys() {
        let stats = TaskStats {
            pending: 1,
            processing: 2,
            success: 3,
            failed: 4,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["PENDING"], 1);
        assert_eq!(json["PROCESSING"], 2);
        assert_eq!(json["SUCCESS"], 3);
        assert_eq!(json["FAILED"], 4);
    }
}
