//! API server implementation.
//!
//! Provides the health endpoint, application state, and router assembly.

use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::{OpenApi, ToSchema};

use relay_engine::intake::TaskService;

use crate::openapi::ApiDoc;
use crate::routes;

// ============================================================================
// Health Response
// ============================================================================

/// Liveness probe response.
#[derive(Debug, Serialize, ToSchema)]
#[cfg_attr(test, derive(serde::Deserialize))]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Server time.
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all request handlers.
pub struct AppState {
    /// Intake and query service over the stores and the queue.
    pub service: Arc<TaskService>,
    /// Retry budget applied when a request omits `maxRetries`.
    pub default_max_retries: u32,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service", &"<TaskService>")
            .field("default_max_retries", &self.default_max_retries)
            .finish()
    }
}

impl AppState {
    /// Creates new application state.
    #[must_use]
    pub fn new(service: Arc<TaskService>, default_max_retries: u32) -> Self {
        Self {
            service,
            default_max_retries,
        }
    }
}

/// Liveness probe.
///
/// GET /v1/health
#[utoipa::path(
    get,
    path = "/v1/health",
    tag = "health",
    responses((status = 200, description = "Service is alive", body = HealthResponse))
)]
pub(crate) async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP".to_string(),
        timestamp: Utc::now(),
    })
}

/// Serves the generated `OpenAPI` document.
///
/// GET /v1/openapi.json
async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Builds the application router with tracing middleware.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest(
            "/v1",
            routes::v1_routes()
                .route("/health", get(health_handler))
                .route("/openapi.json", get(openapi_handler)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Builds a CORS layer from configured origins.
///
/// Returns `None` when the list is empty (CORS disabled). `["*"]` allows
/// any origin; anything else is matched exactly, skipping values that are
/// not valid header material.
#[must_use]
pub fn cors_layer(allowed_origins: &[String]) -> Option<CorsLayer> {
    if allowed_origins.is_empty() {
        return None;
    }

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    if allowed_origins.iter().any(|o| o == "*") {
        return Some(layer.allow_origin(Any));
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    Some(layer.allow_origin(AllowOrigin::list(origins)))
}

/// Resolves when SIGINT (or ctrl-c) arrives, for graceful shutdown.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install shutdown signal handler");
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_reports_up() {
        let Json(body) = health_handler().await;
        assert_eq!(body.status, "UP");
    }

    #[test]
    fn cors_disabled_for_empty_origin_list() {
        assert!(cors_layer(&[]).is_none());
    }

    #[test]
    fn cors_enabled_for_wildcard_and_explicit_origins() {
        assert!(cors_layer(&["*".to_string()]).is_some());
        assert!(cors_layer(&["https://ops.example.com".to_string()]).is_some());
    }
}
