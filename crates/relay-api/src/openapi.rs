//! `OpenAPI` specification generation for `relay-api`.
//!
//! The generated document is served at `/v1/openapi.json` by deployments
//! that want client generation; it also doubles as the API contract for
//! integrators.

use utoipa::OpenApi;

/// `OpenAPI` documentation for the Relay REST API (`/v1/*`).
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Relay API",
        version = "0.1.0",
        description = "Reliable HTTP notification relay"
    ),
    paths(
        crate::routes::notifications::create_notification,
        crate::routes::notifications::get_notification_status,
        crate::routes::notifications::get_notification_logs,
        crate::routes::notifications::retry_notification,
        crate::routes::stats::get_stats,
        crate::server::health_handler,
    ),
    components(schemas(
        crate::error::ApiErrorBody,
        crate::routes::notifications::CreateNotificationRequest,
        crate::routes::notifications::NotificationResponse,
        crate::routes::notifications::TaskStatusResponse,
        crate::routes::notifications::AttemptLogResponse,
        crate::routes::stats::StatsResponse,
        crate::routes::stats::TaskStats,
        crate::server::HealthResponse,
    )),
    tags(
        (name = "notifications", description = "Submit and manage outbound notifications"),
        (name = "stats", description = "Relay load introspection"),
        (name = "health", description = "Probes"),
    )
)]
pub struct ApiDoc;
