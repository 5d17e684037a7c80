//! HTTP route handlers.

pub mod notifications;
pub mod stats;

use std::sync::Arc;

use axum::Router;

use crate::server::AppState;

/// `/v1` routes.
pub fn v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(notifications::routes())
        .merge(stats::routes())
}
