//! Observability infrastructure for Relay.
//!
//! Structured logging with consistent spans. This module provides the
//! initialization helper and span constructors used across all Relay
//! components.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `relay_engine=debug`)
///
/// # Example
///
/// ```rust
/// use relay_core::observability::{init_logging, LogFormat};
///
/// init_logging(LogFormat::Pretty);
/// ```
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Creates a span for delivery-pipeline operations with standard fields.
///
/// # Example
///
/// ```rust
/// use relay_core::observability::delivery_span;
///
/// let span = delivery_span("dispatch", "7cb7d1e2-0000-4000-8000-000000000000");
/// let _guard = span.enter();
/// // ... perform the attempt
/// ```
#[must_use]
pub fn delivery_span(operation: &str, task_id: &str) -> Span {
    tracing::info_span!("delivery", op = operation, task_id = task_id)
}

/// Creates a span for intake operations.
#[must_use]
pub fn intake_span(operation: &str, source_system: &str) -> Span {
    tracing::info_span!("intake", op = operation, source = source_system)
}
