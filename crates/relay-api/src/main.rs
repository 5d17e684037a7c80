//! `relay-api` binary entrypoint.
//!
//! Loads configuration from environment variables, starts the delivery
//! engine, and serves the HTTP API from the same process.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use std::sync::Arc;

use anyhow::Result;

use relay_api::config::Config;
use relay_api::server::{self, AppState};
use relay_core::observability::init_logging;
use relay_engine::intake::TaskService;
use relay_engine::queue::InMemoryQueue;
use relay_engine::runtime::Engine;
use relay_engine::store::{InMemoryLogStore, InMemoryTaskStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_logging(config.log_format());

    let task_store = Arc::new(InMemoryTaskStore::new());
    let log_store = Arc::new(InMemoryLogStore::new());
    let queue = Arc::new(InMemoryQueue::new());

    let engine = Engine::start(
        config.engine(),
        task_store.clone(),
        log_store.clone(),
        queue.clone(),
    )?;

    let service = Arc::new(TaskService::new(task_store, log_store, queue));
    let state = Arc::new(AppState::new(service, config.retry_max_retries));
    let mut app = server::router(state);
    if let Some(cors) = server::cors_layer(&config.cors_allowed_origins) {
        app = app.layer(cors);
    }

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.http_port));
    tracing::info!(%addr, "relay api listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    engine.shutdown().await;
    Ok(())
}
