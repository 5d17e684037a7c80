//! # relay-api
//!
//! HTTP surface for the Relay notification service.
//!
//! This crate exposes the public JSON API over the delivery pipeline:
//!
//! - `POST /v1/notifications` — submit a notification for async delivery
//! - `GET /v1/notifications/:task_id` — status projection
//! - `GET /v1/notifications/:task_id/logs` — per-attempt log
//! - `POST /v1/notifications/:task_id/retry` — re-queue a failed task
//! - `GET /v1/stats` — queue depth and per-status counts
//! - `GET /v1/health` — liveness probe
//!
//! The binary entrypoint embeds the engine: one process serves HTTP and
//! runs the worker pool plus control loops.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod server;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use server::AppState;
