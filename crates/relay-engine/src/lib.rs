//! # relay-engine
//!
//! The durable delivery pipeline of the Relay notification service.
//!
//! This crate implements the relay domain, providing:
//!
//! - **Data Model**: Task records with a small, explicit state machine and
//!   append-only attempt logs
//! - **Persistence Facades**: [`store::TaskStore`] / [`store::LogStore`]
//!   traits with in-memory implementations
//! - **Queue Facade**: A best-effort FIFO of task ids with blocking pop
//! - **Intake**: Persist-before-enqueue task creation and manual retry
//! - **Delivery**: One-attempt HTTP dispatch with outcome classification
//! - **Workers**: A fixed pool of consumers claiming tasks via CAS
//! - **Control Loops**: Retry scheduling and stuck-task recovery
//!
//! ## Guarantees
//!
//! - **At-least-once**: The durable write is the commitment point; the
//!   queue may lose or duplicate entries without losing tasks
//! - **Single claim**: Exactly one worker dispatches a task at a time,
//!   enforced solely by the store's compare-and-set primitive
//! - **Bounded retries**: Exponential backoff up to a per-task budget,
//!   then terminal failure
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use relay_engine::config::EngineConfig;
//! use relay_engine::intake::{NewTask, TaskService};
//! use relay_engine::queue::InMemoryQueue;
//! use relay_engine::runtime::Engine;
//! use relay_engine::store::{InMemoryLogStore, InMemoryTaskStore};
//!
//! # async fn run() -> relay_engine::error::Result<()> {
//! let task_store = Arc::new(InMemoryTaskStore::new());
//! let log_store = Arc::new(InMemoryLogStore::new());
//! let queue = Arc::new(InMemoryQueue::new());
//!
//! let service = TaskService::new(task_store.clone(), log_store.clone(), queue.clone());
//! let engine = Engine::start(
//!     EngineConfig::default(),
//!     task_store,
//!     log_store,
//!     queue,
//! )?;
//!
//! let task = service
//!     .create_task(NewTask::new(
//!         "order-service",
//!         "https://partner.example.com/hooks/orders",
//!         serde_json::json!({ "orderId": 42 }),
//!     ))
//!     .await?;
//! println!("accepted {}", task.task_id);
//!
//! engine.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod delivery;
pub mod error;
pub mod intake;
pub mod log;
pub mod outcome;
pub mod queue;
pub mod runtime;
pub mod scheduler;
pub mod store;
pub mod sweeper;
pub mod task;
pub mod worker;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::delivery::{DeliveryExecutor, DeliveryReport, Disposition};
    pub use crate::error::{Error, Result};
    pub use crate::intake::{NewTask, RelayStats, TaskService};
    pub use crate::log::AttemptLog;
    pub use crate::queue::{InMemoryQueue, TaskQueue};
    pub use crate::runtime::Engine;
    pub use crate::store::{CasResult, InMemoryLogStore, InMemoryTaskStore, LogStore, TaskStore};
    pub use crate::task::{HttpMethod, NotificationTask, TaskStatus};
}

pub use error::{Error, Result};
pub use task::{HttpMethod, NotificationTask, TaskStatus};
