//! Dispatch queue facade.
//!
//! The queue is a best-effort FIFO of task ids and is **not** the source
//! of truth: entries may be lost (crash, flush, eviction) because the
//! retry scheduler re-discovers pending work from the task store, and
//! duplicate entries are harmless because the worker claim is CAS-gated.
//!
//! ## Design Principles
//!
//! - **Backend agnostic**: Same interface for an in-memory deque, Redis
//!   list, or an external broker
//! - **Ids only**: The queue carries task ids; the payload lives in the
//!   durable store
//! - **Dumb on purpose**: No leases, no dedup, no acknowledgements

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;

use relay_core::TaskId;

use crate::error::Result;

pub use memory::InMemoryQueue;

/// FIFO queue of task ids with a blocking pop.
///
/// ## Thread Safety
///
/// All methods are `Send + Sync`; the worker pool pops concurrently while
/// intake and the control loops push.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Enqueues a task id. No deduplication is performed.
    async fn push(&self, task_id: TaskId) -> Result<()>;

    /// Removes the oldest id, waiting up to `timeout` for one to arrive.
    ///
    /// Returns `None` on timeout.
    async fn pop_blocking(&self, timeout: Duration) -> Result<Option<TaskId>>;

    /// Returns the approximate number of queued ids.
    async fn len(&self) -> Result<usize>;

    /// Returns true if the queue is currently empty.
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}
