//! Pluggable persistence for tasks and attempt logs.
//!
//! The [`TaskStore`] trait is the durable source of truth for the
//! pipeline; the queue is only a hot path over it. The [`LogStore`] trait
//! is a strictly append-only side channel.
//!
//! ## Design Principles
//!
//! - **CAS semantics**: The worker claim (`PENDING -> PROCESSING`) uses
//!   compare-and-set so exactly one consumer wins a contested task
//! - **Store over queue**: Recovery loops re-discover work from the store,
//!   so queue loss and duplication are both tolerable
//! - **Testability**: In-memory implementations for tests and dev, a
//!   relational store for production

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use relay_core::TaskId;

use crate::error::Result;
use crate::log::AttemptLog;
use crate::task::{NotificationTask, TaskStatus};

pub use memory::{InMemoryLogStore, InMemoryTaskStore};

/// Result of a compare-and-set status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasResult {
    /// The transition was applied.
    Success,
    /// No task with that id exists.
    NotFound,
    /// The current status did not match the expected value.
    StatusMismatch {
        /// The status that was actually found.
        actual: TaskStatus,
    },
}

impl CasResult {
    /// Returns true if the transition was applied.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns true if the task was not found.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Durable storage for notification tasks.
///
/// ## CAS Semantics
///
/// `compare_and_set_status` is the **only** primitive used to claim a
/// task. It prevents double-dispatch when the queue hands the same id to
/// two workers, and it makes the manual-retry race with the sweeper
/// benign. Any backend with single-row conditional updates suffices.
///
/// ## Thread Safety
///
/// All methods are `Send + Sync` to support concurrent access from the
/// worker pool and the control loops.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Inserts a fresh task record.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::DuplicateTask`] if the id is already
    /// present, or a storage error if the backend is unavailable.
    async fn insert(&self, task: &NotificationTask) -> Result<()>;

    /// Loads a task by id. Returns `None` if the task does not exist.
    async fn find_by_task_id(&self, task_id: TaskId) -> Result<Option<NotificationTask>>;

    /// Atomically transitions status if the current status matches
    /// `expected`, stamping `updated_at` with `now`.
    ///
    /// # Returns
    ///
    /// - `CasResult::Success` if the transition was applied
    /// - `CasResult::NotFound` if the task doesn't exist
    /// - `CasResult::StatusMismatch` if another writer got there first
    async fn compare_and_set_status(
        &self,
        task_id: TaskId,
        expected: TaskStatus,
        target: TaskStatus,
        now: DateTime<Utc>,
    ) -> Result<CasResult>;

    /// Unconditionally persists all mutable fields of `task`.
    ///
    /// Callers must hold the claim (a successful CAS) or be the recovery
    /// sweeper resetting an abandoned claim.
    async fn save(&self, task: &NotificationTask) -> Result<()>;

    /// Returns up to `limit` PENDING tasks whose backoff window has
    /// passed, ordered by `created_at` ascending.
    ///
    /// A relational implementation backs this with a composite index on
    /// `(status, next_retry_at)`.
    async fn find_dispatchable(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<NotificationTask>>;

    /// Returns PROCESSING tasks whose `updated_at` is older than
    /// `threshold` (abandoned claims).
    async fn find_stuck(&self, threshold: DateTime<Utc>) -> Result<Vec<NotificationTask>>;

    /// Counts tasks currently in `status`.
    async fn count_by_status(&self, status: TaskStatus) -> Result<usize>;
}

/// Append-only storage for delivery attempt logs.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Appends one attempt row.
    ///
    /// The store truncates `response_body` and `error_message` to their
    /// documented caps before persisting.
    async fn append(&self, entry: AttemptLog) -> Result<()>;

    /// Returns all attempts for a task, ordered by `attempt_number`
    /// ascending.
    async fn find_by_task_id(&self, task_id: TaskId) -> Result<Vec<AttemptLog>>;
}
