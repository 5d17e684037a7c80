//! In-memory store implementations for testing and development.
//!
//! This module provides [`InMemoryTaskStore`] and [`InMemoryLogStore`],
//! simple in-memory implementations of the persistence facades.
//!
//! ## Limitations
//!
//! - **NOT suitable for production**: No durability, no cross-process
//!   coordination
//! - **Single-process only**: State is not shared across process
//!   boundaries
//! - **No persistence**: All state is lost when the process exits

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use relay_core::TaskId;

use super::{CasResult, LogStore, TaskStore};
use crate::error::{Error, Result};
use crate::log::{
    AttemptLog, ERROR_MESSAGE_MAX_CHARS, RESPONSE_BODY_MAX_CHARS, truncate_chars,
};
use crate::task::{NotificationTask, TaskStatus};

/// Converts a lock poison error to a storage error.
fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::storage("lock poisoned")
}

/// In-memory task store.
///
/// Thread-safe via `RwLock`; the CAS primitive holds the write lock for
/// the whole check-and-update, which is what gives it atomicity here.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<TaskId, NotificationTask>>,
}

impl InMemoryTaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of tasks currently stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn task_count(&self) -> Result<usize> {
        let count = {
            let tasks = self.tasks.read().map_err(poison_err)?;
            tasks.len()
        };
        Ok(count)
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, task: &NotificationTask) -> Result<()> {
        let mut tasks = self.tasks.write().map_err(poison_err)?;
        if tasks.contains_key(&task.task_id) {
            return Err(Error::DuplicateTask {
                task_id: task.task_id,
            });
        }
        tasks.insert(task.task_id, task.clone());
        Ok(())
    }

    async fn find_by_task_id(&self, task_id: TaskId) -> Result<Option<NotificationTask>> {
        let result = {
            let tasks = self.tasks.read().map_err(poison_err)?;
            tasks.get(&task_id).cloned()
        };
        Ok(result)
    }

    async fn compare_and_set_status(
        &self,
        task_id: TaskId,
        expected: TaskStatus,
        target: TaskStatus,
        now: DateTime<Utc>,
    ) -> Result<CasResult> {
        let mut tasks = self.tasks.write().map_err(poison_err)?;

        let Some(task) = tasks.get_mut(&task_id) else {
            drop(tasks);
            return Ok(CasResult::NotFound);
        };

        if task.status != expected {
            let actual = task.status;
            drop(tasks);
            return Ok(CasResult::StatusMismatch { actual });
        }

        if !expected.can_transition_to(target) {
            drop(tasks);
            return Err(Error::InvalidStateTransition {
                from: expected,
                to: target,
            });
        }

        task.status = target;
        task.updated_at = now;
        drop(tasks);
        Ok(CasResult::Success)
    }

    async fn save(&self, task: &NotificationTask) -> Result<()> {
        let mut tasks = self.tasks.write().map_err(poison_err)?;
        if !tasks.contains_key(&task.task_id) {
            drop(tasks);
            return Err(Error::TaskNotFound {
                task_id: task.task_id,
            });
        }
        tasks.insert(task.task_id, task.clone());
        Ok(())
    }

    async fn find_dispatchable(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<NotificationTask>> {
        let mut dispatchable: Vec<NotificationTask> = {
            let tasks = self.tasks.read().map_err(poison_err)?;
            tasks
                .values()
                .filter(|t| t.is_dispatchable(now))
                .cloned()
                .collect()
        };

        dispatchable.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.task_id.cmp(&b.task_id))
        });
        dispatchable.truncate(limit);
        Ok(dispatchable)
    }

    async fn find_stuck(&self, threshold: DateTime<Utc>) -> Result<Vec<NotificationTask>> {
        let result = {
            let tasks = self.tasks.read().map_err(poison_err)?;
            tasks
                .values()
                .filter(|t| t.is_stuck(threshold))
                .cloned()
                .collect()
        };
        Ok(result)
    }

    async fn count_by_status(&self, status: TaskStatus) -> Result<usize> {
        let count = {
            let tasks = self.tasks.read().map_err(poison_err)?;
            tasks.values().filter(|t| t.status == status).count()
        };
        Ok(count)
    }
}

/// In-memory attempt-log store.
#[derive(Debug, Default)]
pub struct InMemoryLogStore {
    logs: RwLock<HashMap<TaskId, Vec<AttemptLog>>>,
}

impl InMemoryLogStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LogStore for InMemoryLogStore {
    async fn append(&self, mut entry: AttemptLog) -> Result<()> {
        entry.response_body = entry
            .response_body
            .map(|body| truncate_chars(&body, RESPONSE_BODY_MAX_CHARS));
        entry.error_message = entry
            .error_message
            .map(|msg| truncate_chars(&msg, ERROR_MESSAGE_MAX_CHARS));

        let mut logs = self.logs.write().map_err(poison_err)?;
        logs.entry(entry.task_id).or_default().push(entry);
        Ok(())
    }

    async fn find_by_task_id(&self, task_id: TaskId) -> Result<Vec<AttemptLog>> {
        let mut entries = {
            let logs = self.logs.read().map_err(poison_err)?;
            logs.get(&task_id).cloned().unwrap_or_default()
        };
        entries.sort_by_key(|e| e.attempt_number);
        Ok(entries)
    }
}
