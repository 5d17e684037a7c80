//! Task intake, queries, and manual retry.
//!
//! Persistence is the commitment point: `create_task` inserts the durable
//! record **before** touching the queue, and a failed enqueue is swallowed
//! (the retry scheduler re-discovers the task on its next scan). This
//! ordering is the primary lever behind at-least-once delivery.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use relay_core::TaskId;
use relay_core::observability::intake_span;

use crate::error::{Error, Result};
use crate::log::AttemptLog;
use crate::queue::TaskQueue;
use crate::store::{CasResult, LogStore, TaskStore};
use crate::task::{DEFAULT_MAX_RETRIES, HttpMethod, NotificationTask, TaskStatus};

/// A validated request to create a notification task.
///
/// Input validation (lengths, URL scheme, retry bounds) happens at the
/// HTTP boundary; by the time a `NewTask` reaches the engine it is
/// well-formed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    /// Free-form originator tag.
    pub source_system: String,
    /// Absolute HTTP/HTTPS target URL.
    pub target_url: String,
    /// Outbound method (defaults to POST).
    pub http_method: HttpMethod,
    /// Caller-supplied request headers.
    pub headers: BTreeMap<String, String>,
    /// Caller-supplied JSON payload, forwarded verbatim.
    pub body: serde_json::Value,
    /// Retry budget for this task.
    pub max_retries: u32,
}

impl NewTask {
    /// Creates a request with default method, headers, and retry budget.
    pub fn new(
        source_system: impl Into<String>,
        target_url: impl Into<String>,
        body: serde_json::Value,
    ) -> Self {
        Self {
            source_system: source_system.into(),
            target_url: target_url.into(),
            http_method: HttpMethod::default(),
            headers: BTreeMap::new(),
            body,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Sets the outbound method.
    #[must_use]
    pub const fn with_method(mut self, method: HttpMethod) -> Self {
        self.http_method = method;
        self
    }

    /// Sets the request headers.
    #[must_use]
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the retry budget.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// A point-in-time snapshot of relay load.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayStats {
    /// Ids currently sitting in the queue.
    pub queue_size: usize,
    /// Tasks waiting to be dispatched.
    pub pending: usize,
    /// Tasks claimed by a worker right now.
    pub processing: usize,
    /// Tasks delivered successfully.
    pub success: usize,
    /// Tasks terminally failed.
    pub failed: usize,
}

/// Intake and query service over the stores and the queue.
pub struct TaskService {
    task_store: Arc<dyn TaskStore>,
    log_store: Arc<dyn LogStore>,
    queue: Arc<dyn TaskQueue>,
}

impl TaskService {
    /// Creates a service over the given stores and queue.
    pub fn new(
        task_store: Arc<dyn TaskStore>,
        log_store: Arc<dyn LogStore>,
        queue: Arc<dyn TaskQueue>,
    ) -> Self {
        Self {
            task_store,
            log_store,
            queue,
        }
    }

    /// Creates a task: persist, then enqueue.
    ///
    /// A store failure is surfaced to the caller and nothing is enqueued.
    /// A queue failure after the insert is swallowed and logged; the retry
    /// scheduler will pick the task up on its next scan.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the insert fails.
    pub async fn create_task(&self, request: NewTask) -> Result<NotificationTask> {
        let span = intake_span("create_task", &request.source_system);

        async move {
            let task = NotificationTask::create(
                TaskId::generate(),
                request.source_system,
                request.target_url,
                request.http_method,
                request.headers,
                request.body,
                request.max_retries,
                Utc::now(),
            );

            self.task_store.insert(&task).await?;
            tracing::info!(
                task_id = %task.task_id,
                target_url = %task.target_url,
                "task created"
            );

            if let Err(e) = self.queue.push(task.task_id).await {
                // The durable record exists; the scheduler recovers it.
                tracing::warn!(
                    task_id = %task.task_id,
                    error = %e,
                    "enqueue failed after insert, deferring to retry scan"
                );
            }

            Ok(task)
        }
        .instrument(span)
        .await
    }

    /// Loads a task by id.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the lookup fails.
    pub async fn find_task(&self, task_id: TaskId) -> Result<Option<NotificationTask>> {
        self.task_store.find_by_task_id(task_id).await
    }

    /// Returns a task's attempt logs, ascending by attempt number.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the lookup fails.
    pub async fn task_logs(&self, task_id: TaskId) -> Result<Vec<AttemptLog>> {
        self.log_store.find_by_task_id(task_id).await
    }

    /// Re-queues a terminally failed task.
    ///
    /// The FAILED -> PENDING transition is CAS-gated so a race with the
    /// sweeper or another retry call leaves exactly one winner; the reset
    /// of progress fields happens under the won claim.
    ///
    /// # Errors
    ///
    /// - [`Error::TaskNotFound`] for an unknown id
    /// - [`Error::RetryNotAllowed`] when the task is not FAILED
    pub async fn retry_task(&self, task_id: TaskId) -> Result<NotificationTask> {
        let now = Utc::now();
        let cas = self
            .task_store
            .compare_and_set_status(task_id, TaskStatus::Failed, TaskStatus::Pending, now)
            .await?;

        match cas {
            CasResult::Success => {}
            CasResult::NotFound => return Err(Error::TaskNotFound { task_id }),
            CasResult::StatusMismatch { actual } => {
                return Err(Error::RetryNotAllowed {
                    task_id,
                    status: actual,
                });
            }
        }

        let mut task = self
            .task_store
            .find_by_task_id(task_id)
            .await?
            .ok_or(Error::TaskNotFound { task_id })?;
        task.reset_for_manual_retry(now);
        self.task_store.save(&task).await?;

        if let Err(e) = self.queue.push(task_id).await {
            tracing::warn!(
                task_id = %task_id,
                error = %e,
                "enqueue failed after manual retry, deferring to retry scan"
            );
        }

        tracing::info!(task_id = %task_id, "task re-queued by manual retry");
        Ok(task)
    }

    /// Returns per-status task counts and the queue depth.
    ///
    /// # Errors
    ///
    /// Returns a storage error if any count fails.
    pub async fn stats(&self) -> Result<RelayStats> {
        Ok(RelayStats {
            queue_size: self.queue.len().await?,
            pending: self.task_store.count_by_status(TaskStatus::Pending).await?,
            processing: self
                .task_store
                .count_by_status(TaskStatus::Processing)
                .await?,
            success: self.task_store.count_by_status(TaskStatus::Success).await?,
            failed: self.task_store.count_by_status(TaskStatus::Failed).await?,
        })
    }
}
