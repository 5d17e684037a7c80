//! Applying classified delivery outcomes to the durable record.
//!
//! The handler owns the only writes that complete or reschedule a task.
//! The log row is appended **before** the state transition: a crash in
//! between leaves a visible PROCESSING record for the sweeper to recover,
//! never a silently lost attempt.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::Utc;

use crate::config::EngineConfig;
use crate::delivery::{DeliveryReport, Disposition};
use crate::error::Result;
use crate::log::AttemptLog;
use crate::store::{LogStore, TaskStore};
use crate::task::{NotificationTask, TaskStatus};

/// Applies success / retry / terminal-failure decisions to tasks.
pub struct OutcomeHandler {
    task_store: Arc<dyn TaskStore>,
    log_store: Arc<dyn LogStore>,
    base_delay: Duration,
    jitter: bool,
}

impl OutcomeHandler {
    /// Creates a handler over the given stores.
    pub fn new(
        task_store: Arc<dyn TaskStore>,
        log_store: Arc<dyn LogStore>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            task_store,
            log_store,
            base_delay: config.base_delay,
            jitter: config.jitter,
        }
    }

    /// Applies `report` to a claimed (PROCESSING) task.
    ///
    /// Returns the updated record.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the log append or the save fails; the
    /// worker loop logs and moves on, and the sweeper eventually recovers
    /// the claim.
    pub async fn apply(
        &self,
        mut task: NotificationTask,
        report: DeliveryReport,
    ) -> Result<NotificationTask> {
        let attempt_number = task.retry_count + 1;
        let success = report.disposition.is_success();

        self.log_store
            .append(AttemptLog {
                task_id: task.task_id,
                attempt_number,
                http_status: report.http_status,
                response_body: if success { report.response_body } else { None },
                error_message: if success {
                    None
                } else {
                    report.error_message.clone()
                },
                latency_ms: report.latency_ms,
                success,
                created_at: Utc::now(),
            })
            .await?;

        let now = Utc::now();
        match report.disposition {
            Disposition::Success => {
                task.status = TaskStatus::Success;
                task.last_http_status = report.http_status;
                task.completed_at = Some(now);
                tracing::info!(
                    task_id = %task.task_id,
                    http_status = report.http_status,
                    attempt = attempt_number,
                    "delivery succeeded"
                );
            }
            Disposition::Fail(reason) => {
                task.retry_count = attempt_number;
                task.last_error = report.error_message;
                if report.http_status.is_some() {
                    task.last_http_status = report.http_status;
                }
                task.status = TaskStatus::Failed;
                task.completed_at = Some(now);
                tracing::error!(
                    task_id = %task.task_id,
                    ?reason,
                    http_status = report.http_status,
                    "delivery failed terminally"
                );
            }
            Disposition::Retry(reason) => {
                task.retry_count = attempt_number;
                task.last_error = report.error_message;
                if report.http_status.is_some() {
                    task.last_http_status = report.http_status;
                }

                if task.can_retry() {
                    let delay = self.delay_for(&task);
                    task.next_retry_at = Some(
                        now + chrono::Duration::from_std(delay)
                            .unwrap_or(chrono::TimeDelta::MAX),
                    );
                    task.status = TaskStatus::Pending;
                    tracing::warn!(
                        task_id = %task.task_id,
                        ?reason,
                        retry_count = task.retry_count,
                        max_retries = task.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "delivery failed, retry scheduled"
                    );
                } else {
                    task.status = TaskStatus::Failed;
                    task.completed_at = Some(now);
                    tracing::error!(
                        task_id = %task.task_id,
                        retry_count = task.retry_count,
                        "delivery failed, retry budget exhausted"
                    );
                }
            }
        }

        task.updated_at = now;
        self.task_store.save(&task).await?;
        Ok(task)
    }

    /// Backoff for the task's current (post-increment) retry count, with
    /// optional jitter of up to half the base delay.
    fn delay_for(&self, task: &NotificationTask) -> Duration {
        let delay = task.backoff_delay(self.base_delay);
        if !self.jitter {
            return delay;
        }

        let window_ms = (delay.as_millis() / 2).max(1);
        let seed = u128::from(
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .subsec_nanos(),
        );
        let jitter_ms = u64::try_from(seed % (window_ms + 1)).unwrap_or(0);
        delay.saturating_add(Duration::from_millis(jitter_ms))
    }
}
