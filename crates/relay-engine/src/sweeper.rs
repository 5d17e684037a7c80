//! The recovery sweeper: returning abandoned claims to the queue.
//!
//! A worker that dies between the CAS claim and the outcome write leaves
//! the task in PROCESSING forever. The sweeper finds claims whose
//! `updated_at` is older than the stuck threshold, forces them back to
//! PENDING, and re-enqueues them. The reset is idempotent and safe: the
//! outcome was never committed, so the eventual re-attempt increments
//! `retry_count` only if it actually fails, and a duplicate delivery is
//! absorbed by target-side idempotency.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::queue::TaskQueue;
use crate::store::TaskStore;
use crate::task::TaskStatus;

/// Handle over the sweeper loop.
pub struct RecoverySweeper {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl RecoverySweeper {
    /// Spawns the periodic sweep loop.
    pub fn spawn(
        config: &EngineConfig,
        task_store: Arc<dyn TaskStore>,
        queue: Arc<dyn TaskQueue>,
    ) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let period = config.sweep_period;
        let stuck_threshold = config.stuck_threshold;

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        sweep_once(task_store.as_ref(), queue.as_ref(), stuck_threshold).await;
                    }
                }
            }
            tracing::debug!("recovery sweeper stopped");
        });

        tracing::info!(
            period_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
            "recovery sweeper started"
        );
        Self { shutdown_tx, join }
    }

    /// Requests shutdown and waits for the loop to exit.
    pub async fn shutdown_and_join(self) {
        let _ = self.shutdown_tx.send(true);
        if tokio::time::timeout(Duration::from_secs(5), self.join)
            .await
            .is_err()
        {
            tracing::warn!("recovery sweeper did not stop within grace period");
        }
    }
}

/// One sweep: reset every abandoned claim and re-enqueue it.
///
/// Errors are logged and retried on the next tick.
async fn sweep_once(task_store: &dyn TaskStore, queue: &dyn TaskQueue, stuck_threshold: Duration) {
    let now = Utc::now();
    let threshold =
        now - chrono::Duration::from_std(stuck_threshold).unwrap_or(chrono::TimeDelta::MAX);

    let stuck = match task_store.find_stuck(threshold).await {
        Ok(tasks) => tasks,
        Err(e) => {
            tracing::error!(error = %e, "stuck-task scan failed");
            return;
        }
    };

    for mut task in stuck {
        tracing::warn!(
            task_id = %task.task_id,
            updated_at = %task.updated_at,
            "recovering stuck task"
        );

        task.status = TaskStatus::Pending;
        task.updated_at = now;
        if let Err(e) = task_store.save(&task).await {
            tracing::error!(task_id = %task.task_id, error = %e, "stuck-task reset failed");
            continue;
        }
        if let Err(e) = queue.push(task.task_id).await {
            // The record is PENDING again; the retry scan re-discovers it.
            tracing::warn!(task_id = %task.task_id, error = %e, "stuck-task enqueue failed");
        }
    }
}
