//! The retry scheduler: periodic store scan feeding the queue.
//!
//! This loop is how tasks with a future `next_retry_at` eventually resume,
//! and how tasks that missed the queue (intake-side enqueue failure, queue
//! loss) are rediscovered. Pushing an id that is already queued is
//! harmless: the worker's CAS claim serializes duplicates.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::queue::TaskQueue;
use crate::store::TaskStore;

/// Handle over the scheduler loop.
pub struct RetryScheduler {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl RetryScheduler {
    /// Spawns the periodic scan loop.
    pub fn spawn(
        config: &EngineConfig,
        task_store: Arc<dyn TaskStore>,
        queue: Arc<dyn TaskQueue>,
    ) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let period = config.retry_scan_period;
        let batch = config.retry_scan_batch;

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
                        scan_once(task_store.as_ref(), queue.as_ref(), batch).await;
                    }
                }
            }
            tracing::debug!("retry scheduler stopped");
        });

        tracing::info!(period_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX), "retry scheduler started");
        Self { shutdown_tx, join }
    }

    /// Requests shutdown and waits for the loop to exit.
    pub async fn shutdown_and_join(self) {
        let _ = self.shutdown_tx.send(true);
        if tokio::time::timeout(Duration::from_secs(5), self.join)
            .await
            .is_err()
        {
            tracing::warn!("retry scheduler did not stop within grace period");
        }
    }
}

/// One scheduler tick: re-enqueue every dispatchable task.
///
/// Store or queue failures are logged and retried on the next tick.
async fn scan_once(task_store: &dyn TaskStore, queue: &dyn TaskQueue, batch: usize) {
    let dispatchable = match task_store.find_dispatchable(Utc::now(), batch).await {
        Ok(tasks) => tasks,
        Err(e) => {
            tracing::error!(error = %e, "retry scan failed");
            return;
        }
    };

    if dispatchable.is_empty() {
        return;
    }

    let mut pushed = 0usize;
    for task in &dispatchable {
        match queue.push(task.task_id).await {
            Ok(()) => pushed += 1,
            Err(e) => {
                tracing::warn!(task_id = %task.task_id, error = %e, "re-enqueue failed");
            }
        }
    }
    tracing::debug!(found = dispatchable.len(), pushed, "retry scan re-enqueued tasks");
}
