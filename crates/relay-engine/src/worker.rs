//! The worker pool: N concurrent consumers over the queue.
//!
//! Each worker loop pops a task id, claims the task with the store's CAS
//! primitive, performs one delivery attempt, and applies the outcome.
//! Mutual exclusion on a task comes entirely from the CAS claim; the
//! queue carries no leases.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

use relay_core::TaskId;
use relay_core::observability::delivery_span;

use crate::config::EngineConfig;
use crate::delivery::DeliveryExecutor;
use crate::error::Result;
use crate::outcome::OutcomeHandler;
use crate::queue::TaskQueue;
use crate::store::TaskStore;
use crate::task::TaskStatus;

/// Grace period for workers to finish their current iteration.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Pause after an unexpected loop error, so a broken dependency is not
/// hot-spun against.
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Handle over the spawned worker loops.
///
/// Dropping the handle does not stop the workers; call
/// [`WorkerPool::shutdown_and_join`].
pub struct WorkerPool {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `config.worker_concurrency` worker loops.
    pub fn spawn(
        config: &EngineConfig,
        queue: Arc<dyn TaskQueue>,
        task_store: Arc<dyn TaskStore>,
        executor: Arc<DeliveryExecutor>,
        handler: Arc<OutcomeHandler>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(config.worker_concurrency);
        for worker_id in 0..config.worker_concurrency {
            let worker = Worker {
                worker_id,
                queue: Arc::clone(&queue),
                task_store: Arc::clone(&task_store),
                executor: Arc::clone(&executor),
                handler: Arc::clone(&handler),
                poll_timeout: config.poll_timeout,
            };
            let mut rx = shutdown_rx.clone();
            joins.push(tokio::spawn(async move {
                worker.run(&mut rx).await;
            }));
        }

        tracing::info!(concurrency = config.worker_concurrency, "worker pool started");
        Self { shutdown_tx, joins }
    }

    /// Requests shutdown and waits for workers to drain.
    ///
    /// Workers finish their current iteration; loops still running after
    /// the 30-second grace are aborted.
    pub async fn shutdown_and_join(mut self) {
        let _ = self.shutdown_tx.send(true);

        let deadline = tokio::time::Instant::now() + SHUTDOWN_GRACE;
        for join in &mut self.joins {
            if tokio::time::timeout_at(deadline, &mut *join).await.is_err() {
                join.abort();
            }
        }
        tracing::info!("worker pool stopped");
    }
}

struct Worker {
    worker_id: usize,
    queue: Arc<dyn TaskQueue>,
    task_store: Arc<dyn TaskStore>,
    executor: Arc<DeliveryExecutor>,
    handler: Arc<OutcomeHandler>,
    poll_timeout: Duration,
}

impl Worker {
    async fn run(&self, shutdown_rx: &mut watch::Receiver<bool>) {
        tracing::debug!(worker_id = self.worker_id, "worker started");

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            // The pop is the only intentional blocking wait in the loop;
            // race it against shutdown so drain stays prompt.
            let popped = tokio::select! {
                _ = shutdown_rx.changed() => continue,
                popped = self.queue.pop_blocking(self.poll_timeout) => popped,
            };

            let task_id = match popped {
                Ok(Some(task_id)) => task_id,
                Ok(None) => continue,
                Err(e) => {
                    tracing::error!(
                        worker_id = self.worker_id,
                        error = %e,
                        "queue pop failed"
                    );
                    tokio::time::sleep(ERROR_BACKOFF).await;
                    continue;
                }
            };

            let span = delivery_span("dispatch", &task_id.to_string());
            if let Err(e) = self.process(task_id).instrument(span).await {
                tracing::error!(
                    worker_id = self.worker_id,
                    task_id = %task_id,
                    error = %e,
                    "worker iteration failed"
                );
                tokio::time::sleep(ERROR_BACKOFF).await;
            }
        }

        tracing::debug!(worker_id = self.worker_id, "worker stopped");
    }

    async fn process(&self, task_id: TaskId) -> Result<()> {
        if self.task_store.find_by_task_id(task_id).await?.is_none() {
            // Stale queue entry referencing a pruned row.
            tracing::debug!(task_id = %task_id, "queued task no longer exists, dropping");
            return Ok(());
        }

        let claim = self
            .task_store
            .compare_and_set_status(task_id, TaskStatus::Pending, TaskStatus::Processing, Utc::now())
            .await?;
        if !claim.is_success() {
            tracing::debug!(task_id = %task_id, "claim lost, another worker owns the task");
            return Ok(());
        }

        // Reload under the claim to observe the freshly stamped record.
        let Some(task) = self.task_store.find_by_task_id(task_id).await? else {
            return Ok(());
        };

        // A queue entry can arrive before the backoff window has elapsed
        // (duplicate push, eager producer). Release the claim and let the
        // retry scheduler re-enqueue the task when it is due.
        let now = Utc::now();
        if let Some(at) = task.next_retry_at.filter(|at| *at > now) {
            self.task_store
                .compare_and_set_status(task_id, TaskStatus::Processing, TaskStatus::Pending, now)
                .await?;
            tracing::debug!(
                task_id = %task_id,
                next_retry_at = %at,
                "claim released, backoff window not elapsed"
            );
            return Ok(());
        }

        tracing::info!(
            worker_id = self.worker_id,
            task_id = %task_id,
            target_url = %task.target_url,
            attempt = task.retry_count + 1,
            "dispatching"
        );

        let report = self.executor.execute(&task).await;
        self.handler.apply(task, report).await?;
        Ok(())
    }
}
