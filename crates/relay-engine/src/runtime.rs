//! Engine composition: workers plus control loops as one lifetime object.
//!
//! All in-process pipeline state (worker handles, shutdown flags) lives in
//! the [`Engine`]; it is created at startup and torn down at shutdown,
//! leaving the stores and the queue as the only shared surfaces.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::delivery::DeliveryExecutor;
use crate::error::Result;
use crate::outcome::OutcomeHandler;
use crate::queue::TaskQueue;
use crate::scheduler::RetryScheduler;
use crate::store::{LogStore, TaskStore};
use crate::sweeper::RecoverySweeper;
use crate::worker::WorkerPool;

/// The running delivery pipeline.
pub struct Engine {
    workers: WorkerPool,
    scheduler: RetryScheduler,
    sweeper: RecoverySweeper,
}

impl Engine {
    /// Starts the worker pool, the retry scheduler, and the recovery
    /// sweeper over the given stores and queue.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the delivery HTTP client cannot
    /// be built.
    pub fn start(
        config: EngineConfig,
        task_store: Arc<dyn TaskStore>,
        log_store: Arc<dyn LogStore>,
        queue: Arc<dyn TaskQueue>,
    ) -> Result<Self> {
        let executor = Arc::new(DeliveryExecutor::new(&config)?);
        let handler = Arc::new(OutcomeHandler::new(
            Arc::clone(&task_store),
            log_store,
            &config,
        ));

        let workers = WorkerPool::spawn(
            &config,
            Arc::clone(&queue),
            Arc::clone(&task_store),
            executor,
            handler,
        );
        let scheduler = RetryScheduler::spawn(&config, Arc::clone(&task_store), Arc::clone(&queue));
        let sweeper = RecoverySweeper::spawn(&config, task_store, queue);

        tracing::info!("relay engine started");
        Ok(Self {
            workers,
            scheduler,
            sweeper,
        })
    }

    /// Stops the control loops and drains the worker pool.
    pub async fn shutdown(self) {
        self.scheduler.shutdown_and_join().await;
        self.sweeper.shutdown_and_join().await;
        self.workers.shutdown_and_join().await;
        tracing::info!("relay engine stopped");
    }
}
