//! In-memory queue implementation.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use relay_core::TaskId;

use super::TaskQueue;
use crate::error::{Error, Result};

fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::storage("queue lock poisoned")
}

/// In-memory FIFO queue backed by a `VecDeque` and a `Notify`.
///
/// Suitable for tests, development, and single-process deployments. The
/// production analogue is a Redis list driven with LPUSH/BRPOP; both ends
/// of the contract (loss tolerated, duplicates tolerated) are identical.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    items: Mutex<VecDeque<TaskId>>,
    notify: Notify,
}

impl InMemoryQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn try_pop(&self) -> Result<Option<TaskId>> {
        let mut items = self.items.lock().map_err(poison_err)?;
        Ok(items.pop_front())
    }
}

#[async_trait]
impl TaskQueue for InMemoryQueue {
    async fn push(&self, task_id: TaskId) -> Result<()> {
        {
            let mut items = self.items.lock().map_err(poison_err)?;
            items.push_back(task_id);
        }
        self.notify.notify_one();
        Ok(())
    }

    async fn pop_blocking(&self, timeout: Duration) -> Result<Option<TaskId>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(id) = self.try_pop()? {
                return Ok(Some(id));
            }

            // notify_one stores a permit when no task is waiting, so a
            // push racing this gap is not lost.
            let notified = self.notify.notified();
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(self.try_pop()?);
            }
        }
    }

    async fn len(&self) -> Result<usize> {
        let items = self.items.lock().map_err(poison_err)?;
        Ok(items.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn push_pop_is_fifo() -> Result<()> {
        let queue = InMemoryQueue::new();
        let first = TaskId::generate();
        let second = TaskId::generate();

        queue.push(first).await?;
        queue.push(second).await?;
        assert_eq!(queue.len().await?, 2);

        assert_eq!(
            queue.pop_blocking(Duration::from_millis(10)).await?,
            Some(first)
        );
        assert_eq!(
            queue.pop_blocking(Duration::from_millis(10)).await?,
            Some(second)
        );
        assert!(queue.is_empty().await?);

        Ok(())
    }

    #[tokio::test]
    async fn pop_times_out_on_empty_queue() -> Result<()> {
        let queue = InMemoryQueue::new();
        let start = tokio::time::Instant::now();
        let popped = queue.pop_blocking(Duration::from_millis(50)).await?;
        assert!(popped.is_none());
        assert!(start.elapsed() >= Duration::from_millis(50));
        Ok(())
    }

    #[tokio::test]
    async fn pop_wakes_on_concurrent_push() -> Result<()> {
        let queue = Arc::new(InMemoryQueue::new());
        let id = TaskId::generate();

        let popper = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop_blocking(Duration::from_secs(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push(id).await?;

        let popped = popper.await.unwrap()?;
        assert_eq!(popped, Some(id));
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_pushes_are_kept() -> Result<()> {
        let queue = InMemoryQueue::new();
        let id = TaskId::generate();
        queue.push(id).await?;
        queue.push(id).await?;
        assert_eq!(queue.len().await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn each_id_is_delivered_to_one_popper() -> Result<()> {
        let queue = Arc::new(InMemoryQueue::new());
        for _ in 0..16 {
            queue.push(TaskId::generate()).await?;
        }

        let mut handles = Vec::new();
        for _ in 0..4 {
            let queue = Arc::clone(&queue);
            handles.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                while let Ok(Some(id)) = queue.pop_blocking(Duration::from_millis(20)).await {
                    seen.push(id);
                }
                seen
            }));
        }

        let mut total = 0;
        for handle in handles {
            total += handle.await.unwrap().len();
        }
        assert_eq!(total, 16);
        assert!(queue.is_empty().await?);
        Ok(())
    }
}
