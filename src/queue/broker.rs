use crate::jobs::JobEnvelope;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("job queue is closed")]
    Closed,
}

/// JobQueue hands submitted jobs to the worker pool
///
/// Architecture:
/// 1. API handlers call `queue.enqueue(envelope)` for each submitted item
/// 2. The envelope lands in one bounded mpsc channel shared by all workers
/// 3. Workers call `queue.dequeue()`; the receive side sits behind a mutex,
///    so whichever worker is idle takes the next job in FIFO order
/// 4. A full channel makes `enqueue` wait (backpressure on the submitter)
/// 5. `close()` rejects new work and lets workers drain what is buffered
///
/// Cloning is cheap; every clone refers to the same channel.
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<JobEnvelope>,
    receiver: Arc<Mutex<mpsc::Receiver<JobEnvelope>>>,
    closed: CancellationToken,
    capacity: usize,
}

impl JobQueue {
    /// Create a queue holding at most `capacity` pending jobs
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; configuration validation rejects that.
    pub fn new(capacity: usize) -> Self {
        info!(capacity, "Creating job queue");

        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            closed: CancellationToken::new(),
            capacity,
        }
    }

    /// Add a job, waiting for room when the queue is full
    pub async fn enqueue(&self, envelope: JobEnvelope) -> Result<(), QueueError> {
        self.reserve().await?.send(envelope);
        Ok(())
    }

    /// Wait for a free slot without handing over a job yet
    ///
    /// Once this returns, [`JobSlot::send`] cannot fail or wait, so callers
    /// can announce the job and enqueue it with no await point in between.
    /// Dropping the slot gives the capacity back.
    pub async fn reserve(&self) -> Result<JobSlot<'_>, QueueError> {
        if self.closed.is_cancelled() {
            return Err(QueueError::Closed);
        }

        tokio::select! {
            permit = self.sender.reserve() => {
                let permit = permit.map_err(|_| QueueError::Closed)?;
                Ok(JobSlot { permit, queue: self })
            }
            _ = self.closed.cancelled() => Err(QueueError::Closed),
        }
    }

    /// Take the next job
    ///
    /// Returns `None` once the queue is closed and every job buffered
    /// before the close has been handed out.
    pub async fn dequeue(&self) -> Option<JobEnvelope> {
        let mut receiver = self.receiver.lock().await;

        tokio::select! {
            biased;
            envelope = receiver.recv() => envelope,
            _ = self.closed.cancelled() => {
                // Stop further sends, then drain whatever is still buffered
                receiver.close();
                receiver.recv().await
            }
        }
    }

    /// Stop accepting jobs. Idempotent.
    pub fn close(&self) {
        if !self.closed.is_cancelled() {
            info!(pending = self.len(), "Closing job queue");
            self.closed.cancel();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Number of jobs waiting for a worker, reserved slots included
    pub fn len(&self) -> usize {
        self.capacity - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A reserved place in the [`JobQueue`]
pub struct JobSlot<'a> {
    permit: mpsc::Permit<'a, JobEnvelope>,
    queue: &'a JobQueue,
}

impl JobSlot<'_> {
    pub fn send(self, envelope: JobEnvelope) {
        let id = envelope.id;
        self.permit.send(envelope);
        debug!(job_id = %id, pending = self.queue.len(), "Job enqueued");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{DownloadJob, MediaFormat};
    use std::time::Duration;
    use tokio::time::timeout;

    fn create_test_job(title: &str) -> JobEnvelope {
        JobEnvelope::new(DownloadJob {
            url: format!("https://example.com/{title}"),
            title: title.to_string(),
            format: MediaFormat::Video,
        })
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = JobQueue::new(10);

        for title in ["a", "b", "c"] {
            queue.enqueue(create_test_job(title)).await.unwrap();
        }
        assert_eq!(queue.len(), 3);

        for title in ["a", "b", "c"] {
            let envelope = queue.dequeue().await.unwrap();
            assert_eq!(envelope.job.title, title);
        }
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_enqueue_waits_when_full() {
        let queue = JobQueue::new(1);
        queue.enqueue(create_test_job("first")).await.unwrap();

        // Second enqueue must block until a slot frees up
        let blocked = timeout(Duration::from_millis(50), queue.enqueue(create_test_job("second"))).await;
        assert!(blocked.is_err());

        let producer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.enqueue(create_test_job("third")).await })
        };

        assert_eq!(queue.dequeue().await.unwrap().job.title, "first");
        producer.await.unwrap().unwrap();
        assert_eq!(queue.dequeue().await.unwrap().job.title, "third");
    }

    #[tokio::test]
    async fn test_close_drains_then_ends() {
        let queue = JobQueue::new(10);
        queue.enqueue(create_test_job("a")).await.unwrap();
        queue.enqueue(create_test_job("b")).await.unwrap();

        queue.close();
        queue.close();
        assert!(queue.is_closed());
        assert!(matches!(
            queue.enqueue(create_test_job("late")).await,
            Err(QueueError::Closed)
        ));

        assert_eq!(queue.dequeue().await.unwrap().job.title, "a");
        assert_eq!(queue.dequeue().await.unwrap().job.title, "b");
        assert!(queue.dequeue().await.is_none());
        assert!(queue.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn test_close_wakes_idle_consumer() {
        let queue = JobQueue::new(4);

        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.dequeue().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        queue.close();
        let result = timeout(Duration::from_secs(1), consumer).await.unwrap().unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_close_releases_blocked_producer() {
        let queue = JobQueue::new(1);
        queue.enqueue(create_test_job("fill")).await.unwrap();

        let producer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.enqueue(create_test_job("stuck")).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        queue.close();
        let result = timeout(Duration::from_secs(1), producer).await.unwrap().unwrap();
        assert!(matches!(result, Err(QueueError::Closed)));
    }

    #[tokio::test]
    async fn test_dropped_reservation_frees_slot() {
        let queue = JobQueue::new(1);

        let slot = queue.reserve().await.unwrap();
        let blocked = timeout(Duration::from_millis(50), queue.reserve()).await;
        assert!(blocked.is_err());

        drop(slot);
        assert!(queue.is_empty());
        queue.reserve().await.unwrap().send(create_test_job("after"));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.dequeue().await.unwrap().job.title, "after");
    }
}
