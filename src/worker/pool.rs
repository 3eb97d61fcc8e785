use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::runner::{WorkerContext, run_job};

/// Live view of the pool, cheap to clone into request handlers
#[derive(Debug, Clone)]
pub struct PoolStatus {
    size: usize,
    active: Arc<AtomicUsize>,
}

impl PoolStatus {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of workers in the pool
    pub fn size(&self) -> usize {
        self.size
    }

    /// Workers currently running a job
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }
}

/// Marks a worker busy for as long as it lives
struct ActiveGuard<'a>(&'a AtomicUsize);

impl<'a> ActiveGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Fixed set of workers draining one shared [`JobQueue`](crate::queue::JobQueue)
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    status: PoolStatus,
}

impl WorkerPool {
    /// Spawn `size` workers onto the current tokio runtime
    pub fn spawn(size: usize, ctx: WorkerContext) -> Self {
        let status = PoolStatus::new(size);
        let ctx = Arc::new(ctx);

        let handles = (0..size)
            .map(|worker_id| {
                let ctx = Arc::clone(&ctx);
                let active = Arc::clone(&status.active);
                tokio::spawn(async move { worker_loop(worker_id, ctx, active).await })
            })
            .collect();

        info!(workers = size, "Worker pool started");
        Self { handles, status }
    }

    pub fn status(&self) -> PoolStatus {
        self.status.clone()
    }

    /// Wait until every worker has exited
    ///
    /// Workers exit once the queue is closed and drained.
    pub async fn join(self) {
        for (worker_id, handle) in self.handles.into_iter().enumerate() {
            if let Err(err) = handle.await {
                error!(worker_id, error = %err, "Worker task ended abnormally");
            }
        }
        info!("Worker pool stopped");
    }
}

async fn worker_loop(worker_id: usize, ctx: Arc<WorkerContext>, active: Arc<AtomicUsize>) {
    debug!(worker_id, "Worker started");

    while let Some(envelope) = ctx.queue.dequeue().await {
        let job_id = envelope.id;
        let _busy = ActiveGuard::enter(&active);
        let state = run_job(&ctx, envelope).await;
        debug!(worker_id, %job_id, ?state, "Worker finished job");
    }

    debug!(worker_id, "Worker exiting, queue closed");
}
