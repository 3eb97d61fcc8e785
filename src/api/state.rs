use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::observability::Metrics;
use crate::progress::ProgressHub;
use crate::queue::JobQueue;
use crate::worker::PoolStatus;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub queue: JobQueue,
    pub hub: ProgressHub,
    pub workers: PoolStatus,
    pub metrics: Arc<Metrics>,
    /// Ends every open progress stream when cancelled
    pub streams: CancellationToken,
}

impl AppState {
    pub fn new(
        config: Config,
        queue: JobQueue,
        hub: ProgressHub,
        workers: PoolStatus,
        metrics: Arc<Metrics>,
        streams: CancellationToken,
    ) -> Self {
        Self {
            config: Arc::new(config),
            queue,
            hub,
            workers,
            metrics,
            streams,
        }
    }
}
