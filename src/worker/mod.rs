//! Download worker pool
//!
//! A fixed number of tokio tasks pull jobs from the shared queue, run each
//! one through the downloader under a deadline, and publish lifecycle events
//! to the progress hub.

pub mod pool;
pub mod runner;

pub use pool::{PoolStatus, WorkerPool};
pub use runner::{WorkerContext, run_job};
