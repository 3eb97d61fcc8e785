//! Job runner - drives one job through its lifecycle

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::downloader::{DownloadError, MediaDownloader, ProgressTracker};
use crate::jobs::{JobEnvelope, JobState, ProgressEvent};
use crate::observability::Metrics;
use crate::progress::ProgressHub;
use crate::queue::JobQueue;

/// Everything a worker needs, shared by the whole pool
#[derive(Clone)]
pub struct WorkerContext {
    pub queue: JobQueue,
    pub hub: ProgressHub,
    pub downloader: Arc<dyn MediaDownloader>,
    pub metrics: Arc<Metrics>,
    /// Deadline for a single download
    pub job_timeout: Duration,
    /// Fires on shutdown; running downloads are stopped and queued ones fail fast
    pub cancel: CancellationToken,
}

/// Run one job to a terminal state, publishing every transition
///
/// Always publishes exactly one terminal event (`succeeded` or `failed`).
pub async fn run_job(ctx: &WorkerContext, envelope: JobEnvelope) -> JobState {
    let job_id = envelope.id;

    if ctx.cancel.is_cancelled() {
        return fail(ctx, &envelope, None, 0.0, &DownloadError::Cancelled);
    }

    let output = match ctx.downloader.prepare(&envelope).await {
        Ok(path) => path,
        Err(err) => {
            error!(%job_id, error = %err, "Could not prepare download");
            return fail(ctx, &envelope, None, 0.0, &err);
        }
    };

    info!(%job_id, url = %envelope.job.url, format = %envelope.job.format, "Job started");
    ctx.hub.publish(ProgressEvent::started(&envelope, &output));

    let tracker = Mutex::new(ProgressTracker::new());
    let report = |percent: f64| {
        let advanced = tracker.lock().advance(percent);
        if let Some(percent) = advanced {
            ctx.hub.publish(ProgressEvent::progress(&envelope, &output, percent));
        }
    };

    let outcome = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => Err(DownloadError::Cancelled),
        result = tokio::time::timeout(
            ctx.job_timeout,
            ctx.downloader.download(&envelope, &output, &report),
        ) => result.unwrap_or(Err(DownloadError::TimedOut(ctx.job_timeout))),
    };

    let reached = tracker.lock().last();
    match outcome {
        Ok(()) => {
            info!(%job_id, output = %output.display(), "Job succeeded");
            ctx.metrics.job_succeeded();
            ctx.hub.publish(ProgressEvent::succeeded(&envelope, &output));
            JobState::Succeeded
        }
        Err(err) => {
            warn!(%job_id, error = %err, progress = reached, "Job failed");
            fail(ctx, &envelope, Some(&output), reached, &err)
        }
    }
}

fn fail(
    ctx: &WorkerContext,
    envelope: &JobEnvelope,
    output: Option<&std::path::Path>,
    reached: f64,
    err: &DownloadError,
) -> JobState {
    ctx.metrics.job_failed();
    ctx.hub
        .publish(ProgressEvent::failed(envelope, output, reached, err.to_string()));
    JobState::Failed
}
