use std::future::Future;
use std::sync::Arc;

use axum::{
    Router,
    http::{Method, header},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::{
    services::{health, preflight, stream_progress, submit_downloads},
    state::AppState,
};
use crate::config::Config;
use crate::downloader::{MediaDownloader, YtDlp};
use crate::observability::Metrics;
use crate::progress::ProgressHub;
use crate::queue::JobQueue;
use crate::worker::{WorkerContext, WorkerPool};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Build the HTTP router over an already wired [`AppState`]
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/download", post(submit_downloads).options(preflight))
        .route("/api/progress", get(stream_progress).options(preflight))
        .route("/health", get(health))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Start the worker pool and serve the API until SIGINT/SIGTERM
pub async fn run(config: Config) -> Result<(), AnyError> {
    run_until(config, shutdown_signal()).await
}

/// Same as [`run`], but stops when `shutdown` resolves
///
/// Shutdown order: close the queue, cancel running jobs, wait for the
/// pool (bounded by `server.shutdown_grace`), then end progress streams so
/// axum can finish its graceful shutdown.
pub async fn run_until<F>(config: Config, shutdown: F) -> Result<(), AnyError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics = Arc::new(Metrics::new());
    let hub = ProgressHub::new(config.progress.subscriber_buffer, Arc::clone(&metrics));
    let queue = JobQueue::new(config.queue.capacity);

    info!(
        program = %config.downloader.program.display(),
        output_dir = %config.downloader.output_dir.display(),
        "Using media downloader"
    );
    let downloader: Arc<dyn MediaDownloader> = Arc::new(YtDlp::from_config(&config.downloader));

    let jobs = CancellationToken::new();
    let streams = CancellationToken::new();

    let pool = WorkerPool::spawn(
        config.workers.count,
        WorkerContext {
            queue: queue.clone(),
            hub: hub.clone(),
            downloader,
            metrics: Arc::clone(&metrics),
            job_timeout: config.downloader.job_timeout.as_duration(),
            cancel: jobs.clone(),
        },
    );

    let address = config.server.bind_addr;
    let grace = config.server.shutdown_grace.as_duration();
    let state = AppState::new(config, queue.clone(), hub, pool.status(), metrics, streams.clone());
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "mediafetch API listening");

    let drain = async move {
        shutdown.await;

        info!("Closing job queue");
        queue.close();
        jobs.cancel();

        if tokio::time::timeout(grace, pool.join()).await.is_err() {
            warn!(?grace, "Workers did not stop within the shutdown grace period");
        }

        streams.cancel();
    };

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(drain)
        .await?;

    info!("mediafetch API stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
