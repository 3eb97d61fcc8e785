use std::collections::HashMap;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::{Stream, StreamExt};
use tracing::{info, warn};

use super::{
    error::ApiError,
    models::{AcceptedJob, HealthResponse, HealthStats, SUBMIT_STATUS, SubmitResponse},
    state::AppState,
    utils::{parse_content_type, read_limited_body},
    validation::validate_batch,
};
use crate::jobs::{DownloadJob, JobEnvelope, ProgressEvent};
use crate::queue::QueueError;

/// Batch submission endpoint (POST /api/download)
///
/// ## Flow:
/// 1. Reject a Content-Type other than `application/json` (a missing header is allowed)
/// 2. Read the body up to `server.max_payload_bytes`
/// 3. Deserialize the job array and validate the batch
/// 4. For each job in order: reserve a queue slot, assign an id, publish `queued`, enqueue
/// 5. Return 202 Accepted with the assigned ids
///
/// Enqueueing waits while the queue is full, so a large batch holds the
/// request open until workers make room.
pub async fn submit_downloads(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(value) = headers.get(CONTENT_TYPE) {
        let content_type = value.to_str().map_err(|_| {
            ApiError::InvalidPayload("Content-Type header is not valid text".into())
        })?;
        parse_content_type(content_type)?;
    }

    let limit = state.config.server.max_payload_bytes.as_usize();
    let body_bytes = read_limited_body(body, limit).await?;

    let jobs: Vec<DownloadJob> = serde_json::from_slice(&body_bytes)?;
    validate_batch(&jobs, state.config.server.max_jobs_per_request)
        .map_err(|err| ApiError::InvalidPayload(err.to_string()))?;

    if state.queue.is_closed() {
        return Err(QueueError::Closed.into());
    }

    let mut accepted = Vec::with_capacity(jobs.len());
    for job in jobs {
        // A job is announced only once its queue slot is held
        let slot = match state.queue.reserve().await {
            Ok(slot) => slot,
            Err(err) => {
                warn!(url = %job.url, "Queue closed while submitting batch");
                return Err(err.into());
            }
        };

        let envelope = JobEnvelope::new(job);
        let job_id = envelope.id;
        let url = envelope.job.url.clone();

        state.hub.publish(ProgressEvent::queued(&envelope));
        slot.send(envelope);

        state.metrics.job_accepted();
        info!(%job_id, %url, "Download queued");
        accepted.push(AcceptedJob { id: job_id, url });
    }

    let response = SubmitResponse {
        status: SUBMIT_STATUS.to_string(),
        jobs: accepted,
    };

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Progress stream endpoint (GET /api/progress)
///
/// Every event published after the client connects is sent as one
/// `data: <json>` frame. The stream ends when the client goes away or the
/// server shuts down.
pub async fn stream_progress(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let subscription = state.hub.subscribe();
    info!(subscriber_id = subscription.id(), "Progress subscriber connected");

    let events = subscription
        .into_stream(state.streams.clone())
        .map(|event| Event::default().json_data(event));

    Sse::new(events).keep_alive(
        KeepAlive::new().interval(state.config.server.sse_keep_alive.as_duration()),
    )
}

/// CORS preflight for the API routes; answers 200 with an empty body
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Health check endpoint (GET /health)
///
/// Returns 503 Service Unavailable once the queue is closed for shutdown,
/// 200 OK otherwise.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = HashMap::new();

    let queue_status = if state.queue.is_closed() {
        "closed"
    } else {
        "healthy"
    };
    components.insert("api".to_string(), "healthy".to_string());
    components.insert("queue".to_string(), queue_status.to_string());
    components.insert("workers".to_string(), "healthy".to_string());
    components.insert("progress".to_string(), "healthy".to_string());

    let all_healthy = components.values().all(|status| status == "healthy");
    let (overall_status, status_code) = if all_healthy {
        ("healthy", StatusCode::OK)
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    };

    let response = HealthResponse {
        status: overall_status.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
        stats: HealthStats {
            queue_depth: state.queue.len(),
            queue_capacity: state.queue.capacity(),
            workers_total: state.workers.size(),
            workers_active: state.workers.active(),
            subscribers: state.hub.subscriber_count(),
        },
        metrics: state.metrics.snapshot(),
    };

    (status_code, Json(response))
}
