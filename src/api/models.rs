//! API models for the mediafetch HTTP endpoints
//!
//! - `POST /api/download` accepts a JSON array of
//!   [`DownloadJob`](crate::jobs::DownloadJob)s and answers with a
//!   [`SubmitResponse`]
//! - `GET /api/progress` streams [`ProgressEvent`](crate::jobs::ProgressEvent)s
//!   as Server-Sent Events
//! - `GET /health` returns a [`HealthResponse`]
//!
//! # Submission example
//!
//! ```json
//! [
//!   { "url": "https://www.youtube.com/watch?v=abc", "title": "My Song (Live)", "format": "audio" },
//!   { "url": "https://www.youtube.com/watch?v=def", "title": "Clip", "format": "video" }
//! ]
//! ```
//!
//! # Progress frame example
//!
//! ```text
//! data: {"id":"0190...","url":"https://...","title":"Clip","state":"running","progress":45.3,"status":"Downloading Clip... 45.3%","filePath":"downloads/Clip.mp4","timestamp":"2024-05-01T10:00:00Z"}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::jobs::JobId;
use crate::observability::MetricsSnapshot;

pub const SUBMIT_STATUS: &str = "downloads started";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AcceptedJob {
    pub id: JobId,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubmitResponse {
    pub status: String,
    pub jobs: Vec<AcceptedJob>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStats {
    pub queue_depth: usize,
    pub queue_capacity: usize,
    pub workers_total: usize,
    pub workers_active: usize,
    pub subscribers: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
    pub stats: HealthStats,
    pub metrics: MetricsSnapshot,
}
