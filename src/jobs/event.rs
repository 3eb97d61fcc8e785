use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{JobEnvelope, JobId};

/// Job lifecycle: `queued -> running -> {succeeded, failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

/// A single progress update as delivered to subscribers
///
/// Serialized field names match the browser client (`id`, `progress`,
/// `status`, `filePath`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub id: JobId,
    pub url: String,
    pub title: String,
    pub state: JobState,
    /// Percent complete, always within `[0, 100]`
    pub progress: f64,
    pub status: String,
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    fn new(envelope: &JobEnvelope, state: JobState, progress: f64, status: String) -> Self {
        Self {
            id: envelope.id,
            url: envelope.job.url.clone(),
            title: envelope.job.title.clone(),
            state,
            progress: progress.clamp(0.0, 100.0),
            status,
            file_path: String::new(),
            error: None,
            timestamp: Utc::now(),
        }
    }

    fn with_path(mut self, path: &Path) -> Self {
        self.file_path = path.display().to_string();
        self
    }

    pub fn queued(envelope: &JobEnvelope) -> Self {
        let status = format!("Queued {}", display_name(envelope));
        Self::new(envelope, JobState::Queued, 0.0, status)
    }

    pub fn started(envelope: &JobEnvelope, path: &Path) -> Self {
        let status = format!("Starting download of {}", display_name(envelope));
        Self::new(envelope, JobState::Running, 0.0, status).with_path(path)
    }

    pub fn progress(envelope: &JobEnvelope, path: &Path, percent: f64) -> Self {
        let status = format!("Downloading {}... {:.1}%", display_name(envelope), percent);
        Self::new(envelope, JobState::Running, percent, status).with_path(path)
    }

    pub fn succeeded(envelope: &JobEnvelope, path: &Path) -> Self {
        let status = format!("Download complete: {}", path.display());
        Self::new(envelope, JobState::Succeeded, 100.0, status).with_path(path)
    }

    /// `path` is `None` when the job failed before an output path was chosen
    pub fn failed(
        envelope: &JobEnvelope,
        path: Option<&Path>,
        percent: f64,
        error: impl Into<String>,
    ) -> Self {
        let error = error.into();
        let status = format!("Download failed for {}: {}", display_name(envelope), error);
        let mut event = Self::new(envelope, JobState::Failed, percent, status);
        if let Some(path) = path {
            event = event.with_path(path);
        }
        event.error = Some(error);
        event
    }
}

fn display_name(envelope: &JobEnvelope) -> &str {
    if envelope.job.title.trim().is_empty() {
        &envelope.job.url
    } else {
        &envelope.job.title
    }
}
