//! Job data model
//!
//! - [`DownloadJob`] is what a client submits: a URL, a title and a format.
//! - [`JobEnvelope`] wraps a job with its generated [`JobId`] while it
//!   travels through the queue to a worker.
//! - [`ProgressEvent`] is one immutable lifecycle update pushed to subscribers.

mod event;

pub use event::{JobState, ProgressEvent};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Requested output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    /// Audio-only extraction at the best quality
    #[serde(alias = "mp3")]
    Audio,
    /// Best available combined video and audio
    #[serde(alias = "mp4")]
    Video,
}

impl MediaFormat {
    /// File extension of the produced artifact
    pub fn extension(self) -> &'static str {
        match self {
            MediaFormat::Audio => "mp3",
            MediaFormat::Video => "mp4",
        }
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaFormat::Audio => f.write_str("audio"),
            MediaFormat::Video => f.write_str("video"),
        }
    }
}

/// One requested media download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadJob {
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub format: MediaFormat,
}

/// Unique per submitted item, even when URLs repeat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Time-sortable UUIDv7
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// First eight hex digits, for placeholder file names and log lines
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A job on its way through the queue
#[derive(Debug, Clone)]
pub struct JobEnvelope {
    pub id: JobId,
    pub job: DownloadJob,
    pub enqueued_at: DateTime<Utc>,
}

impl JobEnvelope {
    pub fn new(job: DownloadJob) -> Self {
        Self {
            id: JobId::new(),
            job,
            enqueued_at: Utc::now(),
        }
    }
}
