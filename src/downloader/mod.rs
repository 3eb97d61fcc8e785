//! External downloader invocation
//!
//! [`MediaDownloader`] is the seam between the worker pool and whatever
//! actually fetches media. [`YtDlp`] drives the `yt-dlp` command-line tool:
//! it builds the argument list, streams the child's output through
//! [`parse_percent`], and checks the artifact exists once the child exits.

mod args;
mod parse;
mod sanitize;
mod ytdlp;

pub use args::{VIDEO_FORMAT_SELECTOR, build_args};
pub use parse::{ProgressTracker, parse_percent};
pub use sanitize::{file_stem, output_path, sanitize_file_name};
pub use ytdlp::YtDlp;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::jobs::JobEnvelope;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to create output directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while running the downloader: {0}")]
    Io(#[from] std::io::Error),

    #[error("downloader exited with {status}{}", detail_suffix(.detail))]
    Exited {
        status: String,
        detail: Option<String>,
    },

    #[error("downloader finished but {} was not created", .0.display())]
    MissingOutput(PathBuf),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("cancelled: service is shutting down")]
    Cancelled,
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_ref().map(|d| format!(": {d}")).unwrap_or_default()
}

/// Receives percent readings while a download runs
pub type ProgressSink<'a> = &'a (dyn Fn(f64) + Send + Sync);

#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Choose the output path for a job and make sure its directory exists
    async fn prepare(&self, envelope: &JobEnvelope) -> Result<PathBuf, DownloadError>;

    /// Run the download to completion, reporting progress on the way
    ///
    /// Dropping the returned future must stop the download.
    async fn download(
        &self,
        envelope: &JobEnvelope,
        output: &Path,
        progress: ProgressSink<'_>,
    ) -> Result<(), DownloadError>;
}
