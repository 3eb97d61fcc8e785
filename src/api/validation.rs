use thiserror::Error;

use crate::jobs::DownloadJob;

#[derive(Debug, Error, PartialEq)]
pub enum BatchValidationError {
    #[error("batch contains {count} jobs, limit is {limit}")]
    TooManyJobs { count: usize, limit: usize },
    #[error("job {0} has an empty url")]
    EmptyUrl(usize),
    #[error("job {index} must use an http/https url, got '{url}'")]
    UnsupportedUrl { index: usize, url: String },
}

/// Checks a submitted batch before anything is enqueued
///
/// An empty batch is valid.
pub fn validate_batch(jobs: &[DownloadJob], max_jobs: usize) -> Result<(), BatchValidationError> {
    if jobs.len() > max_jobs {
        return Err(BatchValidationError::TooManyJobs {
            count: jobs.len(),
            limit: max_jobs,
        });
    }

    for (index, job) in jobs.iter().enumerate() {
        let url = job.url.trim();
        if url.is_empty() {
            return Err(BatchValidationError::EmptyUrl(index));
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(BatchValidationError::UnsupportedUrl {
                index,
                url: job.url.clone(),
            });
        }
    }

    Ok(())
}
