use super::models::Config;
use thiserror::Error;

/// Upper bound for `server.max_payload_bytes`
const MAX_PAYLOAD_LIMIT: u64 = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    MustBePositive { field: &'static str },

    #[error("max_payload_bytes ({actual}) exceeds limit of 16MB ({limit})")]
    PayloadLimitTooLarge { actual: u64, limit: u64 },

    #[error("downloader.program must not be empty")]
    EmptyProgram,

    #[error("downloader.output_dir must not be empty")]
    EmptyOutputDir,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_server(config)?;
    validate_pipeline(config)?;
    validate_downloader(config)?;
    Ok(())
}

fn validate_server(config: &Config) -> Result<(), ValidationError> {
    let actual = config.server.max_payload_bytes.as_u64();
    if actual == 0 {
        return Err(ValidationError::MustBePositive {
            field: "server.max_payload_bytes",
        });
    }
    if actual > MAX_PAYLOAD_LIMIT {
        return Err(ValidationError::PayloadLimitTooLarge {
            actual,
            limit: MAX_PAYLOAD_LIMIT,
        });
    }
    if config.server.max_jobs_per_request == 0 {
        return Err(ValidationError::MustBePositive {
            field: "server.max_jobs_per_request",
        });
    }

    let durations = [
        ("server.sse_keep_alive", config.server.sse_keep_alive),
        ("server.shutdown_grace", config.server.shutdown_grace),
    ];
    for (field, value) in durations {
        if value.0.is_zero() {
            return Err(ValidationError::MustBePositive { field });
        }
    }
    Ok(())
}

/// Queue, pool and fan-out sizes all feed bounded channels, which reject zero
fn validate_pipeline(config: &Config) -> Result<(), ValidationError> {
    let sizes = [
        ("queue.capacity", config.queue.capacity),
        ("workers.count", config.workers.count),
        ("progress.subscriber_buffer", config.progress.subscriber_buffer),
    ];

    for (field, value) in sizes {
        if value == 0 {
            return Err(ValidationError::MustBePositive { field });
        }
    }
    Ok(())
}

fn validate_downloader(config: &Config) -> Result<(), ValidationError> {
    if config.downloader.program.as_os_str().is_empty() {
        return Err(ValidationError::EmptyProgram);
    }
    if config.downloader.output_dir.as_os_str().is_empty() {
        return Err(ValidationError::EmptyOutputDir);
    }
    if config.downloader.job_timeout.0.is_zero() {
        return Err(ValidationError::MustBePositive {
            field: "downloader.job_timeout",
        });
    }
    Ok(())
}
