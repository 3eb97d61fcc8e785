//! Configuration management for mediafetch
//!
//! Settings are layered, lowest priority first:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables
//!
//! # Usage
//!
//! ```no_run
//! use mediafetch::config::Config;
//!
//! let config = Config::load(None).expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Any key can be overridden with `MEDIAFETCH__<section>__<key>`:
//! - `MEDIAFETCH__SERVER__BIND_ADDR=127.0.0.1:9000`
//! - `MEDIAFETCH__WORKERS__COUNT=6`
//! - `MEDIAFETCH__DOWNLOADER__JOB_TIMEOUT=30m`
//!
//! # Configuration File
//!
//! Defaults to `config/mediafetch.toml`; override with `MEDIAFETCH_CONFIG`
//! or the `--config` CLI flag.

mod models;
mod sources;
mod validation;

pub use crate::humanize::{ByteSize, HumanDuration};
pub use models::{
    Config, DownloaderConfig, ProgressConfig, QueueConfig, ServerConfig, WorkersConfig,
};
pub use validation::ValidationError;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + `.env` + environment)
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = sources::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path without touching `.env`
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[workers]\ncount = 5\n").unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.workers.count, 5);
        assert_eq!(config.queue.capacity, 100);
    }

    #[test]
    fn test_validation_runs_after_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[progress]\nsubscriber_buffer = 0\n").unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_full_config_example() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[server]
bind_addr = "0.0.0.0:8080"
max_payload_bytes = "1MB"
max_jobs_per_request = 200
sse_keep_alive = "20s"
shutdown_grace = "5s"

[queue]
capacity = 50

[workers]
count = 4

[progress]
subscriber_buffer = 64

[downloader]
program = "yt-dlp"
output_dir = "media"
job_timeout = "1h"
extra_args = ["--restrict-filenames"]
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.server.max_jobs_per_request, 200);
        assert_eq!(config.server.shutdown_grace.to_string(), "5s");
        assert_eq!(config.queue.capacity, 50);
        assert_eq!(config.workers.count, 4);
        assert_eq!(config.progress.subscriber_buffer, 64);
        assert_eq!(config.downloader.job_timeout.to_string(), "1h");
        assert_eq!(config.downloader.extra_args.len(), 1);
    }

    #[test]
    fn test_malformed_file_is_load_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[workers]\ncount = \"many\"\n").unwrap();

        assert!(matches!(
            Config::load_from_path(config_path),
            Err(ConfigError::LoadError(_))
        ));
    }
}
