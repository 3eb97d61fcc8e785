use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::{Path, PathBuf};

const CONFIG_ENV_VAR: &str = "MEDIAFETCH_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/mediafetch.toml";
const ENV_PREFIX: &str = "MEDIAFETCH";
const ENV_SEPARATOR: &str = "__";

/// Resolve the configuration file path: explicit path, then `MEDIAFETCH_CONFIG`, then the default
pub fn config_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load configuration with priority (lowest to highest):
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if it exists)
/// 3. Variables from a `.env` file (via dotenvy)
/// 4. System environment variables
pub fn load(explicit: Option<PathBuf>) -> Result<Config, ConfigError> {
    // A missing .env file is not an error
    let _ = dotenvy::dotenv();

    load_from_sources(&config_path(explicit))
}

/// Load configuration from a specific file plus environment overrides
pub fn load_from_sources(config_path: &Path) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!(path = %config_path.display(), "Loading configuration file");
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::debug!(
            path = %config_path.display(),
            "Configuration file not found, using defaults and environment overrides"
        );
    }

    // MEDIAFETCH__WORKERS__COUNT -> workers.count
    // Lists are comma separated: MEDIAFETCH__DOWNLOADER__EXTRA_ARGS=--cookies,c.txt
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .list_separator(",")
            .with_list_parse_key("downloader.extra_args")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(&config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.workers.count, 3);
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(
            &config_path,
            r#"
[server]
bind_addr = "127.0.0.1:9000"
max_payload_bytes = "512KB"
sse_keep_alive = "30s"

[queue]
capacity = 10

[downloader]
program = "/opt/bin/yt-dlp"
output_dir = "/srv/media"
job_timeout = "45m"
            "#,
        )
        .unwrap();

        let config = load_from_sources(&config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.server.max_payload_bytes.as_u64(), 512 * 1024);
        assert_eq!(config.server.sse_keep_alive.0, Duration::from_secs(30));
        assert_eq!(config.queue.capacity, 10);
        assert_eq!(config.downloader.program, PathBuf::from("/opt/bin/yt-dlp"));
        assert_eq!(config.downloader.output_dir, PathBuf::from("/srv/media"));
        assert_eq!(config.downloader.job_timeout.0, Duration::from_secs(45 * 60));
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = config_path(Some(PathBuf::from("custom.toml")));
        assert_eq!(path, PathBuf::from("custom.toml"));
    }

    // Environment overrides are not exercised here: mutating the process
    // environment is unsafe under the parallel test harness.
}
