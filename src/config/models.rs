use crate::humanize::{ByteSize, HumanDuration};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub downloader: DownloaderConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: ByteSize,
    #[serde(default = "default_max_jobs_per_request")]
    pub max_jobs_per_request: usize,
    /// Interval between SSE keep-alive comments
    #[serde(default = "default_sse_keep_alive")]
    pub sse_keep_alive: HumanDuration,
    /// How long shutdown waits for workers to wind down
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace: HumanDuration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_payload_bytes: default_max_payload_bytes(),
            max_jobs_per_request: default_max_jobs_per_request(),
            sse_keep_alive: default_sse_keep_alive(),
            shutdown_grace: default_shutdown_grace(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

fn default_max_payload_bytes() -> ByteSize {
    ByteSize(1024 * 1024) // 1 MB
}

fn default_max_jobs_per_request() -> usize {
    1000
}

fn default_sse_keep_alive() -> HumanDuration {
    HumanDuration::from_secs(15)
}

fn default_shutdown_grace() -> HumanDuration {
    HumanDuration::from_secs(10)
}

/// Request queue configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    #[serde(default = "default_queue_capacity")]
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_queue_capacity(),
        }
    }
}

fn default_queue_capacity() -> usize {
    100
}

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkersConfig {
    #[serde(default = "default_worker_count")]
    pub count: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            count: default_worker_count(),
        }
    }
}

fn default_worker_count() -> usize {
    3
}

/// Progress fan-out configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProgressConfig {
    /// Events buffered per subscriber before new ones are dropped for it
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

fn default_subscriber_buffer() -> usize {
    256
}

/// External downloader configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloaderConfig {
    #[serde(default = "default_program")]
    pub program: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_job_timeout")]
    pub job_timeout: HumanDuration,
    /// Passed verbatim before `-o <path> <url>`
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            output_dir: default_output_dir(),
            job_timeout: default_job_timeout(),
            extra_args: Vec::new(),
        }
    }
}

fn default_program() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_job_timeout() -> HumanDuration {
    HumanDuration::from_secs(2 * 60 * 60)
}
