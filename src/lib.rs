pub mod api;
pub mod config;
pub mod downloader;
pub mod humanize;
pub mod jobs;
pub mod observability;
pub mod progress;
pub mod queue;
pub mod worker;
