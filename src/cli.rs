use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

use mediafetch::config::Config;

#[derive(Parser, Debug)]
#[command(name = "mediafetch")]
#[command(about = "Batch media download service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server and worker pool
    Server(ServerArgs),
    /// Print the resolved configuration as TOML
    Config(ConfigArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to (overrides `server.bind_addr`)
    #[arg(long)]
    pub address: Option<SocketAddr>,

    /// Path to the TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of concurrent downloads (overrides `workers.count`)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Directory downloads are written to (overrides `downloader.output_dir`)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

impl ServerArgs {
    /// Apply CLI overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(address) = self.address {
            config.server.bind_addr = address;
        }
        if let Some(workers) = self.workers {
            config.workers.count = workers;
        }
        if let Some(dir) = &self.output_dir {
            config.downloader.output_dir = dir.clone();
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
    /// Path to the TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}
