mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use mediafetch::config::Config;
use mediafetch::observability;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    observability::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server(args) => {
            let mut config = Config::load(args.config.clone())?;
            args.apply(&mut config);
            config.validate()?;
            mediafetch::api::run(config).await?;
        }
        Commands::Config(args) => {
            let config = Config::load(args.config)?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
