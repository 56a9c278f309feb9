//! hostwarden CLI entry point.

use anyhow::Context;
use clap::Parser;

use hostwarden::cli::{handle_error, Cli, Commands};
use hostwarden::infrastructure::config::ConfigLoader;
use hostwarden::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };

    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging))
        .context("Failed to initialize logging")
    {
        Ok(logger) => logger,
        Err(err) => handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Evaluate(args) => {
            hostwarden::cli::commands::evaluate::execute(args, &config, cli.json).await
        }
        Commands::Config(command) => {
            hostwarden::cli::commands::config::execute(command, &config, cli.json)
        }
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
