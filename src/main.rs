//! Drag CLI entry point
//!
//! Pulls or builds compose service images keyed by git content hashes.

use clap::Parser;
use drag::cli::{Cli, Commands, LoggingArgs};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingArgs) {
    let filter = match logging.directive() {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(!logging.no_ansi)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.logging);

    let result = match cli.command {
        Commands::Sync(args) => drag::cli::sync::execute(args, &cli.project).await,
        Commands::Up(args) => drag::cli::up::execute(args).await,
        Commands::Help(args) => drag::cli::help::execute(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
