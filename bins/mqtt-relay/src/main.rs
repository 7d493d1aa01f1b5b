mod cmd;
mod config;
mod error;

use std::process::ExitCode;

use clap::Parser;
use config::{Cli, Commands};

/// Фильтр логов, если `RUST_LOG` не задан.
const DEFAULT_LOG_FILTER: &str = "info";

#[tokio::main]
async fn main() -> ExitCode {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match Cli::parse().command {
        Commands::Serve(args) => cmd::serve::run(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "mqtt-relay stopped");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
