//! zzzgram - nightly infant sleep digest
//!
//! Logs in to the sleep vendor, reads the last window of telemetry, asks a
//! text model for a note to the parent and publishes a summary. Logs go to
//! stderr; stdout carries only the command output.

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli;
mod commands;
mod config;

use cli::{Cli, Commands};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("zzzgram=info".parse()?))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = config::AppConfig::load()?;

    // Execute command
    match cli.command {
        Commands::Run(args) => {
            let success = commands::run::execute(args, &config).await?;
            Ok(if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Fetch(args) => {
            commands::fetch::execute(args, &config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config => {
            commands::config::execute(&config)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Doctor => {
            commands::doctor::execute(&config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Version => {
            println!("zzzgram {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
    }
}
