//! Telemetry-only command.

use anyhow::{Context, Result};

use crate::cli::FetchArgs;
use crate::config::AppConfig;

pub async fn execute(args: FetchArgs, config: &AppConfig) -> Result<()> {
    let account = config.account()?;
    let orchestrator = super::build_orchestrator(config)?;

    let output = orchestrator
        .fetch_only(&account, args.hours_back, args.raw)
        .await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("Failed to serialize telemetry")?
    );
    Ok(())
}
