//! Print the effective configuration.

use anyhow::{Context, Result};

use crate::config::AppConfig;

pub fn execute(config: &AppConfig) -> Result<()> {
    println!("# {}", AppConfig::config_path().display());
    let rendered =
        toml::to_string_pretty(&config.redacted()).context("Failed to serialize config")?;
    print!("{}", rendered);
    Ok(())
}
