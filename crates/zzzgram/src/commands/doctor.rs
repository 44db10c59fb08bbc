//! Diagnostics command.

use anyhow::Result;
use colored::Colorize;
use std::time::Duration;
use zzzgram_core::aws::{AwsAuth, AwsCredentials};
use zzzgram_core::pipeline::parse_timezone;

use super::BEDROCK_API_KEY_VAR;
use crate::config::AppConfig;

pub async fn execute(config: &AppConfig) -> Result<()> {
    println!("{}", "zzzgram Doctor".cyan().bold());
    println!("{}", "─".repeat(50));
    println!();

    let mut issues = Vec::new();

    // Config file
    print!("  Config file: ");
    let config_path = AppConfig::config_path();
    if config_path.exists() {
        println!("{}", format!("✓ {}", config_path.display()).green());
    } else {
        println!("{}", "○ not found (using defaults)".yellow());
    }

    // Account
    print!("  Account: ");
    match config.account() {
        Ok(account) => println!(
            "{}",
            format!("✓ {} (device {})", account.username, account.device_id).green()
        ),
        Err(e) => {
            println!("{}", format!("✗ {}", e).red());
            issues.push("Account is incomplete - runs will not start");
        }
    }

    // Timezone
    print!("  Timezone: ");
    match parse_timezone(&config.pipeline.schedule.timezone) {
        Ok(tz) => println!("{}", format!("✓ {}", tz).green()),
        Err(e) => {
            println!("{}", format!("✗ {}", e).red());
            issues.push("Configured timezone is not recognized");
        }
    }

    // AWS
    println!();
    println!("  {}", "AWS:".cyan());
    print!("    Bedrock ({}): ", config.pipeline.bedrock.region);
    match AwsAuth::from_env(BEDROCK_API_KEY_VAR) {
        Ok(AwsAuth::Bearer(_)) => println!("{}", "✓ API key".green()),
        Ok(AwsAuth::SigV4(_)) => println!("{}", "✓ access keys".green()),
        Err(e) => {
            println!("{}", format!("○ {} (insights will be skipped)", e).yellow());
        }
    }
    print!("    SNS ({}): ", config.pipeline.notify.region);
    match AwsCredentials::from_env() {
        Ok(_) => println!("{}", "✓ access keys".green()),
        Err(e) => {
            println!("{}", format!("○ {} (notifications will be skipped)", e).yellow());
        }
    }

    // Vendor API reachability
    println!();
    print!("  Vendor API ({}): ", config.pipeline.vendor.base_url);
    match check_reachable(&config.pipeline.vendor.base_url).await {
        Ok(_) => println!("{}", "✓ reachable".green()),
        Err(e) => {
            println!("{}", format!("✗ {}", e).red());
            issues.push("Cannot reach the vendor API");
        }
    }

    // Summary
    println!();
    if issues.is_empty() {
        println!("{}", "✓ All checks passed".green().bold());
    } else {
        println!("{}", format!("✗ {} issue(s) found:", issues.len()).red().bold());
        for issue in &issues {
            println!("  • {}", issue);
        }
    }

    Ok(())
}

async fn check_reachable(url: &str) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    // Any HTTP response counts; only transport failures are issues
    client.head(url).send().await?;
    Ok(())
}
