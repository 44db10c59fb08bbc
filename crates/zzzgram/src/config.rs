//! Configuration management for zzzgram.
//!
//! Configuration is loaded from multiple sources with precedence:
//! 1. Environment variables (SNOO_USERNAME, SNOO_PASSWORD, BABY_ID, SNS_TOPIC_ARN, AWS_REGION)
//! 2. Config file (ZZZGRAM_CONFIG, or config.toml in the platform config dir)
//! 3. Default values

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use zzzgram_core::{Account, PipelineConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Endpoints, models and schedule
    pub pipeline: PipelineConfig,

    /// Vendor account and device
    pub account: AccountConfig,
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    /// Device (baby) whose telemetry is read
    pub device_id: Option<String>,
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("device_id", &self.device_id)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from file and environment.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file(&Self::config_path())?;
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Parse a config file, or fall back to defaults when it does not exist.
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Apply overrides from `lookup` (the process environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(v) = get("SNOO_USERNAME") {
            self.account.username = Some(v);
        }
        if let Some(v) = get("SNOO_PASSWORD") {
            self.account.password = Some(v);
        }
        if let Some(v) = get("BABY_ID") {
            self.account.device_id = Some(v);
        }
        if let Some(v) = get("SNS_TOPIC_ARN") {
            self.pipeline.notify.topic_arn = v;
        }
        if let Some(v) = get("AWS_REGION") {
            self.pipeline.bedrock.region = v.clone();
            self.pipeline.notify.region = v;
        }
    }

    /// The account for a run. Every field must be set.
    pub fn account(&self) -> Result<Account> {
        let require = |value: &Option<String>, name: &str| -> Result<String> {
            match value {
                Some(v) if !v.is_empty() => Ok(v.clone()),
                _ => bail!("Missing {} (set it in the config file or the environment)", name),
            }
        };

        Ok(Account {
            username: require(&self.account.username, "SNOO_USERNAME")?,
            password: require(&self.account.password, "SNOO_PASSWORD")?,
            device_id: require(&self.account.device_id, "BABY_ID")?,
        })
    }

    /// A printable copy with the password removed.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.account.password.is_some() {
            copy.account.password = Some("<redacted>".to_string());
        }
        copy
    }

    /// Get the config file path.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("ZZZGRAM_CONFIG") {
            PathBuf::from(path)
        } else {
            default_config_dir().join("config.toml")
        }
    }
}

fn default_config_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("dev", "zzzgram", "zzzgram") {
        proj_dirs.config_dir().to_path_buf()
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".zzzgram")
    }
}
