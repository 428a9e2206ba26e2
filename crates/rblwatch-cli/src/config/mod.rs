//! Configuration management.
//!
//! One TOML file holds the engine settings (`[dns]`, `[cache]`,
//! `include_txt`) next to the CLI's own keys.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, Result};
use directories::ProjectDirs;
use rblwatch_engine::config::MAX_CACHE_TTL_SECS;
use rblwatch_engine::EngineConfig;
use serde::{Deserialize, Serialize};

use crate::logging::LogFormat;
use crate::output::OutputFormat;

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// JSON state file; defaults to the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_path: Option<PathBuf>,

    /// Default output format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<OutputFormat>,

    /// Log line format.
    #[serde(default)]
    pub log_format: LogFormat,

    /// Endpoint receiving alert payloads; unset logs alerts instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    /// Webhook request timeout in seconds.
    #[serde(default = "default_webhook_timeout_secs")]
    pub webhook_timeout_secs: u64,

    /// Minutes between runs in `watch` mode.
    #[serde(default = "default_schedule_interval_minutes")]
    pub schedule_interval_minutes: u64,

    /// Engine settings.
    #[serde(flatten)]
    pub engine: EngineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_path: None,
            output_format: None,
            log_format: LogFormat::default(),
            webhook_url: None,
            webhook_timeout_secs: default_webhook_timeout_secs(),
            schedule_interval_minutes: default_schedule_interval_minutes(),
            engine: EngineConfig::default(),
        }
    }
}

const fn default_webhook_timeout_secs() -> u64 {
    10
}

const fn default_schedule_interval_minutes() -> u64 {
    30
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("org", "rblwatch", "rblwatch")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

impl Config {
    /// Default config file path.
    pub fn default_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Load configuration from `path`, defaults if the file is missing.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Reject settings no command can run with.
    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        if self.schedule_interval_minutes == 0 {
            anyhow::bail!("schedule_interval_minutes must be positive");
        }
        if self.schedule_interval_minutes.saturating_mul(60) > MAX_CACHE_TTL_SECS {
            anyhow::bail!(
                "schedule_interval_minutes must be at most {}",
                MAX_CACHE_TTL_SECS / 60
            );
        }
        if self.webhook_timeout_secs == 0 {
            anyhow::bail!("webhook_timeout_secs must be positive");
        }
        Ok(())
    }

    /// Resolved state file path.
    pub fn state_path(&self) -> Result<PathBuf> {
        match &self.state_path {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join("state.json")),
        }
    }

    pub const fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook_timeout_secs)
    }

    pub const fn schedule_interval(&self) -> Duration {
        Duration::from_secs(self.schedule_interval_minutes.saturating_mul(60))
    }
}
