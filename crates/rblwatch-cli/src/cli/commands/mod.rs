//! Command implementations.

pub mod check;
pub mod config;
pub mod history;
pub mod run;
pub mod status;
pub mod targets;
pub mod zones;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rblwatch_engine::{BatchChecker, CheckOptions, EngineMetrics, LogNotifier, Monitor, Notifier, ZoneProber};
use rblwatch_webhook::WebhookNotifier;

use crate::cli::args::ProbeOverrides;
use crate::config::Config;
use crate::output::OutputFormat;
use crate::state::FileStorage;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Loaded configuration
    pub config: Config,

    /// Where the configuration was read from
    pub config_path: PathBuf,

    /// Output format
    pub output_format: OutputFormat,

    /// Verbose output
    pub verbose: bool,

    /// Disable colors
    pub no_color: bool,
}

impl Context {
    /// Open the state file named by the configuration.
    pub fn storage(&self) -> Result<FileStorage> {
        Ok(FileStorage::new(self.config.state_path()?))
    }

    /// Batch checker built from the engine settings.
    pub fn checker(&self) -> Result<BatchChecker> {
        Ok(BatchChecker::new(ZoneProber::from_config(&self.config.engine)?))
    }

    /// Engine options with command-line overrides applied.
    pub fn check_options(&self, overrides: &ProbeOverrides) -> CheckOptions {
        let mut options = CheckOptions::from(&self.config.engine);
        if overrides.txt {
            options = options.include_txt(true);
        }
        if let Some(ms) = overrides.timeout_ms {
            options = options.probe_timeout(Duration::from_millis(ms));
        }
        if let Some(n) = overrides.concurrency {
            options = options.concurrency(n);
        }
        options
    }

    /// Webhook notifier when a URL is configured, log lines otherwise.
    pub fn notifier(&self) -> Result<Arc<dyn Notifier>> {
        match &self.config.webhook_url {
            Some(url) => Ok(Arc::new(
                WebhookNotifier::builder(url)
                    .timeout(self.config.webhook_timeout())
                    .build()?,
            )),
            None => Ok(Arc::new(LogNotifier)),
        }
    }

    /// Monitor over `storage`, numbering runs after the last recorded one.
    pub async fn monitor(&self, storage: Arc<FileStorage>, metrics: Arc<EngineMetrics>) -> Result<Monitor> {
        let last_run_id = storage.load().await?.last_run_id();
        Ok(Monitor::new(self.checker()?, storage)
            .with_notifier(self.notifier()?)
            .with_metrics(metrics)
            .with_options(CheckOptions::from(&self.config.engine))
            .with_first_run_id(last_run_id + 1))
    }
}
