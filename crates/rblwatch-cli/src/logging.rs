//! Tracing subscriber setup.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log line format.
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Directive used when `RUST_LOG` is unset.
#[must_use]
pub const fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "rblwatch=debug,rblwatch_engine=debug,rblwatch_webhook=debug,rblwatch_cli=debug"
    } else {
        "rblwatch=info,rblwatch_engine=info,rblwatch_webhook=info,rblwatch_cli=info"
    }
}

/// Install the global subscriber. Logs go to stderr; stdout carries command output.
pub fn init(verbose: bool, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    let registry = tracing_subscriber::registry().with(filter);

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
}
