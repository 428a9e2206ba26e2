//! Command-line argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;

/// DNSBL checker and reputation monitor
///
/// Check addresses and domains against DNS blacklists, keep a watch list,
/// and get alerted when a listing appears or clears.
#[derive(Parser, Debug)]
#[command(name = "rblwatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, env = "RBLWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check addresses or domains right now, without touching the watch list
    Check(CheckArgs),

    /// Run one monitoring pass over the watch list
    Run(RunArgs),

    /// Run monitoring passes on a schedule until interrupted
    Watch(WatchArgs),

    /// Manage monitored targets
    Targets(TargetsArgs),

    /// Manage blacklist zones
    Zones(ZonesArgs),

    /// Show the last known status of every pair
    Status(StatusArgs),

    /// Show past monitoring runs
    History(HistoryArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),
}

// ============================================================================
// Shared probe overrides
// ============================================================================

#[derive(Args, Debug, Clone, Default)]
pub struct ProbeOverrides {
    /// Fetch TXT reasons for listings
    #[arg(long)]
    pub txt: bool,

    /// Per-probe deadline in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Maximum probes in flight
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,
}

// ============================================================================
// Check command
// ============================================================================

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// IP addresses or domains to check
    #[arg(required = true)]
    pub targets: Vec<String>,

    /// Zones to query (repeatable); defaults to the configured zones
    #[arg(short, long = "zone", value_name = "ZONE")]
    pub zones: Vec<String>,

    #[command(flatten)]
    pub overrides: ProbeOverrides,
}

// ============================================================================
// Run / watch commands
// ============================================================================

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Only check these target ids (repeatable)
    #[arg(short, long = "target", value_name = "ID")]
    pub targets: Vec<String>,

    /// Only query these zones (repeatable)
    #[arg(short, long = "zone", value_name = "ZONE")]
    pub zones: Vec<String>,

    #[command(flatten)]
    pub overrides: ProbeOverrides,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Minutes between runs (defaults to schedule_interval_minutes)
    #[arg(short, long, value_name = "MINUTES")]
    pub interval_minutes: Option<u64>,

    /// Stop after this many runs
    #[arg(long, value_name = "N")]
    pub max_runs: Option<u64>,
}

// ============================================================================
// Targets command
// ============================================================================

#[derive(Args, Debug)]
pub struct TargetsArgs {
    #[command(subcommand)]
    pub command: TargetsCommands,
}

#[derive(Subcommand, Debug)]
pub enum TargetsCommands {
    /// Add a target to the watch list
    Add {
        /// IP address or domain
        address: String,

        /// Identifier (defaults to the address)
        #[arg(long)]
        id: Option<String>,

        /// Add the target disabled
        #[arg(long)]
        disabled: bool,
    },

    /// List monitored targets
    List,

    /// Remove a target and its recorded statuses
    Remove {
        /// Target id
        id: String,
    },

    /// Include a target in monitoring runs
    Enable {
        /// Target id
        id: String,
    },

    /// Skip a target in monitoring runs
    Disable {
        /// Target id
        id: String,
    },
}

// ============================================================================
// Zones command
// ============================================================================

#[derive(Args, Debug)]
pub struct ZonesArgs {
    #[command(subcommand)]
    pub command: ZonesCommands,
}

#[derive(Subcommand, Debug)]
pub enum ZonesCommands {
    /// Add a zone
    Add {
        /// Zone suffix (e.g. bl.spamcop.net)
        name: String,

        /// Treat 127.255.255.x answers as "query limit reached"
        #[arg(long)]
        spamhaus: bool,
    },

    /// List configured zones
    List,

    /// Remove a zone and its recorded statuses
    Remove {
        /// Zone name
        name: String,
    },

    /// Install the built-in zone catalog
    Defaults,
}

// ============================================================================
// Status / history commands
// ============================================================================

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Include pairs that are not listed
    #[arg(short, long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Number of runs to show, newest first
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
}

// ============================================================================
// Config command
// ============================================================================

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Show the config file path
    Path,

    /// Write a config file with default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
