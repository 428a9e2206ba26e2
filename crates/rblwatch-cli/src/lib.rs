//! # rblwatch-cli
//!
//! Command-line front end of the rblwatch engine.
//!
//! ## Features
//!
//! - **Ad-hoc checks**: any IPs or domains against any zones, with TXT reasons
//! - **Monitoring runs**: stored targets and zones, diffed against the last run
//! - **Watch mode**: periodic runs at the configured interval
//! - **Webhook alerts**: one JSON POST per run with new listings and blocks
//! - **Multiple output formats**: Pretty tables, JSON, CSV

pub mod cli;
pub mod config;
pub mod logging;
pub mod output;
pub mod state;

pub use cli::run;
