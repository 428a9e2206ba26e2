//! Core types for DNSBL reputation monitoring.
//!
//! This crate provides the foundational types shared by the rblwatch crates:
//!
//! - **Types**: targets, zones, probe outcomes, run records and alerts
//! - **Catalog**: the default public DNSBL zone list and Spamhaus zones
//! - **Errors**: the [`RblError`] taxonomy and [`Result`] alias
//!
//! # Example
//!
//! ```rust
//! use rblwatch_core::{ProbeStatus, Target, TargetKind, Zone};
//!
//! let target = Target::new("1.2.3.4").unwrap();
//! assert_eq!(target.kind, TargetKind::Ip);
//!
//! let zone = Zone::new("zen.spamhaus.org").unwrap();
//! assert!(zone.is_spamhaus);
//! assert!(ProbeStatus::Listed.is_issue());
//! ```

#![doc(html_root_url = "https://docs.rs/rblwatch-core/0.3.0")]

mod error;
pub mod types;

pub use error::{RblError, Result};
pub use types::*;
