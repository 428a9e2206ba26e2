//! rblwatch-engine: concurrent DNSBL checking and monitoring.
//!
//! # Architecture
//!
//! - [`ZoneRateLimiter`] - per-zone token buckets, continuous refill
//! - [`ResultCache`] - shared TTL + LRU cache of classified outcomes
//! - [`classify`] - maps a raw resolution onto a [`ProbeStatus`](rblwatch_core::ProbeStatus),
//!   treating Spamhaus `127.255.255.0/24` answers as *blocked*
//! - [`ZoneProber`] - one (target, zone) check: cache, limiter, DNS, classifier
//! - [`BatchChecker`] - target × zone fan-out under a global concurrency ceiling
//! - [`Monitor`] - monitoring runs: snapshot, probe, save, diff, alert
//!
//! Storage, alert delivery, metrics and DNS resolution are collaborator
//! traits ([`Storage`], [`Notifier`], [`MetricsSink`], [`DnsLookup`]), so the
//! engine carries no persistence or transport of its own beyond the hickory
//! resolver.
//!
//! # Example
//!
//! ```no_run
//! use rblwatch_core::{Target, Zone};
//! use rblwatch_engine::{BatchChecker, CheckOptions, EngineConfig, ZoneProber};
//!
//! # async fn demo() -> rblwatch_core::Result<()> {
//! let config = EngineConfig::default();
//! let checker = BatchChecker::new(ZoneProber::from_config(&config)?);
//!
//! let targets = vec![Target::new("192.0.2.1")?];
//! let zones = vec![Zone::new("zen.spamhaus.org")?, Zone::new("bl.spamcop.net")?];
//! let report = checker
//!     .check_batch(&targets, &zones, CheckOptions::from(&config))
//!     .await?;
//!
//! for result in &report.results {
//!     println!("{}: {} listings", result.target, result.listed.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod cache;
pub mod classify;
pub mod config;
pub mod encoding;
pub mod metrics;
pub mod monitor;
pub mod notify;
pub mod prober;
pub mod ratelimit;
pub mod resolver;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience.
pub use batch::{BatchChecker, BatchReport, CheckSummary, TargetReport, ZoneError, ZoneHit};
pub use cache::{CacheKey, CacheStats, ResultCache};
pub use classify::{classify, Classification};
pub use config::{CacheConfig, CheckOptions, DnsConfig, EngineConfig};
pub use metrics::{Counter, EngineMetrics, MetricsSink, MetricsSnapshot, NoopMetrics};
pub use monitor::{Monitor, RunReport, RunRequest};
pub use notify::{LogNotifier, Notifier};
pub use prober::ZoneProber;
pub use ratelimit::{ZonePermit, ZoneRateLimiter};
pub use resolver::{DnsLookup, HickoryLookup, Resolution};
pub use storage::{MemoryStorage, Storage, StatusMap};
