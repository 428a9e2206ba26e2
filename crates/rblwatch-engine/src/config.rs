//! Engine configuration.
//!
//! [`EngineConfig`] holds process-wide settings (usually loaded once from a
//! TOML file). [`CheckOptions`] is the immutable per-invocation value derived
//! from it, with per-call overrides applied at the call boundary.

use rblwatch_core::{RblError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Default DNS port for nameservers given without one.
const DNS_PORT: u16 = 53;

/// Longest accepted cache lifetime (one year).
pub const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Largest in-flight ceiling a batch can hold permits for.
pub const MAX_CONCURRENCY: usize = tokio::sync::Semaphore::MAX_PERMITS;

/// Process-wide engine settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Resolution, concurrency and rate settings.
    #[serde(default)]
    pub dns: DnsConfig,

    /// Result cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Fetch TXT records for listed outcomes by default.
    #[serde(default)]
    pub include_txt: bool,
}

/// DNS querying settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Per-probe deadline in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Upstream nameservers (`ip` or `ip:port`); empty uses the system resolver.
    #[serde(default)]
    pub nameservers: Vec<String>,

    /// Attempts the resolver makes per query before giving up.
    #[serde(default = "default_attempts")]
    pub attempts: usize,

    /// Maximum probes in flight per batch.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Queries per second admitted per zone.
    #[serde(default = "default_per_zone_rate")]
    pub per_zone_rate: u32,

    /// Per-zone overrides of `per_zone_rate`.
    #[serde(default)]
    pub zone_rates: HashMap<String, u32>,
}

/// Result cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of a cached outcome in seconds.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum number of cached outcomes.
    #[serde(default = "default_max_size")]
    pub max_size: usize,

    /// Shorter lifetime for `Error` outcomes; unset caches them like the rest.
    #[serde(default)]
    pub error_ttl_secs: Option<u64>,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            nameservers: Vec::new(),
            attempts: default_attempts(),
            concurrency: default_concurrency(),
            per_zone_rate: default_per_zone_rate(),
            zone_rates: HashMap::new(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_size: default_max_size(),
            error_ttl_secs: None,
        }
    }
}

impl EngineConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self =
                toml::from_str(&content).map_err(|e| RblError::Config(e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.dns.timeout_ms == 0 {
            return Err(RblError::Config("dns.timeout_ms must be positive".into()));
        }
        if self.dns.concurrency == 0 {
            return Err(RblError::Config("dns.concurrency must be positive".into()));
        }
        if self.dns.concurrency > MAX_CONCURRENCY {
            return Err(RblError::Config(format!(
                "dns.concurrency must be at most {MAX_CONCURRENCY}"
            )));
        }
        if self.dns.attempts == 0 {
            return Err(RblError::Config("dns.attempts must be positive".into()));
        }
        if self.dns.per_zone_rate == 0 {
            return Err(RblError::Config("dns.per_zone_rate must be positive".into()));
        }
        if let Some((zone, _)) = self.dns.zone_rates.iter().find(|(_, rate)| **rate == 0) {
            return Err(RblError::Config(format!("rate for zone '{zone}' must be positive")));
        }
        if self.cache.max_size == 0 {
            return Err(RblError::Config("cache.max_size must be positive".into()));
        }
        if self.cache.ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(RblError::Config(format!(
                "cache.ttl_secs must be at most {MAX_CACHE_TTL_SECS}"
            )));
        }
        if self.cache.error_ttl_secs.is_some_and(|secs| secs > MAX_CACHE_TTL_SECS) {
            return Err(RblError::Config(format!(
                "cache.error_ttl_secs must be at most {MAX_CACHE_TTL_SECS}"
            )));
        }
        self.dns.socket_addrs()?;
        Ok(())
    }

    /// Per-probe deadline.
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.dns.timeout_ms)
    }
}

impl DnsConfig {
    /// Parse `nameservers` into socket addresses, defaulting to port 53.
    pub fn socket_addrs(&self) -> Result<Vec<SocketAddr>> {
        self.nameservers
            .iter()
            .map(|raw| {
                raw.parse::<SocketAddr>()
                    .or_else(|_| raw.parse::<IpAddr>().map(|ip| SocketAddr::new(ip, DNS_PORT)))
                    .map_err(|_| RblError::Config(format!("invalid nameserver '{raw}'")))
            })
            .collect()
    }

    /// Rate for a zone, honouring overrides.
    #[must_use]
    pub fn rate_for(&self, zone: &str) -> u32 {
        self.zone_rates.get(zone).copied().unwrap_or(self.per_zone_rate)
    }
}

impl CacheConfig {
    /// Cache lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Lifetime for `Error` outcomes.
    #[must_use]
    pub fn error_ttl(&self) -> Duration {
        self.error_ttl_secs.map_or_else(|| self.ttl(), Duration::from_secs)
    }
}

/// Immutable settings for one batch or run invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    /// Fetch TXT records for listed outcomes.
    pub include_txt: bool,
    /// Deadline of each individual probe.
    pub probe_timeout: Duration,
    /// Maximum probes in flight.
    pub concurrency: usize,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for CheckOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            include_txt: config.include_txt,
            probe_timeout: config.probe_timeout(),
            concurrency: config.dns.concurrency,
        }
    }
}

impl CheckOptions {
    /// Override TXT fetching.
    #[must_use]
    pub const fn include_txt(mut self, include_txt: bool) -> Self {
        self.include_txt = include_txt;
        self
    }

    /// Override the per-probe deadline.
    #[must_use]
    pub const fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Override the in-flight ceiling.
    #[must_use]
    pub const fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Reject options a batch cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(RblError::Config("concurrency must be positive".into()));
        }
        if self.concurrency > MAX_CONCURRENCY {
            return Err(RblError::Config(format!("concurrency must be at most {MAX_CONCURRENCY}")));
        }
        if self.probe_timeout.is_zero() {
            return Err(RblError::Config("probe timeout must be positive".into()));
        }
        Ok(())
    }
}

// Default value functions for serde.
const fn default_timeout_ms() -> u64 {
    2500
}

const fn default_attempts() -> usize {
    2
}

const fn default_concurrency() -> usize {
    50
}

const fn default_per_zone_rate() -> u32 {
    10
}

const fn default_ttl_secs() -> u64 {
    3600
}

const fn default_max_size() -> usize {
    10_000
}
