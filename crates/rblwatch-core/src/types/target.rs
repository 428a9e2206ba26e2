use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

use crate::{RblError, Result};

/// Longest target string accepted (DNS name limit)
pub const MAX_TARGET_LEN: usize = 255;

/// Kind of monitored target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// IPv4 or IPv6 address, queried reversed under the zone
    Ip,
    /// Domain name, queried as-is under the zone
    Domain,
}

impl TargetKind {
    /// Classify a target string: anything that parses as an IP is `Ip`
    #[must_use]
    pub fn detect(address: &str) -> Self {
        if address.parse::<IpAddr>().is_ok() {
            Self::Ip
        } else {
            Self::Domain
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip => write!(f, "ip"),
            Self::Domain => write!(f, "domain"),
        }
    }
}

/// A monitored address or domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Storage identifier
    pub id: String,

    /// Address or domain string that is looked up
    pub address: String,

    /// IP or domain
    pub kind: TargetKind,

    /// Disabled targets are skipped by monitoring runs
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

impl Target {
    /// Create an enabled target whose id is its address
    pub fn new(address: impl Into<String>) -> Result<Self> {
        let address = address.into();
        Self::with_id(address.clone(), address)
    }

    /// Create an enabled target with an explicit storage id
    pub fn with_id(id: impl Into<String>, address: impl Into<String>) -> Result<Self> {
        let address = address.into().trim().to_string();
        if address.is_empty() {
            return Err(RblError::InvalidTarget("empty target".into()));
        }
        if address.len() > MAX_TARGET_LEN {
            return Err(RblError::InvalidTarget(format!(
                "target too long ({} > {MAX_TARGET_LEN} characters)",
                address.len()
            )));
        }
        let kind = TargetKind::detect(&address);
        Ok(Self {
            id: id.into(),
            address,
            kind,
            enabled: true,
        })
    }

    /// Set the enabled flag
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}
