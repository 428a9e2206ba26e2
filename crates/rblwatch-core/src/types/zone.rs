use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{RblError, Result};

/// Spamhaus zones whose `127.255.255.0/24` answers mean "query limit reached"
pub const SPAMHAUS_ZONES: [&str; 4] = [
    "zen.spamhaus.org",
    "sbl.spamhaus.org",
    "xbl.spamhaus.org",
    "pbl.spamhaus.org",
];

/// Public DNSBL zones checked when no zone set is configured
pub const DEFAULT_ZONES: [&str; 55] = [
    "all.s5h.net",
    "b.barracudacentral.org",
    "bl.spamcop.net",
    "blacklist.woody.ch",
    "bogons.cymru.com",
    "cbl.abuseat.org",
    "cdl.anti-spam.org.cn",
    "combined.abuse.ch",
    "db.wpbl.info",
    "dnsbl-1.uceprotect.net",
    "dnsbl-2.uceprotect.net",
    "dnsbl-3.uceprotect.net",
    "dnsbl.anticaptcha.net",
    "dnsbl.dronebl.org",
    "dnsbl.inps.de",
    "dnsbl.sorbs.net",
    "dnsbl.spfbl.net",
    "drone.abuse.ch",
    "duinv.aupads.org",
    "dul.dnsbl.sorbs.net",
    "dyna.spamrats.com",
    "dynip.rothen.com",
    "http.dnsbl.sorbs.net",
    "ips.backscatterer.org",
    "ix.dnsbl.manitu.net",
    "korea.services.net",
    "misc.dnsbl.sorbs.net",
    "noptr.spamrats.com",
    "orvedb.aupads.org",
    "pbl.spamhaus.org",
    "proxy.bl.gweep.ca",
    "psbl.surriel.com",
    "relays.bl.gweep.ca",
    "relays.nether.net",
    "sbl.spamhaus.org",
    "short.rbl.jp",
    "singular.ttk.pte.hu",
    "smtp.dnsbl.sorbs.net",
    "socks.dnsbl.sorbs.net",
    "spam.abuse.ch",
    "spam.dnsbl.anonmails.de",
    "spam.dnsbl.sorbs.net",
    "spam.spamrats.com",
    "spambot.bls.digibase.ca",
    "spamrbl.imp.ch",
    "spamsources.fabel.dk",
    "ubl.lashback.com",
    "ubl.unsubscore.com",
    "virus.rbl.jp",
    "web.dnsbl.sorbs.net",
    "wormrbl.imp.ch",
    "xbl.spamhaus.org",
    "z.mailspike.net",
    "zen.spamhaus.org",
    "zombie.dnsbl.sorbs.net",
];

/// A DNSBL zone (the provider's domain suffix)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Zone {
    /// Zone suffix, lowercase, without trailing dot
    pub name: String,

    /// Spamhaus zones get BLOCKED classification for limit sentinels
    #[serde(default)]
    pub is_spamhaus: bool,

    /// Disabled zones are skipped by monitoring runs
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

impl Zone {
    /// Create an enabled zone, deriving `is_spamhaus` from its name
    pub fn new(name: impl AsRef<str>) -> Result<Self> {
        let name = normalize(name.as_ref())?;
        let is_spamhaus = is_spamhaus_zone(&name);
        Ok(Self {
            name,
            is_spamhaus,
            enabled: true,
        })
    }

    /// Override the Spamhaus flag
    #[must_use]
    pub const fn spamhaus(mut self, is_spamhaus: bool) -> Self {
        self.is_spamhaus = is_spamhaus;
        self
    }

    /// Set the enabled flag
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// The built-in zone catalog
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        DEFAULT_ZONES
            .iter()
            .filter_map(|name| Self::new(name).ok())
            .collect()
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Returns true for the known Spamhaus zones and any `*.spamhaus.org` suffix
#[must_use]
pub fn is_spamhaus_zone(name: &str) -> bool {
    SPAMHAUS_ZONES.contains(&name) || name.ends_with(".spamhaus.org")
}

fn normalize(name: &str) -> Result<String> {
    let name = name.trim().trim_end_matches('.').to_ascii_lowercase();
    if name.is_empty() {
        return Err(RblError::InvalidZone("empty zone".into()));
    }
    if name.len() > 253 || name.split('.').any(|label| label.is_empty() || label.len() > 63) {
        return Err(RblError::InvalidZone(format!("malformed zone name '{name}'")));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spamhaus_detection() {
        assert!(Zone::new("zen.spamhaus.org").unwrap().is_spamhaus);
        assert!(Zone::new("ZEN.Spamhaus.org.").unwrap().is_spamhaus);
        assert!(Zone::new("dbl.spamhaus.org").unwrap().is_spamhaus);
        assert!(!Zone::new("bl.spamcop.net").unwrap().is_spamhaus);
    }

    #[test]
    fn test_normalize() {
        let zone = Zone::new("  BL.SpamCop.NET. ").unwrap();
        assert_eq!(zone.name, "bl.spamcop.net");
        assert!(Zone::new("").is_err());
        assert!(Zone::new("bad..zone").is_err());
    }

    #[test]
    fn test_default_catalog() {
        let zones = Zone::defaults();
        assert_eq!(zones.len(), DEFAULT_ZONES.len());
        let spamhaus = zones.iter().filter(|z| z.is_spamhaus).count();
        assert_eq!(spamhaus, SPAMHAUS_ZONES.len());
    }
}
