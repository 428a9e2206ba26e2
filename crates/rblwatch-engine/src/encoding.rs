//! DNSBL query-name encoding.
//!
//! Standard DNSBL pattern: reverse the address and query under the zone.
//! Example: checking 1.2.3.4 against `zen.spamhaus.org` queries
//! `4.3.2.1.zen.spamhaus.org.`
//!
//! - IPv4: reversed octets
//! - IPv6: reversed nibbles (32 labels)
//! - Domains: appended unchanged (`example.com.dbl.spamhaus.org.`)
//!
//! Names are fully qualified so resolver search domains never apply.

use std::fmt::Write;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Reverse an IPv4 address for DNSBL lookup.
///
/// Converts `1.2.3.4` into `4.3.2.1` (without zone suffix).
#[must_use]
pub fn reverse_ipv4(ip: &Ipv4Addr) -> String {
    let octets = ip.octets();
    format!("{}.{}.{}.{}", octets[3], octets[2], octets[1], octets[0])
}

/// Reverse an IPv6 address nibble by nibble.
///
/// `2001:db8::1` becomes `1.0.0.0. ... .8.b.d.0.1.0.0.2`.
#[must_use]
pub fn reverse_ipv6(ip: &Ipv6Addr) -> String {
    let mut out = String::with_capacity(63);
    for byte in ip.octets().iter().rev() {
        if !out.is_empty() {
            out.push('.');
        }
        let _ = write!(out, "{:x}.{:x}", byte & 0x0f, byte >> 4);
    }
    out
}

/// Build the fully-qualified query name for a target under a zone.
#[must_use]
pub fn query_name(target: &str, zone: &str) -> String {
    let zone = zone.trim_end_matches('.');
    let prefix = match target.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => reverse_ipv4(&v4),
        Ok(IpAddr::V6(v6)) => reverse_ipv6(&v6),
        Err(_) => target.trim_end_matches('.').to_ascii_lowercase(),
    };
    format!("{prefix}.{zone}.")
}
