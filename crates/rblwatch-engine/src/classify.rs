//! Resolution-to-status classification.
//!
//! Pure mapping, no I/O. Spamhaus answers inside `127.255.255.0/24` are
//! query-limit sentinels, not listings.

use std::net::Ipv4Addr;

use rblwatch_core::{ProbeStatus, Zone};

use crate::resolver::Resolution;

/// Reason attached to Spamhaus sentinel answers.
pub const BLOCKED_REASON: &str = "query limit reached";

/// Classified status plus the matched records and a failure reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub status: ProbeStatus,
    pub addresses: Vec<String>,
    pub reason: Option<String>,
}

/// Returns true if `address` lies in `127.255.255.0/24`.
#[must_use]
pub fn is_blocked_sentinel(address: &str) -> bool {
    address
        .parse::<Ipv4Addr>()
        .is_ok_and(|ip| matches!(ip.octets(), [127, 255, 255, _]))
}

/// Classify the A-record resolution of one (target, zone) pair.
#[must_use]
pub fn classify(zone: &Zone, resolution: &Resolution) -> Classification {
    match resolution {
        Resolution::Records(records) if records.is_empty() => Classification {
            status: ProbeStatus::NotListed,
            addresses: Vec::new(),
            reason: None,
        },
        Resolution::Records(records) => {
            let blocked = zone.is_spamhaus && records.iter().all(|r| is_blocked_sentinel(r));
            Classification {
                status: if blocked {
                    ProbeStatus::Blocked
                } else {
                    ProbeStatus::Listed
                },
                addresses: records.clone(),
                reason: blocked.then(|| BLOCKED_REASON.to_string()),
            }
        }
        Resolution::NoRecord => Classification {
            status: ProbeStatus::NotListed,
            addresses: Vec::new(),
            reason: None,
        },
        Resolution::Failure(reason) => Classification {
            status: ProbeStatus::Error,
            addresses: Vec::new(),
            reason: Some(reason.clone()),
        },
    }
}
