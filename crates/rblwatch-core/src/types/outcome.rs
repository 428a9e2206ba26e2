use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::RblError;

/// Classified result of checking one target against one zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    /// The target is on the zone's blacklist
    Listed,
    /// The zone has no record for the target
    NotListed,
    /// The lookup failed (timeout, transport, server failure)
    Error,
    /// The zone operator refused to answer (Spamhaus limit sentinel)
    Blocked,
}

impl ProbeStatus {
    /// All statuses, in display order
    pub const ALL: [Self; 4] = [Self::Listed, Self::Blocked, Self::Error, Self::NotListed];

    /// Statuses that raise an alert when entered or left
    #[must_use]
    pub const fn is_alerting(self) -> bool {
        matches!(self, Self::Listed | Self::Blocked)
    }

    /// Statuses worth showing as an issue (anything but `NotListed`)
    #[must_use]
    pub const fn is_issue(self) -> bool {
        !matches!(self, Self::NotListed)
    }

    /// Lowercase wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Listed => "listed",
            Self::NotListed => "not_listed",
            Self::Error => "error",
            Self::Blocked => "blocked",
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProbeStatus {
    type Err = RblError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "listed" => Ok(Self::Listed),
            "not_listed" | "notlisted" | "clean" => Ok(Self::NotListed),
            "error" => Ok(Self::Error),
            "blocked" => Ok(Self::Blocked),
            other => Err(RblError::Config(format!("unknown status '{other}'"))),
        }
    }
}

/// DNS record kind a probe asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// Address record: presence means listed
    A,
    /// Text record: listing reason, best-effort
    #[serde(rename = "TXT")]
    Txt,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::Txt => write!(f, "TXT"),
        }
    }
}

/// Outcome of one (target, zone) probe. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// Target address that was checked
    pub target: String,

    /// Zone it was checked against
    pub zone: String,

    /// Classified status
    pub status: ProbeStatus,

    /// Address records returned, in answer order
    #[serde(default)]
    pub addresses: Vec<String>,

    /// TXT strings, present only when fetched successfully
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txt: Option<Vec<String>>,

    /// Human-readable failure reason for `Error` and `Blocked`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ProbeOutcome {
    /// Create an outcome without TXT data
    pub fn new(
        target: impl Into<String>,
        zone: impl Into<String>,
        status: ProbeStatus,
        addresses: Vec<String>,
        reason: Option<String>,
    ) -> Self {
        Self {
            target: target.into(),
            zone: zone.into(),
            status,
            addresses,
            txt: None,
            reason,
        }
    }

    /// An `Error` outcome carrying `reason`
    pub fn error(target: impl Into<String>, zone: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(target, zone, ProbeStatus::Error, Vec::new(), Some(reason.into()))
    }

    /// A copy of this outcome with TXT strings attached
    #[must_use]
    pub fn with_txt(&self, txt: Vec<String>) -> Self {
        Self {
            txt: Some(txt),
            ..self.clone()
        }
    }
}
