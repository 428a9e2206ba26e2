use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ProbeStatus;

/// What an alert reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Target appeared on a zone
    Listed,
    /// Zone operator started refusing queries
    Blocked,
    /// Target left a zone it was listed on
    Delisted,
    /// Zone answers again after a block
    Unblocked,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listed => write!(f, "listed"),
            Self::Blocked => write!(f, "blocked"),
            Self::Delisted => write!(f, "delisted"),
            Self::Unblocked => write!(f, "unblocked"),
        }
    }
}

/// A status transition of one (target, zone) pair between two runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Target address
    pub target: String,

    /// Zone name
    pub zone: String,

    /// Status recorded by the previous run, if any
    pub old_status: Option<ProbeStatus>,

    /// Status of the current run
    pub new_status: ProbeStatus,

    /// Transition category
    pub kind: AlertKind,

    /// Human-readable summary
    pub message: String,

    /// When the transition was detected
    pub at: DateTime<Utc>,
}

impl Alert {
    /// Build an alert for a transition, or `None` when it is not alert-worthy.
    ///
    /// A transition alerts when the status changed and either side is
    /// `Listed` or `Blocked`. A pair without history counts as changed.
    #[must_use]
    pub fn from_transition(
        target: &str,
        zone: &str,
        old_status: Option<ProbeStatus>,
        new_status: ProbeStatus,
        at: DateTime<Utc>,
    ) -> Option<Self> {
        if old_status == Some(new_status) {
            return None;
        }
        let left_alerting = old_status.is_some_and(ProbeStatus::is_alerting);
        if !new_status.is_alerting() && !left_alerting {
            return None;
        }

        let kind = match (old_status, new_status) {
            (_, ProbeStatus::Listed) => AlertKind::Listed,
            (_, ProbeStatus::Blocked) => AlertKind::Blocked,
            (Some(ProbeStatus::Blocked), _) => AlertKind::Unblocked,
            _ => AlertKind::Delisted,
        };

        let message = match kind {
            AlertKind::Listed => format!("Target {target} is now listed on {zone}"),
            AlertKind::Blocked => {
                format!("Target {target} is blocked on {zone} (query limits reached)")
            }
            AlertKind::Delisted => {
                format!("Target {target} is no longer listed on {zone} (now {new_status})")
            }
            AlertKind::Unblocked => {
                format!("Queries for {target} on {zone} are no longer blocked (now {new_status})")
            }
        };

        Some(Self {
            target: target.to_string(),
            zone: zone.to_string(),
            old_status,
            new_status,
            kind,
            message,
            at,
        })
    }
}
