use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{RblError, Result};

/// What started a monitoring run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunTrigger {
    /// Requested by an operator
    #[default]
    Manual,
    /// Started by the periodic timer
    Scheduler,
}

impl fmt::Display for RunTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Scheduler => write!(f, "scheduler"),
        }
    }
}

/// Lifecycle state of a run: `pending -> running -> {completed, failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Created, not started
    Pending,
    /// Probing in progress
    Running,
    /// Every pair accounted for and results saved
    Completed,
    /// Aborted by a configuration or storage failure
    Failed,
}

impl RunStatus {
    /// Completed and failed runs are immutable
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Aggregated counts of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    /// Targets in the snapshot
    pub targets: usize,
    /// Zones in the snapshot
    pub zones: usize,
    /// (target, zone) pairs probed
    pub checks: usize,
    /// Pairs classified `Listed`
    pub listed: usize,
    /// Pairs classified `Blocked`
    pub blocked: usize,
    /// Pairs classified `Error`
    pub errored: usize,
}

/// Record of one monitoring run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Run identifier
    pub id: u64,

    /// Manual or scheduler
    pub trigger: RunTrigger,

    /// Lifecycle state
    pub status: RunStatus,

    /// Final counts (zero unless completed)
    #[serde(default)]
    pub counts: RunCounts,

    /// When the run entered `running`
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,

    /// When the run was finalized
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,

    /// Failure description for failed runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunRecord {
    /// A new run in `pending` state
    #[must_use]
    pub const fn pending(id: u64, trigger: RunTrigger) -> Self {
        Self {
            id,
            trigger,
            status: RunStatus::Pending,
            counts: RunCounts {
                targets: 0,
                zones: 0,
                checks: 0,
                listed: 0,
                blocked: 0,
                errored: 0,
            },
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    /// `pending -> running`, stamping the start time
    pub fn begin(&mut self) -> Result<()> {
        if self.status != RunStatus::Pending {
            return Err(self.finalized_error());
        }
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// `running -> completed` with final counts
    pub fn complete(&mut self, counts: RunCounts) -> Result<()> {
        if self.status != RunStatus::Running {
            return Err(self.finalized_error());
        }
        self.status = RunStatus::Completed;
        self.counts = counts;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// `pending | running -> failed`; counts are reset to zero
    pub fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        if self.status.is_terminal() {
            return Err(self.finalized_error());
        }
        let now = Utc::now();
        self.status = RunStatus::Failed;
        self.counts = RunCounts::default();
        self.started_at.get_or_insert(now);
        self.finished_at = Some(now);
        self.error = Some(message.into());
        Ok(())
    }

    /// Wall-clock duration, once finalized
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.finished_at? - self.started_at?)
    }

    /// Duration in fractional seconds, once finalized
    #[must_use]
    pub fn duration_secs(&self) -> Option<f64> {
        self.duration()
            .and_then(|d| d.to_std().ok())
            .map(|d| d.as_secs_f64())
    }

    fn finalized_error(&self) -> RblError {
        RblError::RunFinalized {
            id: self.id,
            status: self.status.to_string(),
        }
    }
}
