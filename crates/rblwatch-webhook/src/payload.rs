//! JSON body posted to the webhook endpoint.

use chrono::{DateTime, Utc};
use rblwatch_core::{Alert, AlertKind, ProbeStatus, RunRecord, RunTrigger};
use serde::Serialize;

/// Run-level counts included with every batched delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub checks: usize,
    pub listed_count: usize,
    pub blocked_count: usize,
    pub error_count: usize,
}

/// One alert as sent over the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertPayload {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub target: String,
    pub zone: String,
    pub old_status: Option<ProbeStatus>,
    pub new_status: ProbeStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Alert> for AlertPayload {
    fn from(alert: &Alert) -> Self {
        Self {
            kind: alert.kind,
            target: alert.target.clone(),
            zone: alert.zone.clone(),
            old_status: alert.old_status,
            new_status: alert.new_status,
            message: alert.message.clone(),
            created_at: alert.at,
        }
    }
}

/// Webhook request body.
///
/// Run fields are omitted when a single alert is delivered on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<RunTrigger>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
    pub alerts: Vec<AlertPayload>,
}

impl WebhookPayload {
    /// Body for every alert of a run
    #[must_use]
    pub fn for_run(run: &RunRecord, alerts: &[Alert]) -> Self {
        Self {
            run_id: Some(run.id),
            triggered_by: Some(run.trigger),
            started_at: run.started_at,
            summary: Some(RunSummary {
                checks: run.counts.checks,
                listed_count: run.counts.listed,
                blocked_count: run.counts.blocked,
                error_count: run.counts.errored,
            }),
            alerts: alerts.iter().map(AlertPayload::from).collect(),
        }
    }

    /// Body for a lone alert
    #[must_use]
    pub fn single(alert: &Alert) -> Self {
        Self {
            run_id: None,
            triggered_by: None,
            started_at: None,
            summary: None,
            alerts: vec![AlertPayload::from(alert)],
        }
    }
}
