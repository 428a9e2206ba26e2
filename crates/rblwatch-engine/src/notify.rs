//! Alert delivery collaborator.

use async_trait::async_trait;
use rblwatch_core::{Alert, AlertKind, RblError, Result, RunRecord};
use tracing::{info, warn};

/// Delivers status-transition alerts.
///
/// Delivery is fire-and-forget from the orchestrator's side: a failure is
/// logged and never fails the run, and nothing is retried.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one alert
    async fn notify(&self, alert: &Alert) -> Result<()>;

    /// Deliver every alert of a completed run.
    ///
    /// The default calls [`Notifier::notify`] once per alert and keeps going
    /// after a failure.
    async fn notify_run(&self, run: &RunRecord, alerts: &[Alert]) -> Result<()> {
        let mut failed = 0usize;
        for alert in alerts {
            if let Err(e) = self.notify(alert).await {
                warn!(run_id = run.id, target = %alert.target, zone = %alert.zone, error = %e, "alert delivery failed");
                failed += 1;
            }
        }
        if failed > 0 {
            return Err(RblError::Notify(format!(
                "{failed} of {} alerts not delivered",
                alerts.len()
            )));
        }
        Ok(())
    }
}

/// Writes alerts to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, alert: &Alert) -> Result<()> {
        match alert.kind {
            AlertKind::Listed | AlertKind::Blocked => {
                warn!(target = %alert.target, zone = %alert.zone, kind = ?alert.kind, "{}", alert.message);
            }
            AlertKind::Delisted | AlertKind::Unblocked => {
                info!(target = %alert.target, zone = %alert.zone, kind = ?alert.kind, "{}", alert.message);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingNotifier;
    use chrono::Utc;
    use rblwatch_core::{ProbeStatus, RunTrigger};

    fn alert(target: &str) -> Alert {
        Alert::from_transition(target, "bl.spamcop.net", None, ProbeStatus::Listed, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_log_notifier_accepts_everything() {
        let run = RunRecord::pending(1, RunTrigger::Manual);
        assert!(LogNotifier.notify_run(&run, &[alert("192.0.2.1")]).await.is_ok());
    }

    #[tokio::test]
    async fn test_default_batch_keeps_going() {
        let notifier = RecordingNotifier::failing_for("192.0.2.1");
        let run = RunRecord::pending(1, RunTrigger::Manual);
        let result = notifier
            .notify_run(&run, &[alert("192.0.2.1"), alert("192.0.2.2")])
            .await;

        assert!(matches!(result, Err(RblError::Notify(_))));
        let delivered = notifier.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].target, "192.0.2.2");
    }
}
