//! Monitoring orchestrator.
//!
//! A run moves `pending -> running -> {completed, failed}`. It snapshots the
//! enabled targets and zones, probes every pair, saves the outcomes, diffs
//! them against the previously recorded statuses and hands the resulting
//! alerts to the notifier.
//!
//! Runs are independent: several may execute at once against the same
//! cache and limiter, each with its own snapshot. Scheduling lives outside
//! the engine; callers invoke [`Monitor::run_once`].

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rblwatch_core::{
    Alert, ProbeStatus, RblError, Result, RunCounts, RunRecord, RunTrigger, Target, Zone,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::batch::{BatchChecker, BatchReport};
use crate::config::CheckOptions;
use crate::metrics::{Counter, MetricsSink, NoopMetrics};
use crate::notify::{LogNotifier, Notifier};
use crate::storage::Storage;

/// Parameters of one run.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub trigger: RunTrigger,
    /// Restrict the run to these target ids
    pub target_ids: Option<Vec<String>>,
    /// Restrict the run to these zone names; an empty list is rejected
    pub zones: Option<Vec<String>>,
    /// Per-run overrides of the monitor's default options
    pub options: Option<CheckOptions>,
}

impl RunRequest {
    #[must_use]
    pub fn manual() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn scheduled() -> Self {
        Self {
            trigger: RunTrigger::Scheduler,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_targets(mut self, ids: Vec<String>) -> Self {
        self.target_ids = Some(ids);
        self
    }

    #[must_use]
    pub fn with_zones(mut self, zones: Vec<String>) -> Self {
        self.zones = Some(zones);
        self
    }

    #[must_use]
    pub const fn with_options(mut self, options: CheckOptions) -> Self {
        self.options = Some(options);
        self
    }
}

/// Finalized run plus what it produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub record: RunRecord,
    pub alerts: Vec<Alert>,
    /// Absent for failed runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<BatchReport>,
}

/// Runs monitoring passes over the storage snapshot.
pub struct Monitor {
    checker: BatchChecker,
    storage: Arc<dyn Storage>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<dyn MetricsSink>,
    options: CheckOptions,
    next_run_id: AtomicU64,
}

struct Completed {
    record: RunRecord,
    report: BatchReport,
    alerts: Vec<Alert>,
}

impl Monitor {
    /// Monitor logging alerts and discarding metrics.
    pub fn new(checker: BatchChecker, storage: Arc<dyn Storage>) -> Self {
        Self {
            checker,
            storage,
            notifier: Arc::new(LogNotifier),
            metrics: Arc::new(NoopMetrics),
            options: CheckOptions::default(),
            next_run_id: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Default options for runs that carry no override.
    #[must_use]
    pub const fn with_options(mut self, options: CheckOptions) -> Self {
        self.options = options;
        self
    }

    /// Continue numbering runs from `id`.
    #[must_use]
    pub fn with_first_run_id(self, id: u64) -> Self {
        self.next_run_id.store(id, Ordering::SeqCst);
        self
    }

    pub const fn checker(&self) -> &BatchChecker {
        &self.checker
    }

    /// Execute one run to completion or failure.
    ///
    /// Never returns an error: configuration and storage failures end the
    /// run in `failed` state with zero counts and a message.
    #[instrument(skip(self, request), fields(trigger = %request.trigger))]
    pub async fn run_once(&self, request: RunRequest) -> RunReport {
        let id = self.next_run_id.fetch_add(1, Ordering::SeqCst);
        let mut record = RunRecord::pending(id, request.trigger);
        if let Err(e) = record.begin() {
            warn!(run_id = id, error = %e, "run could not start");
        }
        info!(run_id = id, "run started");

        let report = match self.execute(&record, &request).await {
            Ok(done) => {
                self.deliver(&done.record, &done.alerts).await;
                info!(
                    run_id = id,
                    checks = done.record.counts.checks,
                    listed = done.record.counts.listed,
                    blocked = done.record.counts.blocked,
                    errored = done.record.counts.errored,
                    alerts = done.alerts.len(),
                    "run completed"
                );
                RunReport {
                    record: done.record,
                    alerts: done.alerts,
                    report: Some(done.report),
                }
            }
            Err(e) => {
                warn!(run_id = id, error = %e, "run failed");
                if let Err(fail_err) = record.fail(e.to_string()) {
                    warn!(run_id = id, error = %fail_err, "run already finalized");
                }
                if let Err(save_err) = self.storage.save_run_result(&record, &[]).await {
                    warn!(run_id = id, error = %save_err, "failed to record run failure");
                }
                RunReport {
                    record,
                    alerts: Vec::new(),
                    report: None,
                }
            }
        };

        self.observe(&report.record);
        report
    }

    async fn execute(&self, running: &RunRecord, request: &RunRequest) -> Result<Completed> {
        let options = request.options.unwrap_or(self.options);
        options.validate()?;

        let targets = select_targets(self.storage.load_enabled_targets().await?, request.target_ids.as_deref());
        let zones = select_zones(self.storage.load_enabled_zones().await?, request.zones.as_deref())?;

        let mut counts = RunCounts {
            targets: targets.len(),
            zones: zones.len(),
            ..RunCounts::default()
        };

        let (report, previous) = if targets.is_empty() || zones.is_empty() {
            info!(run_id = running.id, targets = targets.len(), zones = zones.len(), "nothing to probe");
            (BatchReport::empty(), Default::default())
        } else {
            let previous = self.storage.load_last_statuses(&targets, &zones).await?;
            let report = self.checker.check_batch(&targets, &zones, options).await?;
            (report, previous)
        };

        counts.checks = report.outcomes.len();
        for outcome in &report.outcomes {
            match outcome.status {
                ProbeStatus::Listed => counts.listed += 1,
                ProbeStatus::Blocked => counts.blocked += 1,
                ProbeStatus::Error => counts.errored += 1,
                ProbeStatus::NotListed => {}
            }
        }

        let mut record = running.clone();
        record.complete(counts)?;
        self.storage.save_run_result(&record, &report.outcomes).await?;

        let now = Utc::now();
        let alerts = report
            .outcomes
            .iter()
            .filter_map(|outcome| {
                let old = previous
                    .get(&(outcome.target.clone(), outcome.zone.clone()))
                    .copied();
                Alert::from_transition(&outcome.target, &outcome.zone, old, outcome.status, now)
            })
            .collect();

        Ok(Completed {
            record,
            report,
            alerts,
        })
    }

    async fn deliver(&self, record: &RunRecord, alerts: &[Alert]) {
        if alerts.is_empty() {
            return;
        }
        if let Err(e) = self.notifier.notify_run(record, alerts).await {
            warn!(run_id = record.id, error = %e, "alert notification failed");
        }
    }

    fn observe(&self, record: &RunRecord) {
        let counts = &record.counts;
        for (counter, value) in [
            (Counter::ChecksTotal, counts.checks),
            (Counter::ChecksListed, counts.listed),
            (Counter::ChecksBlocked, counts.blocked),
            (Counter::ChecksError, counts.errored),
        ] {
            if value > 0 {
                self.metrics.increment(counter, u64::try_from(value).unwrap_or(u64::MAX));
            }
        }
        if let Some(duration) = record.duration().and_then(|d| d.to_std().ok()) {
            self.metrics.observe_run_duration(duration);
        }
        self.metrics.record_run(record.trigger, record.status);
    }
}

fn select_targets(targets: Vec<Target>, ids: Option<&[String]>) -> Vec<Target> {
    match ids {
        None => targets,
        Some(ids) => {
            let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
            targets.into_iter().filter(|t| wanted.contains(t.id.as_str())).collect()
        }
    }
}

fn select_zones(zones: Vec<Zone>, names: Option<&[String]>) -> Result<Vec<Zone>> {
    let Some(names) = names else {
        return Ok(zones);
    };
    if names.is_empty() {
        return Err(RblError::Config("zone override is empty".into()));
    }
    let wanted = names
        .iter()
        .map(|name| Zone::new(name).map(|zone| zone.name))
        .collect::<Result<HashSet<String>>>()?;
    if let Some(unknown) = wanted.iter().find(|name| !zones.iter().any(|z| &z.name == *name)) {
        return Err(RblError::Config(format!("zone '{unknown}' is not enabled")));
    }
    Ok(zones.into_iter().filter(|z| wanted.contains(&z.name)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResultCache;
    use crate::metrics::EngineMetrics;
    use crate::prober::ZoneProber;
    use crate::ratelimit::ZoneRateLimiter;
    use crate::storage::MemoryStorage;
    use crate::testing::{FakeLookup, RecordingNotifier};
    use rblwatch_core::{AlertKind, RunStatus};
    use std::time::Duration;

    struct Fixture {
        lookup: Arc<FakeLookup>,
        storage: Arc<MemoryStorage>,
        notifier: Arc<RecordingNotifier>,
        metrics: Arc<EngineMetrics>,
        monitor: Monitor,
    }

    fn fixture_with(lookup: FakeLookup, notifier: RecordingNotifier, targets: &[&str], zones: &[&str]) -> Fixture {
        let lookup = Arc::new(lookup);
        let storage = Arc::new(MemoryStorage::new(
            targets.iter().map(|t| Target::new(*t).unwrap()).collect(),
            zones.iter().map(|z| Zone::new(z).unwrap()).collect(),
        ));
        let notifier = Arc::new(notifier);
        let metrics = Arc::new(EngineMetrics::new());
        let prober = ZoneProber::new(
            Arc::clone(&lookup) as Arc<dyn crate::resolver::DnsLookup>,
            // Zero-second TTL keeps every run probing afresh.
            Arc::new(ResultCache::new(1000, Duration::ZERO).unwrap()),
            Arc::new(ZoneRateLimiter::new(1000).unwrap()),
        );
        let monitor = Monitor::new(BatchChecker::new(prober), Arc::clone(&storage) as Arc<dyn Storage>)
            .with_notifier(Arc::clone(&notifier) as Arc<dyn Notifier>)
            .with_metrics(Arc::clone(&metrics) as Arc<dyn MetricsSink>)
            .with_options(CheckOptions::default().probe_timeout(Duration::from_millis(500)));
        Fixture {
            lookup,
            storage,
            notifier,
            metrics,
            monitor,
        }
    }

    fn fixture(lookup: FakeLookup) -> Fixture {
        fixture_with(
            lookup,
            RecordingNotifier::new(),
            &["192.0.2.1", "192.0.2.2"],
            &["bl.spamcop.net", "zen.spamhaus.org"],
        )
    }

    #[tokio::test]
    async fn test_completed_run_counts() {
        let f = fixture(
            FakeLookup::new()
                .listed("192.0.2.1", "bl.spamcop.net", &["127.0.0.2"])
                .listed("192.0.2.2", "zen.spamhaus.org", &["127.255.255.254"]),
        );
        let run = f.monitor.run_once(RunRequest::manual()).await;

        assert_eq!(run.record.status, RunStatus::Completed);
        assert_eq!(run.record.counts.targets, 2);
        assert_eq!(run.record.counts.zones, 2);
        assert_eq!(run.record.counts.checks, 4);
        assert_eq!(run.record.counts.listed, 1);
        assert_eq!(run.record.counts.blocked, 1);
        assert!(run.record.finished_at.is_some());
        assert_eq!(run.report.unwrap().outcomes.len(), 4);

        let snapshot = f.metrics.snapshot();
        assert_eq!(snapshot.checks_total, 4);
        assert_eq!(snapshot.checks_blocked, 1);
        assert_eq!(snapshot.runs.get("manual/completed"), Some(&1));
        assert_eq!(f.storage.runs().await.len(), 1);
    }

    #[tokio::test]
    async fn test_lookup_failures_count_as_errors() {
        let f = fixture(FakeLookup::new().answer(
            "192.0.2.1",
            "bl.spamcop.net",
            rblwatch_core::RecordKind::A,
            crate::resolver::Resolution::Failure("SERVFAIL".into()),
        ));
        let run = f.monitor.run_once(RunRequest::manual()).await;

        assert_eq!(run.record.status, RunStatus::Completed);
        assert!(run.record.error.is_none());
        assert_eq!(run.record.counts.checks, 4);
        assert_eq!(run.record.counts.errored, 1);
        assert_eq!(run.record.counts.listed, 0);
        assert!(run.alerts.is_empty());

        let report = run.report.unwrap();
        let failed = report.get("192.0.2.1").unwrap();
        assert_eq!(failed.errors.len(), 1);
        assert_eq!(failed.errors[0].reason, "SERVFAIL");

        let snapshot = f.metrics.snapshot();
        assert_eq!(snapshot.checks_error, 1);
        assert_eq!(snapshot.checks_total, 4);
        assert_eq!(snapshot.runs.get("manual/completed"), Some(&1));
    }

    #[tokio::test]
    async fn test_new_listing_raises_one_alert() {
        let f = fixture(FakeLookup::new().listed("192.0.2.1", "bl.spamcop.net", &["127.0.0.2"]));
        for zone in ["bl.spamcop.net", "zen.spamhaus.org"] {
            for target in ["192.0.2.1", "192.0.2.2"] {
                f.storage.set_last_status(target, zone, ProbeStatus::NotListed).await;
            }
        }

        let run = f.monitor.run_once(RunRequest::scheduled()).await;
        assert_eq!(run.alerts.len(), 1);
        let alert = &run.alerts[0];
        assert_eq!(alert.old_status, Some(ProbeStatus::NotListed));
        assert_eq!(alert.new_status, ProbeStatus::Listed);
        assert_eq!(alert.kind, AlertKind::Listed);
        assert_eq!(f.notifier.delivered().len(), 1);

        // Unchanged on the next run: no alert.
        let again = f.monitor.run_once(RunRequest::scheduled()).await;
        assert!(again.alerts.is_empty());
        assert_eq!(again.record.id, run.record.id + 1);
    }

    #[tokio::test]
    async fn test_delisting_alert() {
        let f = fixture(FakeLookup::new().listed("192.0.2.1", "bl.spamcop.net", &["127.0.0.2"]));
        f.monitor.run_once(RunRequest::manual()).await;

        f.lookup
            .set("192.0.2.1", "bl.spamcop.net", rblwatch_core::RecordKind::A, crate::resolver::Resolution::NoRecord);
        let run = f.monitor.run_once(RunRequest::manual()).await;
        assert_eq!(run.alerts.len(), 1);
        assert_eq!(run.alerts[0].kind, AlertKind::Delisted);
        assert_eq!(run.alerts[0].old_status, Some(ProbeStatus::Listed));
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_fail_run() {
        let f = fixture_with(
            FakeLookup::new().listed("192.0.2.1", "bl.spamcop.net", &["127.0.0.2"]),
            RecordingNotifier::failing(),
            &["192.0.2.1"],
            &["bl.spamcop.net"],
        );
        let run = f.monitor.run_once(RunRequest::manual()).await;
        assert_eq!(run.record.status, RunStatus::Completed);
        assert_eq!(run.alerts.len(), 1);
        assert!(f.notifier.delivered().is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_fails_run() {
        let f = fixture(FakeLookup::new());
        f.storage.set_unavailable(true);

        let run = f.monitor.run_once(RunRequest::manual()).await;
        assert_eq!(run.record.status, RunStatus::Failed);
        assert_eq!(run.record.counts, RunCounts::default());
        assert!(run.record.error.as_deref().unwrap().contains("unavailable"));
        assert!(run.report.is_none());
        assert_eq!(f.lookup.calls(), 0);
        assert_eq!(f.metrics.snapshot().runs.get("manual/failed"), Some(&1));
    }

    #[tokio::test]
    async fn test_save_failure_discards_counts() {
        let f = fixture(FakeLookup::new().listed("192.0.2.1", "bl.spamcop.net", &["127.0.0.2"]));
        f.storage.set_reject_saves(true);

        let run = f.monitor.run_once(RunRequest::manual()).await;
        assert_eq!(run.record.status, RunStatus::Failed);
        assert_eq!(run.record.counts.checks, 0);
        assert!(run.alerts.is_empty());
        assert!(f.notifier.delivered().is_empty());
        assert_eq!(f.lookup.calls(), 4);
    }

    #[tokio::test]
    async fn test_empty_snapshot_completes() {
        let f = fixture_with(FakeLookup::new(), RecordingNotifier::new(), &[], &["bl.spamcop.net"]);
        let run = f.monitor.run_once(RunRequest::manual()).await;
        assert_eq!(run.record.status, RunStatus::Completed);
        assert_eq!(run.record.counts.checks, 0);
        assert_eq!(run.record.counts.zones, 1);

        let f = fixture_with(FakeLookup::new(), RecordingNotifier::new(), &["192.0.2.1"], &[]);
        let run = f.monitor.run_once(RunRequest::manual()).await;
        assert_eq!(run.record.status, RunStatus::Completed);
        assert_eq!(run.record.counts.targets, 1);
    }

    #[tokio::test]
    async fn test_configuration_errors_fail_before_probing() {
        let f = fixture(FakeLookup::new());

        let run = f.monitor.run_once(RunRequest::manual().with_zones(Vec::new())).await;
        assert_eq!(run.record.status, RunStatus::Failed);

        let run = f
            .monitor
            .run_once(RunRequest::manual().with_zones(vec!["nope.example.org".into()]))
            .await;
        assert_eq!(run.record.status, RunStatus::Failed);

        let run = f
            .monitor
            .run_once(RunRequest::manual().with_options(CheckOptions::default().concurrency(0)))
            .await;
        assert_eq!(run.record.status, RunStatus::Failed);
        assert_eq!(f.lookup.calls(), 0);
    }

    #[tokio::test]
    async fn test_filters_restrict_pairs() {
        let f = fixture(FakeLookup::new());
        let run = f
            .monitor
            .run_once(
                RunRequest::manual()
                    .with_targets(vec!["192.0.2.2".into()])
                    .with_zones(vec!["ZEN.spamhaus.org.".into()]),
            )
            .await;
        assert_eq!(run.record.status, RunStatus::Completed);
        assert_eq!(run.record.counts.checks, 1);
        let report = run.report.unwrap();
        assert_eq!(report.outcomes[0].target, "192.0.2.2");
        assert_eq!(report.outcomes[0].zone, "zen.spamhaus.org");
    }

    #[tokio::test]
    async fn test_concurrent_runs_proceed_independently() {
        let f = fixture(FakeLookup::new().with_delay(Duration::from_millis(20)));
        let (a, b) = tokio::join!(
            f.monitor.run_once(RunRequest::manual()),
            f.monitor.run_once(RunRequest::scheduled())
        );
        assert_eq!(a.record.status, RunStatus::Completed);
        assert_eq!(b.record.status, RunStatus::Completed);
        assert_ne!(a.record.id, b.record.id);
        assert_eq!(f.storage.runs().await.len(), 2);
    }
}
