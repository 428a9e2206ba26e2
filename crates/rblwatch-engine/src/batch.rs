//! Batch checker: fan target × zone pairs out to the prober.
//!
//! In-flight probes are bounded by a semaphore sized to the invocation's
//! concurrency ceiling. Each pair runs in its own task, so one slow or
//! panicking probe never holds up the accounting of its siblings. If the
//! caller stops awaiting a batch, the spawned probes still finish and still
//! populate the cache.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use rblwatch_core::{ProbeOutcome, ProbeStatus, RblError, Result, Target, TargetKind, Zone};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::CheckOptions;
use crate::prober::ZoneProber;

/// A zone that listed a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneHit {
    pub zone: String,
    pub addresses: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txt: Option<Vec<String>>,
}

/// A zone whose probe failed or was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneError {
    pub zone: String,
    pub reason: String,
}

/// Aggregated result for one target. Every list is sorted by zone name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetReport {
    pub target: String,
    pub kind: TargetKind,
    pub listed: Vec<ZoneHit>,
    pub blocked: Vec<ZoneError>,
    pub errors: Vec<ZoneError>,
    pub not_listed_count: usize,
}

impl TargetReport {
    fn new(target: &Target) -> Self {
        Self {
            target: target.address.clone(),
            kind: target.kind,
            listed: Vec::new(),
            blocked: Vec::new(),
            errors: Vec::new(),
            not_listed_count: 0,
        }
    }

    fn record(&mut self, outcome: &ProbeOutcome) {
        let reason = || outcome.reason.clone().unwrap_or_default();
        match outcome.status {
            ProbeStatus::Listed => self.listed.push(ZoneHit {
                zone: outcome.zone.clone(),
                addresses: outcome.addresses.clone(),
                txt: outcome.txt.clone(),
            }),
            ProbeStatus::Blocked => self.blocked.push(ZoneError {
                zone: outcome.zone.clone(),
                reason: reason(),
            }),
            ProbeStatus::Error => self.errors.push(ZoneError {
                zone: outcome.zone.clone(),
                reason: reason(),
            }),
            ProbeStatus::NotListed => self.not_listed_count += 1,
        }
    }

    fn sort(&mut self) {
        self.listed.sort_by(|a, b| a.zone.cmp(&b.zone));
        self.blocked.sort_by(|a, b| a.zone.cmp(&b.zone));
        self.errors.sort_by(|a, b| a.zone.cmp(&b.zone));
    }

    /// Returns true if any zone lists the target
    #[must_use]
    pub fn is_listed(&self) -> bool {
        !self.listed.is_empty()
    }

    /// Number of zones probed for this target
    #[must_use]
    pub fn zone_count(&self) -> usize {
        self.listed.len() + self.blocked.len() + self.errors.len() + self.not_listed_count
    }
}

/// Per-batch totals, counted in targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    pub total_targets: usize,
    pub listed_targets: usize,
    pub blocked_targets: usize,
    /// Targets with errors but no listing or block
    pub error_targets: usize,
}

impl CheckSummary {
    fn from_reports(reports: &[TargetReport]) -> Self {
        reports.iter().fold(
            Self {
                total_targets: reports.len(),
                ..Self::default()
            },
            |mut summary, report| {
                if report.is_listed() {
                    summary.listed_targets += 1;
                }
                if !report.blocked.is_empty() {
                    summary.blocked_targets += 1;
                }
                if !report.errors.is_empty() && !report.is_listed() && report.blocked.is_empty() {
                    summary.error_targets += 1;
                }
                summary
            },
        )
    }
}

/// Result of one batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// One report per distinct target, in input order
    pub results: Vec<TargetReport>,
    /// Every pair outcome, grouped by target in input order, zones sorted
    pub outcomes: Vec<ProbeOutcome>,
    pub summary: CheckSummary,
}

impl BatchReport {
    /// Report for a target address.
    #[must_use]
    pub fn get(&self, target: &str) -> Option<&TargetReport> {
        self.results.iter().find(|r| r.target == target)
    }

    pub(crate) fn empty() -> Self {
        Self {
            results: Vec::new(),
            outcomes: Vec::new(),
            summary: CheckSummary::default(),
        }
    }
}

/// Fans pairs out to a [`ZoneProber`] under a global in-flight ceiling.
#[derive(Clone)]
pub struct BatchChecker {
    prober: ZoneProber,
}

struct PendingProbe {
    target_index: usize,
    target: String,
    zone: String,
}

impl BatchChecker {
    /// Checker over a prober.
    #[must_use]
    pub const fn new(prober: ZoneProber) -> Self {
        Self { prober }
    }

    /// Underlying prober.
    #[must_use]
    pub const fn prober(&self) -> &ZoneProber {
        &self.prober
    }

    /// Check every target against every zone.
    ///
    /// Duplicate targets (by address) and zones (by name) are probed once.
    /// An empty zone list is a configuration error; an empty target list
    /// yields an empty report.
    pub async fn check_batch(&self, targets: &[Target], zones: &[Zone], options: CheckOptions) -> Result<BatchReport> {
        options.validate()?;
        if zones.is_empty() {
            return Err(RblError::Config("no zones to check".into()));
        }

        let targets = distinct_by(targets, |t| t.address.as_str());
        let zones = distinct_by(zones, |z| z.name.as_str());
        debug!(
            targets = targets.len(),
            zones = zones.len(),
            concurrency = options.concurrency,
            "starting batch"
        );

        let semaphore = Arc::new(Semaphore::new(options.concurrency));
        let pairs = targets.len() * zones.len();
        let mut pending = Vec::with_capacity(pairs);
        let mut handles: Vec<JoinHandle<ProbeOutcome>> = Vec::with_capacity(pairs);

        for (target_index, target) in targets.iter().enumerate() {
            for zone in &zones {
                let permit = Arc::clone(&semaphore)
                    .acquire_owned()
                    .await
                    .map_err(|e| RblError::Dns(format!("probe pool closed: {e}")))?;
                let prober = self.prober.clone();
                let address = target.address.clone();
                let task_zone = (*zone).clone();

                let handle = tokio::spawn(async move {
                    let _permit = permit;
                    prober
                        .probe(&address, &task_zone, options.include_txt, options.probe_timeout)
                        .await
                });
                handles.push(handle);
                pending.push(PendingProbe {
                    target_index,
                    target: target.address.clone(),
                    zone: zone.name.clone(),
                });
            }
        }

        let joined = join_all(handles).await;
        let mut indexed: Vec<(usize, ProbeOutcome)> = pending
            .into_iter()
            .zip(joined)
            .map(|(probe, joined)| {
                let outcome = joined.unwrap_or_else(|e| {
                    warn!(target = %probe.target, zone = %probe.zone, error = %e, "probe task failed");
                    ProbeOutcome::error(&probe.target, &probe.zone, format!("probe task failed: {e}"))
                });
                (probe.target_index, outcome)
            })
            .collect();
        indexed.sort_by(|(ia, a), (ib, b)| ia.cmp(ib).then_with(|| a.zone.cmp(&b.zone)));

        let mut results: Vec<TargetReport> = targets.iter().map(|t| TargetReport::new(t)).collect();
        for (index, outcome) in &indexed {
            results[*index].record(outcome);
        }
        for report in &mut results {
            report.sort();
        }

        let summary = CheckSummary::from_reports(&results);
        debug!(
            total = summary.total_targets,
            listed = summary.listed_targets,
            blocked = summary.blocked_targets,
            errors = summary.error_targets,
            "batch complete"
        );

        Ok(BatchReport {
            results,
            outcomes: indexed.into_iter().map(|(_, outcome)| outcome).collect(),
            summary,
        })
    }
}

fn distinct_by<'a, T>(items: &'a [T], key: impl Fn(&T) -> &str) -> Vec<&'a T> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(key(*item).to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResultCache;
    use crate::ratelimit::ZoneRateLimiter;
    use crate::resolver::Resolution;
    use crate::testing::FakeLookup;
    use rblwatch_core::RecordKind;
    use std::time::Duration;

    fn checker(lookup: Arc<FakeLookup>) -> BatchChecker {
        BatchChecker::new(ZoneProber::new(
            lookup,
            Arc::new(ResultCache::new(10_000, Duration::from_secs(3600)).unwrap()),
            Arc::new(ZoneRateLimiter::new(1000).unwrap()),
        ))
    }

    fn targets(addresses: &[&str]) -> Vec<Target> {
        addresses.iter().map(|a| Target::new(*a).unwrap()).collect()
    }

    fn zones(names: &[&str]) -> Vec<Zone> {
        names.iter().map(|n| Zone::new(n).unwrap()).collect()
    }

    fn options() -> CheckOptions {
        CheckOptions::default().probe_timeout(Duration::from_millis(500))
    }

    #[tokio::test]
    async fn test_three_targets_fifty_zones() {
        let lookup = Arc::new(FakeLookup::new().with_delay(Duration::from_millis(5)));
        let checker = checker(Arc::clone(&lookup));
        let targets = targets(&["192.0.2.1", "192.0.2.2", "192.0.2.3"]);
        let zones: Vec<Zone> = Zone::defaults().into_iter().take(50).collect();

        let report = checker
            .check_batch(&targets, &zones, options().concurrency(10))
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 150);
        let distinct: HashSet<_> = report
            .outcomes
            .iter()
            .map(|o| (o.target.clone(), o.zone.clone()))
            .collect();
        assert_eq!(distinct.len(), 150);
        assert!(lookup.max_in_flight() <= 10);
        assert_eq!(report.results.len(), 3);
        assert!(report.results.iter().all(|r| r.not_listed_count == 50));

        let again = checker
            .check_batch(&targets, &zones, options().concurrency(10))
            .await
            .unwrap();
        assert_eq!(again.outcomes, report.outcomes);
        assert_eq!(again.results, report.results);
        assert_eq!(lookup.calls(), 150);
    }

    #[tokio::test]
    async fn test_aggregation_sorted_by_zone() {
        let lookup = Arc::new(
            FakeLookup::new()
                .listed("1.2.3.4", "zen.spamhaus.org", &["127.0.0.2"])
                .listed("1.2.3.4", "bl.spamcop.net", &["127.0.0.2"])
                .listed("1.2.3.4", "dnsbl.sorbs.net", &["127.0.0.10"])
                .listed("5.6.7.8", "zen.spamhaus.org", &["127.255.255.254"])
                .answer(
                    "5.6.7.8",
                    "bl.spamcop.net",
                    RecordKind::A,
                    Resolution::Failure("server failure: SERVFAIL".into()),
                )
                .answer(
                    "9.9.9.9",
                    "dnsbl.sorbs.net",
                    RecordKind::A,
                    Resolution::Failure("connection refused".into()),
                ),
        );
        let report = checker(lookup)
            .check_batch(
                &targets(&["1.2.3.4", "5.6.7.8", "9.9.9.9", "8.8.8.8"]),
                &zones(&["zen.spamhaus.org", "dnsbl.sorbs.net", "bl.spamcop.net"]),
                options(),
            )
            .await
            .unwrap();

        let first = report.get("1.2.3.4").unwrap();
        let listed: Vec<_> = first.listed.iter().map(|h| h.zone.as_str()).collect();
        assert_eq!(listed, vec!["bl.spamcop.net", "dnsbl.sorbs.net", "zen.spamhaus.org"]);

        let second = report.get("5.6.7.8").unwrap();
        assert_eq!(second.blocked[0].zone, "zen.spamhaus.org");
        assert_eq!(second.errors[0].reason, "server failure: SERVFAIL");
        assert_eq!(second.not_listed_count, 1);
        assert_eq!(second.zone_count(), 3);

        assert_eq!(report.get("8.8.8.8").unwrap().not_listed_count, 3);
        assert_eq!(
            report.summary,
            CheckSummary {
                total_targets: 4,
                listed_targets: 1,
                blocked_targets: 1,
                error_targets: 1,
            }
        );

        let order: Vec<_> = report.results.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(order, vec!["1.2.3.4", "5.6.7.8", "9.9.9.9", "8.8.8.8"]);
        assert_eq!(report.outcomes[0].zone, "bl.spamcop.net");
        assert_eq!(report.outcomes[0].target, "1.2.3.4");
    }

    #[tokio::test]
    async fn test_duplicates_probed_once() {
        let lookup = Arc::new(FakeLookup::new());
        let report = checker(Arc::clone(&lookup))
            .check_batch(
                &targets(&["192.0.2.1", "192.0.2.1"]),
                &zones(&["bl.spamcop.net", "bl.spamcop.net."]),
                options(),
            )
            .await
            .unwrap();
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(lookup.calls(), 1);
    }

    #[tokio::test]
    async fn test_slow_zone_does_not_block_siblings() {
        let lookup = Arc::new(FakeLookup::new().with_delay(Duration::from_millis(200)));
        let report = checker(lookup)
            .check_batch(
                &targets(&["192.0.2.1", "192.0.2.2"]),
                &zones(&["bl.spamcop.net", "dnsbl.sorbs.net"]),
                options().probe_timeout(Duration::from_millis(20)),
            )
            .await
            .unwrap();
        assert_eq!(report.outcomes.len(), 4);
        assert!(report
            .outcomes
            .iter()
            .all(|o| o.status == ProbeStatus::Error && o.reason.as_deref() == Some("timeout")));
        assert_eq!(report.summary.error_targets, 2);
    }

    #[tokio::test]
    async fn test_invalid_invocations() {
        let checker = checker(Arc::new(FakeLookup::new()));
        let err = checker
            .check_batch(&targets(&["192.0.2.1"]), &[], options())
            .await
            .unwrap_err();
        assert!(err.is_config_error());

        let err = checker
            .check_batch(&targets(&["192.0.2.1"]), &zones(&["bl.spamcop.net"]), options().concurrency(0))
            .await
            .unwrap_err();
        assert!(err.is_config_error());

        let err = checker
            .check_batch(
                &targets(&["192.0.2.1"]),
                &zones(&["bl.spamcop.net"]),
                options().concurrency(usize::MAX),
            )
            .await
            .unwrap_err();
        assert!(err.is_config_error());

        let empty = checker
            .check_batch(&[], &zones(&["bl.spamcop.net"]), options())
            .await
            .unwrap();
        assert!(empty.results.is_empty());
        assert_eq!(empty.summary.total_targets, 0);
    }

    #[tokio::test]
    async fn test_report_serializes() {
        let lookup = Arc::new(FakeLookup::new().listed("1.2.3.4", "bl.spamcop.net", &["127.0.0.2"]));
        let report = checker(lookup)
            .check_batch(&targets(&["1.2.3.4"]), &zones(&["bl.spamcop.net"]), options())
            .await
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["summary"]["listed_targets"], 1);
        assert_eq!(json["results"][0]["kind"], "ip");
        assert_eq!(json["results"][0]["listed"][0]["zone"], "bl.spamcop.net");
        assert!(json["results"][0]["listed"][0].get("txt").is_none());
    }
}
