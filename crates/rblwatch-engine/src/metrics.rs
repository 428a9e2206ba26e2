//! Metrics sink collaborator and an in-process implementation.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use rblwatch_core::{RunStatus, RunTrigger};
use serde::Serialize;

/// Check counters maintained per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    ChecksTotal,
    ChecksListed,
    ChecksBlocked,
    ChecksError,
}

impl Counter {
    /// Exported counter name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ChecksTotal => "checks_total",
            Self::ChecksListed => "checks_listed",
            Self::ChecksBlocked => "checks_blocked",
            Self::ChecksError => "checks_error",
        }
    }
}

/// Receives run metrics from the orchestrator.
pub trait MetricsSink: Send + Sync {
    /// Add `by` to a counter
    fn increment(&self, counter: Counter, by: u64);

    /// Record how long a run took
    fn observe_run_duration(&self, duration: Duration);

    /// Count a finished run by trigger and final status
    fn record_run(&self, _trigger: RunTrigger, _status: RunStatus) {}
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn increment(&self, _counter: Counter, _by: u64) {}

    fn observe_run_duration(&self, _duration: Duration) {}
}

/// Atomic counters readable through [`EngineMetrics::snapshot`].
#[derive(Debug, Default)]
pub struct EngineMetrics {
    checks_total: AtomicU64,
    checks_listed: AtomicU64,
    checks_blocked: AtomicU64,
    checks_error: AtomicU64,
    run_duration_count: AtomicU64,
    run_duration_micros: AtomicU64,
    last_run_duration_micros: AtomicU64,
    runs: DashMap<(RunTrigger, RunStatus), u64>,
}

/// Point-in-time copy of [`EngineMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub checks_total: u64,
    pub checks_listed: u64,
    pub checks_blocked: u64,
    pub checks_error: u64,
    pub runs_observed: u64,
    pub run_duration_total_secs: f64,
    pub last_run_duration_secs: f64,
    /// Finished runs keyed `trigger/status`
    pub runs: BTreeMap<String, u64>,
}

impl EngineMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, counter: Counter) -> &AtomicU64 {
        match counter {
            Counter::ChecksTotal => &self.checks_total,
            Counter::ChecksListed => &self.checks_listed,
            Counter::ChecksBlocked => &self.checks_blocked,
            Counter::ChecksError => &self.checks_error,
        }
    }

    /// Current value of one counter
    #[must_use]
    pub fn get(&self, counter: Counter) -> u64 {
        self.counter(counter).load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let micros_to_secs = |micros: u64| Duration::from_micros(micros).as_secs_f64();
        MetricsSnapshot {
            checks_total: self.get(Counter::ChecksTotal),
            checks_listed: self.get(Counter::ChecksListed),
            checks_blocked: self.get(Counter::ChecksBlocked),
            checks_error: self.get(Counter::ChecksError),
            runs_observed: self.run_duration_count.load(Ordering::Relaxed),
            run_duration_total_secs: micros_to_secs(self.run_duration_micros.load(Ordering::Relaxed)),
            last_run_duration_secs: micros_to_secs(self.last_run_duration_micros.load(Ordering::Relaxed)),
            runs: self
                .runs
                .iter()
                .map(|entry| {
                    let (trigger, status) = entry.key();
                    (format!("{trigger}/{status}"), *entry.value())
                })
                .collect(),
        }
    }
}

impl MetricsSink for EngineMetrics {
    fn increment(&self, counter: Counter, by: u64) {
        self.counter(counter).fetch_add(by, Ordering::Relaxed);
    }

    fn observe_run_duration(&self, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        self.run_duration_count.fetch_add(1, Ordering::Relaxed);
        self.run_duration_micros.fetch_add(micros, Ordering::Relaxed);
        self.last_run_duration_micros.store(micros, Ordering::Relaxed);
    }

    fn record_run(&self, trigger: RunTrigger, status: RunStatus) {
        *self.runs.entry((trigger, status)).or_insert(0) += 1;
    }
}
