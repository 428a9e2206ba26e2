//! Scripted collaborators for engine tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rblwatch_core::{Alert, RblError, RecordKind, Result};

use crate::encoding::query_name;
use crate::notify::Notifier;
use crate::resolver::{DnsLookup, Resolution};

/// Answers from a fixed table; unknown names are `NoRecord`.
#[derive(Default)]
pub struct FakeLookup {
    answers: Mutex<HashMap<(String, RecordKind), Resolution>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    txt_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every query sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Script the answer for `target` under `zone`.
    pub fn answer(self, target: &str, zone: &str, kind: RecordKind, resolution: Resolution) -> Self {
        self.set(target, zone, kind, resolution);
        self
    }

    /// Script an A-record listing.
    pub fn listed(self, target: &str, zone: &str, addresses: &[&str]) -> Self {
        let records = addresses.iter().map(ToString::to_string).collect();
        self.answer(target, zone, RecordKind::A, Resolution::Records(records))
    }

    /// Replace an answer after construction.
    pub fn set(&self, target: &str, zone: &str, kind: RecordKind, resolution: Resolution) {
        self.answers
            .lock()
            .unwrap()
            .insert((query_name(target, zone), kind), resolution);
    }

    /// A-record queries issued.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// TXT queries issued.
    pub fn txt_calls(&self) -> usize {
        self.txt_calls.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous queries observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DnsLookup for FakeLookup {
    async fn resolve(&self, name: &str, kind: RecordKind, _deadline: Duration) -> Resolution {
        match kind {
            RecordKind::A => self.calls.fetch_add(1, Ordering::SeqCst),
            RecordKind::Txt => self.txt_calls.fetch_add(1, Ordering::SeqCst),
        };
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let answer = self
            .answers
            .lock()
            .unwrap()
            .get(&(name.to_string(), kind))
            .cloned()
            .unwrap_or(Resolution::NoRecord);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        answer
    }
}

/// Keeps delivered alerts; fails for one target or for everything.
#[derive(Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<Alert>>,
    fail_target: Option<String>,
    fail_all: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    pub fn failing_for(target: &str) -> Self {
        Self {
            fail_target: Some(target.to_string()),
            ..Self::default()
        }
    }

    pub fn delivered(&self) -> Vec<Alert> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, alert: &Alert) -> Result<()> {
        if self.fail_all || self.fail_target.as_deref() == Some(alert.target.as_str()) {
            return Err(RblError::Notify("endpoint unreachable".into()));
        }
        self.delivered.lock().unwrap().push(alert.clone());
        Ok(())
    }
}
