//! Storage collaborator.
//!
//! The orchestrator touches storage only at run boundaries: snapshot load
//! before probing, last-status lookup for diffing, and the final save.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rblwatch_core::{ProbeOutcome, ProbeStatus, RblError, Result, RunRecord, RunStatus, Target, Zone};
use tokio::sync::RwLock;

/// Last recorded statuses keyed by (target address, zone name).
pub type StatusMap = HashMap<(String, String), ProbeStatus>;

/// Persistence used by monitoring runs.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Targets taking part in monitoring runs
    async fn load_enabled_targets(&self) -> Result<Vec<Target>>;

    /// Zones taking part in monitoring runs
    async fn load_enabled_zones(&self) -> Result<Vec<Zone>>;

    /// Status recorded for the pair by the most recent completed run
    async fn load_last_status(&self, target: &str, zone: &str) -> Result<Option<ProbeStatus>>;

    /// Last statuses for every pair of a snapshot.
    ///
    /// The default issues one `load_last_status` per pair; backends that can
    /// answer in bulk should override it.
    async fn load_last_statuses(&self, targets: &[Target], zones: &[Zone]) -> Result<StatusMap> {
        let mut statuses = StatusMap::new();
        for target in targets {
            for zone in zones {
                if let Some(status) = self.load_last_status(&target.address, &zone.name).await? {
                    statuses.insert((target.address.clone(), zone.name.clone()), status);
                }
            }
        }
        Ok(statuses)
    }

    /// Persist a finalized run and its per-pair outcomes
    async fn save_run_result(&self, run: &RunRecord, outcomes: &[ProbeOutcome]) -> Result<()>;
}

#[derive(Default)]
struct MemoryState {
    targets: Vec<Target>,
    zones: Vec<Zone>,
    last: StatusMap,
    runs: Vec<RunRecord>,
}

/// In-process [`Storage`], used for ad-hoc runs and tests.
#[derive(Default)]
pub struct MemoryStorage {
    state: RwLock<MemoryState>,
    unavailable: AtomicBool,
    reject_saves: AtomicBool,
}

impl MemoryStorage {
    pub fn new(targets: Vec<Target>, zones: Vec<Zone>) -> Self {
        Self {
            state: RwLock::new(MemoryState {
                targets,
                zones,
                ..MemoryState::default()
            }),
            ..Self::default()
        }
    }

    /// Seed the last status of a pair.
    pub async fn set_last_status(&self, target: &str, zone: &str, status: ProbeStatus) {
        self.state
            .write()
            .await
            .last
            .insert((target.to_string(), zone.to_string()), status);
    }

    /// Make every load fail with a storage error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make `save_run_result` fail with a storage error.
    pub fn set_reject_saves(&self, reject: bool) {
        self.reject_saves.store(reject, Ordering::SeqCst);
    }

    /// Saved runs, oldest first.
    pub async fn runs(&self) -> Vec<RunRecord> {
        self.state.read().await.runs.clone()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RblError::Storage("storage unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load_enabled_targets(&self) -> Result<Vec<Target>> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.targets.iter().filter(|t| t.enabled).cloned().collect())
    }

    async fn load_enabled_zones(&self) -> Result<Vec<Zone>> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.zones.iter().filter(|z| z.enabled).cloned().collect())
    }

    async fn load_last_status(&self, target: &str, zone: &str) -> Result<Option<ProbeStatus>> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.last.get(&(target.to_string(), zone.to_string())).copied())
    }

    async fn save_run_result(&self, run: &RunRecord, outcomes: &[ProbeOutcome]) -> Result<()> {
        if self.reject_saves.load(Ordering::SeqCst) {
            return Err(RblError::Storage("write rejected".into()));
        }
        let mut state = self.state.write().await;
        if run.status == RunStatus::Completed {
            for outcome in outcomes {
                state
                    .last
                    .insert((outcome.target.clone(), outcome.zone.clone()), outcome.status);
            }
        }
        state.runs.push(run.clone());
        Ok(())
    }
}
