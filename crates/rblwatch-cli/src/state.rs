//! JSON state file: targets, zones, last status per pair and run history.
//!
//! The whole file is rewritten on every change (temp file + rename), so a
//! crash never leaves a half-written state behind.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rblwatch_core::{ProbeOutcome, ProbeStatus, RblError, Result, RunRecord, RunStatus, Target, Zone};
use rblwatch_engine::{StatusMap, Storage};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

/// Runs kept in the history.
pub const MAX_RUN_HISTORY: usize = 100;

const STATE_VERSION: u32 = 1;

/// Last known status of one (target, zone) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairStatus {
    pub target: String,
    pub zone: String,
    pub status: ProbeStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub last_checked: DateTime<Utc>,
    /// Last time the pair was seen listed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

/// On-disk document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub zones: Vec<Zone>,
    #[serde(default)]
    pub statuses: Vec<PairStatus>,
    /// Most recent last
    #[serde(default)]
    pub runs: Vec<RunRecord>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            targets: Vec::new(),
            zones: Vec::new(),
            statuses: Vec::new(),
            runs: Vec::new(),
        }
    }
}

impl StateFile {
    /// Highest run id recorded.
    pub fn last_run_id(&self) -> u64 {
        self.runs.iter().map(|r| r.id).max().unwrap_or(0)
    }

    fn status_index(&self) -> HashMap<(String, String), usize> {
        self.statuses
            .iter()
            .enumerate()
            .map(|(i, s)| ((s.target.clone(), s.zone.clone()), i))
            .collect()
    }

    fn record_outcomes(&mut self, outcomes: &[ProbeOutcome], at: DateTime<Utc>) {
        let mut index = self.status_index();

        for outcome in outcomes {
            let listed = outcome.status == ProbeStatus::Listed;
            match index.get(&(outcome.target.clone(), outcome.zone.clone())) {
                Some(&i) => {
                    let entry = &mut self.statuses[i];
                    entry.status = outcome.status;
                    entry.addresses.clone_from(&outcome.addresses);
                    entry.reason.clone_from(&outcome.reason);
                    entry.last_checked = at;
                    if listed {
                        entry.last_seen = Some(at);
                    }
                }
                None => {
                    index.insert((outcome.target.clone(), outcome.zone.clone()), self.statuses.len());
                    self.statuses.push(PairStatus {
                        target: outcome.target.clone(),
                        zone: outcome.zone.clone(),
                        status: outcome.status,
                        addresses: outcome.addresses.clone(),
                        reason: outcome.reason.clone(),
                        last_checked: at,
                        last_seen: listed.then_some(at),
                    });
                }
            }
        }
    }
}

/// [`Storage`] backed by a JSON file.
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current state; empty if the file does not exist yet.
    pub async fn load(&self) -> Result<StateFile> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    /// Apply `change` to the state and write it back.
    pub async fn update<T>(&self, change: impl FnOnce(&mut StateFile) -> Result<T> + Send) -> Result<T> {
        let _guard = self.lock.lock().await;
        let mut state = self.read().await?;
        let value = change(&mut state)?;
        self.write(&state).await?;
        Ok(value)
    }

    /// Add a target; its id must be new.
    pub async fn add_target(&self, target: Target) -> Result<()> {
        self.update(|state| {
            if state.targets.iter().any(|t| t.id == target.id) {
                return Err(RblError::InvalidTarget(format!("target '{}' already exists", target.id)));
            }
            state.targets.push(target);
            Ok(())
        })
        .await
    }

    /// Remove a target and its recorded statuses.
    pub async fn remove_target(&self, id: &str) -> Result<Target> {
        self.update(|state| {
            let pos = state
                .targets
                .iter()
                .position(|t| t.id == id)
                .ok_or_else(|| RblError::InvalidTarget(format!("no target with id '{id}'")))?;
            let removed = state.targets.remove(pos);
            state.statuses.retain(|s| s.target != removed.address);
            Ok(removed)
        })
        .await
    }

    pub async fn set_target_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        self.update(|state| {
            let target = state
                .targets
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| RblError::InvalidTarget(format!("no target with id '{id}'")))?;
            target.enabled = enabled;
            Ok(())
        })
        .await
    }

    /// Add zones, skipping names already present. Returns how many were added.
    pub async fn add_zones(&self, zones: Vec<Zone>) -> Result<usize> {
        self.update(|state| {
            let mut added = 0;
            for zone in zones {
                if !state.zones.iter().any(|z| z.name == zone.name) {
                    state.zones.push(zone);
                    added += 1;
                }
            }
            Ok(added)
        })
        .await
    }

    /// Remove a zone and its recorded statuses.
    pub async fn remove_zone(&self, name: &str) -> Result<Zone> {
        let name = Zone::new(name)?.name;
        self.update(|state| {
            let pos = state
                .zones
                .iter()
                .position(|z| z.name == name)
                .ok_or_else(|| RblError::InvalidZone(format!("no zone named '{name}'")))?;
            state.statuses.retain(|s| s.zone != name);
            Ok(state.zones.remove(pos))
        })
        .await
    }

    async fn read(&self) -> Result<StateFile> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let state: StateFile = serde_json::from_slice(&bytes)
                    .map_err(|e| RblError::Storage(format!("corrupt state file {}: {e}", self.path.display())))?;
                Ok(state)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StateFile::default()),
            Err(e) => Err(RblError::Storage(format!("cannot read {}: {e}", self.path.display()))),
        }
    }

    async fn write(&self, state: &StateFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| RblError::Storage(format!("cannot write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| RblError::Storage(format!("cannot replace {}: {e}", self.path.display())))?;
        debug!(path = %self.path.display(), "state saved");
        Ok(())
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn load_enabled_targets(&self) -> Result<Vec<Target>> {
        Ok(self.load().await?.targets.into_iter().filter(|t| t.enabled).collect())
    }

    async fn load_enabled_zones(&self) -> Result<Vec<Zone>> {
        Ok(self.load().await?.zones.into_iter().filter(|z| z.enabled).collect())
    }

    async fn load_last_status(&self, target: &str, zone: &str) -> Result<Option<ProbeStatus>> {
        let state = self.load().await?;
        Ok(state
            .statuses
            .iter()
            .find(|s| s.target == target && s.zone == zone)
            .map(|s| s.status))
    }

    async fn load_last_statuses(&self, _targets: &[Target], _zones: &[Zone]) -> Result<StatusMap> {
        let state = self.load().await?;
        Ok(state
            .statuses
            .into_iter()
            .map(|s| ((s.target, s.zone), s.status))
            .collect())
    }

    async fn save_run_result(&self, run: &RunRecord, outcomes: &[ProbeOutcome]) -> Result<()> {
        let at = run.finished_at.unwrap_or_else(Utc::now);
        self.update(|state| {
            if run.status == RunStatus::Completed {
                state.record_outcomes(outcomes, at);
            }
            state.runs.push(run.clone());
            if state.runs.len() > MAX_RUN_HISTORY {
                let excess = state.runs.len() - MAX_RUN_HISTORY;
                state.runs.drain(..excess);
            }
            Ok(())
        })
        .await
    }
}
