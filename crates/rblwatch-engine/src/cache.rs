//! TTL + LRU result cache.
//!
//! Maps (target, zone, record kind) to a classified outcome. Entries are
//! visible only before `inserted + ttl`; expired entries read as absent and
//! are removed on the access that finds them. When full, inserting a new key
//! evicts the least-recently-used entry.
//!
//! The cache is shared by every in-flight probe and by concurrent runs;
//! access is serialized internally. Outcomes are stored behind `Arc`, so a
//! reader always sees a fully built value.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use lru::LruCache;
use rblwatch_core::{ProbeOutcome, ProbeStatus, RblError, RecordKind, Result};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::config::CacheConfig;

/// Expiry used when `now + ttl` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Cache key: one record kind of one (target, zone) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Target address
    pub target: String,
    /// Zone name
    pub zone: String,
    /// Record kind the outcome answers
    pub kind: RecordKind,
}

impl CacheKey {
    /// Build a key
    pub fn new(target: impl Into<String>, zone: impl Into<String>, kind: RecordKind) -> Self {
        Self {
            target: target.into(),
            zone: zone.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    outcome: Arc<ProbeOutcome>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Live (unexpired) entries
    pub size: usize,
    /// Capacity
    pub max_size: usize,
    /// Entry lifetime in seconds
    pub ttl_secs: u64,
}

/// Shared outcome cache
pub struct ResultCache {
    entries: Mutex<LruCache<CacheKey, CacheEntry>>,
    max_size: NonZeroUsize,
    ttl: Duration,
    error_ttl: Duration,
}

impl ResultCache {
    /// Cache holding at most `max_size` outcomes for `ttl` each
    pub fn new(max_size: usize, ttl: Duration) -> Result<Self> {
        let max_size = NonZeroUsize::new(max_size)
            .ok_or_else(|| RblError::Config("cache max_size must be positive".into()))?;
        Ok(Self {
            entries: Mutex::new(LruCache::new(max_size)),
            max_size,
            ttl,
            error_ttl: ttl,
        })
    }

    /// Cache built from configuration
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        Ok(Self::new(config.max_size, config.ttl())?.with_error_ttl(config.error_ttl()))
    }

    /// Use a different lifetime for `Error` outcomes
    #[must_use]
    pub const fn with_error_ttl(mut self, error_ttl: Duration) -> Self {
        self.error_ttl = error_ttl;
        self
    }

    /// Live outcome for `key`, marking it most recently used
    pub async fn get(&self, key: &CacheKey) -> Option<Arc<ProbeOutcome>> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => return Some(Arc::clone(&entry.outcome)),
            Some(_) => {}
            None => return None,
        }
        entries.pop(key);
        debug!(target = %key.target, zone = %key.zone, kind = %key.kind, "cache entry expired");
        None
    }

    /// Insert or replace the outcome for `key`
    pub async fn put(&self, key: CacheKey, outcome: ProbeOutcome) -> Arc<ProbeOutcome> {
        let ttl = if outcome.status == ProbeStatus::Error {
            self.error_ttl
        } else {
            self.ttl
        };
        let outcome = Arc::new(outcome);
        let now = Instant::now();
        let entry = CacheEntry {
            outcome: Arc::clone(&outcome),
            expires_at: now.checked_add(ttl).unwrap_or_else(|| now + FAR_FUTURE),
        };

        let mut entries = self.entries.lock().await;
        if let Some((evicted, _)) = entries.push(key.clone(), entry) {
            if evicted != key {
                debug!(target = %evicted.target, zone = %evicted.zone, "cache full, evicted LRU entry");
            }
        }
        outcome
    }

    /// Drop every entry
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Remove expired entries; returns how many were dropped
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let expired: Vec<CacheKey> = entries
            .iter()
            .filter(|(_, entry)| !entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }

    /// Current size (live entries), capacity and TTL
    pub async fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        CacheStats {
            size: entries.iter().filter(|(_, entry)| entry.is_live(now)).count(),
            max_size: self.max_size.get(),
            ttl_secs: self.ttl.as_secs(),
        }
    }

    /// Entries physically held, expired or not
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns true if nothing is held
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
