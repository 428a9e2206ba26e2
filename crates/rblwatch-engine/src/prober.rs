//! Zone prober: one (target, zone) check.
//!
//! Cache first, then a rate-limited A query under the probe deadline,
//! classification, and an optional best-effort TXT lookup for listings.

use std::sync::Arc;
use std::time::Duration;

use rblwatch_core::{ProbeOutcome, ProbeStatus, RecordKind, Result, Zone};
use tokio::time::{timeout_at, Instant};
use tracing::debug;

use crate::cache::{CacheKey, ResultCache};
use crate::classify::classify;
use crate::config::EngineConfig;
use crate::encoding::query_name;
use crate::ratelimit::ZoneRateLimiter;
use crate::resolver::{DnsLookup, HickoryLookup, Resolution};

/// Reason recorded when a probe exceeds its deadline.
pub const TIMEOUT_REASON: &str = "timeout";

/// Checks single (target, zone) pairs against the shared cache and limiter.
#[derive(Clone)]
pub struct ZoneProber {
    lookup: Arc<dyn DnsLookup>,
    cache: Arc<ResultCache>,
    limiter: Arc<ZoneRateLimiter>,
}

impl ZoneProber {
    /// Prober over explicit collaborators.
    pub fn new(lookup: Arc<dyn DnsLookup>, cache: Arc<ResultCache>, limiter: Arc<ZoneRateLimiter>) -> Self {
        Self {
            lookup,
            cache,
            limiter,
        }
    }

    /// Prober using hickory, a fresh cache and limiter built from `config`.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            Arc::new(HickoryLookup::from_config(&config.dns)?),
            Arc::new(ResultCache::from_config(&config.cache)?),
            Arc::new(ZoneRateLimiter::from_config(&config.dns)?),
        ))
    }

    /// Shared result cache.
    #[must_use]
    pub const fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Shared per-zone limiter.
    #[must_use]
    pub const fn limiter(&self) -> &Arc<ZoneRateLimiter> {
        &self.limiter
    }

    /// Check `target` against `zone`.
    ///
    /// A cached A outcome short-circuits everything; TXT may still be
    /// fetched for a cached listing without touching the cached A entry.
    /// `deadline` bounds the DNS work of this probe, not the rate-limit wait.
    pub async fn probe(&self, target: &str, zone: &Zone, include_txt: bool, deadline: Duration) -> ProbeOutcome {
        let key = CacheKey::new(target, &zone.name, RecordKind::A);

        if let Some(cached) = self.cache.get(&key).await {
            debug!(target, zone = %zone.name, status = %cached.status, "cache hit");
            if include_txt && cached.status == ProbeStatus::Listed && cached.txt.is_none() {
                if let Some(txt) = self.cached_txt(target, zone).await {
                    return cached.with_txt(txt);
                }
                let _permit = self.limiter.acquire(&zone.name).await;
                if let Some(txt) = self.fetch_txt(target, zone, Instant::now() + deadline).await {
                    return cached.with_txt(txt);
                }
            }
            return (*cached).clone();
        }

        let _permit = self.limiter.acquire(&zone.name).await;
        let expires = Instant::now() + deadline;
        let name = query_name(target, &zone.name);

        let resolution = match timeout_at(expires, self.lookup.resolve(&name, RecordKind::A, deadline)).await {
            Ok(resolution) => resolution,
            Err(_) => Resolution::Failure(TIMEOUT_REASON.into()),
        };
        let classified = classify(zone, &resolution);
        debug!(target, zone = %zone.name, status = %classified.status, "probe classified");

        let outcome = ProbeOutcome::new(
            target,
            &zone.name,
            classified.status,
            classified.addresses,
            classified.reason,
        );
        let stored = self.cache.put(key, outcome).await;

        if include_txt && stored.status == ProbeStatus::Listed {
            let txt = match self.cached_txt(target, zone).await {
                Some(txt) => Some(txt),
                None => self.fetch_txt(target, zone, expires).await,
            };
            if let Some(txt) = txt {
                return stored.with_txt(txt);
            }
        }
        (*stored).clone()
    }

    async fn cached_txt(&self, target: &str, zone: &Zone) -> Option<Vec<String>> {
        let key = CacheKey::new(target, &zone.name, RecordKind::Txt);
        self.cache.get(&key).await.and_then(|hit| hit.txt.clone())
    }

    /// Best-effort TXT lookup that must finish by `expires`.
    async fn fetch_txt(&self, target: &str, zone: &Zone, expires: Instant) -> Option<Vec<String>> {
        let remaining = expires.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return None;
        }
        let name = query_name(target, &zone.name);
        match timeout_at(expires, self.lookup.resolve(&name, RecordKind::Txt, remaining)).await {
            Ok(Resolution::Records(txt)) if !txt.is_empty() => {
                let entry = ProbeOutcome {
                    txt: Some(txt.clone()),
                    ..ProbeOutcome::new(target, &zone.name, ProbeStatus::Listed, Vec::new(), None)
                };
                self.cache
                    .put(CacheKey::new(target, &zone.name, RecordKind::Txt), entry)
                    .await;
                Some(txt)
            }
            Ok(other) => {
                debug!(target, zone = %zone.name, result = ?other, "no TXT data");
                None
            }
            Err(_) => {
                debug!(target, zone = %zone.name, "TXT lookup timed out");
                None
            }
        }
    }
}
