//! Per-zone query rate limiting.
//!
//! Every zone owns an independent GCRA token bucket (governor) with
//! capacity equal to its rate and continuous refill. Buckets start empty,
//! so a burst of `n` queries at rate `r` takes about `n / r` seconds.
//!
//! Waiters for the same zone queue on a fair (FIFO) async mutex before
//! polling the bucket, so no caller waits longer than it would under strict
//! FIFO service. A waiter that is dropped leaves the queue without
//! consuming a token.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;

use dashmap::DashMap;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use rblwatch_core::{RblError, Result};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::DnsConfig;

/// Proof that one token was taken from a zone's bucket.
#[derive(Debug)]
#[must_use]
pub struct ZonePermit {
    _private: (),
}

struct ZoneBucket {
    queue: Mutex<()>,
    limiter: DefaultDirectRateLimiter,
}

impl ZoneBucket {
    fn new(rate: NonZeroU32) -> Self {
        let limiter = RateLimiter::direct(Quota::per_second(rate));
        // Drain the initial burst: the bucket fills from empty.
        let _ = limiter.check_n(rate);
        Self {
            queue: Mutex::new(()),
            limiter,
        }
    }
}

/// Token-bucket gate admitting at most N queries/second per zone.
pub struct ZoneRateLimiter {
    default_rate: NonZeroU32,
    overrides: HashMap<String, NonZeroU32>,
    buckets: DashMap<String, Arc<ZoneBucket>>,
}

impl ZoneRateLimiter {
    /// Limiter applying `rate` queries/second to every zone.
    pub fn new(rate: u32) -> Result<Self> {
        Ok(Self {
            default_rate: nonzero_rate(rate, "per-zone rate")?,
            overrides: HashMap::new(),
            buckets: DashMap::new(),
        })
    }

    /// Limiter built from `per_zone_rate` and `zone_rates`.
    pub fn from_config(config: &DnsConfig) -> Result<Self> {
        config
            .zone_rates
            .iter()
            .try_fold(Self::new(config.per_zone_rate)?, |limiter, (zone, rate)| {
                limiter.with_zone_rate(zone, *rate)
            })
    }

    /// Override the rate of a single zone.
    pub fn with_zone_rate(mut self, zone: impl Into<String>, rate: u32) -> Result<Self> {
        let zone = zone.into();
        let rate = nonzero_rate(rate, &zone)?;
        self.overrides.insert(zone, rate);
        Ok(self)
    }

    /// Configured rate for a zone.
    #[must_use]
    pub fn rate_for(&self, zone: &str) -> u32 {
        self.overrides
            .get(zone)
            .copied()
            .unwrap_or(self.default_rate)
            .get()
    }

    /// Wait until a token for `zone` is available and take it.
    ///
    /// Never rejects, only delays. Cancel-safe: dropping the future before
    /// it resolves consumes nothing.
    pub async fn acquire(&self, zone: &str) -> ZonePermit {
        let bucket = self.bucket(zone);
        let _turn = bucket.queue.lock().await;
        if bucket.limiter.check().is_err() {
            debug!(zone, "waiting for zone token");
            bucket.limiter.until_ready().await;
        }
        ZonePermit { _private: () }
    }

    /// Number of zones with an active bucket.
    #[must_use]
    pub fn zone_count(&self) -> usize {
        self.buckets.len()
    }

    fn bucket(&self, zone: &str) -> Arc<ZoneBucket> {
        if let Some(existing) = self.buckets.get(zone) {
            return Arc::clone(existing.value());
        }
        let rate = self.overrides.get(zone).copied().unwrap_or(self.default_rate);
        Arc::clone(
            self.buckets
                .entry(zone.to_string())
                .or_insert_with(|| Arc::new(ZoneBucket::new(rate)))
                .value(),
        )
    }
}

fn nonzero_rate(rate: u32, what: &str) -> Result<NonZeroU32> {
    NonZeroU32::new(rate).ok_or_else(|| RblError::Config(format!("rate for {what} must be positive")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_rejects_zero_rate() {
        assert!(ZoneRateLimiter::new(0).is_err());
        let limiter = ZoneRateLimiter::new(5).unwrap();
        assert!(limiter.with_zone_rate("zen.spamhaus.org", 0).is_err());
    }

    #[test]
    fn test_rate_overrides() {
        let mut config = DnsConfig::default();
        config.zone_rates.insert("zen.spamhaus.org".into(), 2);
        let limiter = ZoneRateLimiter::from_config(&config).unwrap();
        assert_eq!(limiter.rate_for("zen.spamhaus.org"), 2);
        assert_eq!(limiter.rate_for("bl.spamcop.net"), 10);
    }

    #[tokio::test]
    async fn test_continuous_refill() {
        let limiter = ZoneRateLimiter::new(20).unwrap();
        let start = Instant::now();
        for _ in 0..20 {
            let _permit = limiter.acquire("bl.spamcop.net").await;
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(900), "too fast: {elapsed:?}");
        assert!(elapsed < Duration::from_millis(1600), "too slow: {elapsed:?}");
    }

    #[tokio::test]
    async fn test_zones_are_independent() {
        let limiter = ZoneRateLimiter::new(5).unwrap();
        let start = Instant::now();
        let (_a, _b) = tokio::join!(
            limiter.acquire("bl.spamcop.net"),
            limiter.acquire("zen.spamhaus.org")
        );
        assert!(start.elapsed() < Duration::from_millis(400));
        assert_eq!(limiter.zone_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_the_rate() {
        let limiter = Arc::new(ZoneRateLimiter::new(40).unwrap());
        let start = Instant::now();
        let handles: Vec<_> = (0..40)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    let _permit = limiter.acquire("psbl.surriel.com").await;
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(900), "too fast: {elapsed:?}");
        assert!(elapsed < Duration::from_millis(1600), "too slow: {elapsed:?}");
    }

    #[tokio::test]
    async fn test_cancelled_wait_consumes_nothing() {
        let limiter = ZoneRateLimiter::new(2).unwrap();
        let start = Instant::now();

        // Token 1 arrives ~500ms after the bucket is created.
        let _first = limiter.acquire("bl.spamcop.net").await;

        // Abandon a waiter long before token 2 is due.
        let abandoned =
            tokio::time::timeout(Duration::from_millis(50), limiter.acquire("bl.spamcop.net")).await;
        assert!(abandoned.is_err());

        // Token 2 is still available at ~1s, not pushed back to ~1.5s.
        let _second = limiter.acquire("bl.spamcop.net").await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(900), "too fast: {elapsed:?}");
        assert!(elapsed < Duration::from_millis(1300), "token was consumed: {elapsed:?}");
    }

    #[tokio::test]
    async fn test_thirty_acquires_at_thirty_per_second() {
        let limiter = Arc::new(ZoneRateLimiter::new(30).unwrap());
        let start = Instant::now();
        let handles: Vec<_> = (0..30)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    let _permit = limiter.acquire("bl.spamcop.net").await;
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(990), "too fast: {elapsed:?}");
        assert!(elapsed <= Duration::from_millis(1200), "too slow: {elapsed:?}");
    }

    #[tokio::test]
    #[ignore = "takes ten seconds"]
    async fn test_hundred_probes_at_ten_per_second() {
        let limiter = Arc::new(ZoneRateLimiter::new(10).unwrap());
        let start = Instant::now();
        let handles: Vec<_> = (0..100)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    let _permit = limiter.acquire("bl.spamcop.net").await;
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(9900), "too fast: {elapsed:?}");
        assert!(elapsed <= Duration::from_secs(11), "too slow: {elapsed:?}");
    }
}
