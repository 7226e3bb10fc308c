//! Per-identity rate limiting with greedy token buckets.
//!
//! # Design Decisions
//! - One bucket per identity key, created lazily at full capacity
//! - Buckets live in a sharded map; each bucket has its own lock, so the
//!   refill-and-consume step for one key is atomic while distinct keys
//!   never wait on each other
//! - Callers pass `now` explicitly, which keeps admission deterministic in tests
//! - Buckets are kept forever unless sweeping is enabled; the sweep only drops
//!   buckets that have been idle long enough to be full again

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// Bucket sizing shared by every identity.
///
/// Tokens are held in fixed point: one token is worth `window` expressed in
/// nanoseconds, and every elapsed nanosecond restores `refill_tokens` units.
/// Refill is therefore exact integer arithmetic with no accumulated rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketLimits {
    pub capacity: u32,
    /// Tokens restored per `window`.
    pub refill_tokens: u32,
    pub window: Duration,
}

impl BucketLimits {
    pub fn new(capacity: u32, refill_tokens: u32, window: Duration) -> Self {
        Self {
            capacity,
            refill_tokens,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.capacity,
            config.refill_tokens,
            Duration::from_secs(config.window_secs),
        )
    }

    /// Fixed-point units in one whole token.
    fn token_units(&self) -> u128 {
        self.window.as_nanos().max(1)
    }

    fn capacity_units(&self) -> u128 {
        u128::from(self.capacity).saturating_mul(self.token_units())
    }

    /// Time for an empty bucket to become full again.
    pub fn full_refill_time(&self) -> Duration {
        if self.refill_tokens == 0 {
            return Duration::MAX;
        }
        let rate = u128::from(self.refill_tokens);
        let nanos = self.capacity_units().div_ceil(rate);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

/// A simple token bucket.
#[derive(Debug)]
struct TokenBucket {
    units: u128,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(limits: &BucketLimits, now: Instant) -> Self {
        Self {
            units: limits.capacity_units(),
            last_refill: now,
        }
    }

    fn refill(&mut self, now: Instant, limits: &BucketLimits) {
        // Concurrent callers may read the clock in one order and take the lock
        // in another; time never runs backwards for a bucket.
        let elapsed = now.saturating_duration_since(self.last_refill).as_nanos();
        let restored = elapsed.saturating_mul(u128::from(limits.refill_tokens));
        self.units = self
            .units
            .saturating_add(restored)
            .min(limits.capacity_units());
        if now > self.last_refill {
            self.last_refill = now;
        }
    }

    fn try_acquire(&mut self, now: Instant, limits: &BucketLimits) -> bool {
        self.refill(now, limits);

        let token = limits.token_units();
        if self.units >= token {
            self.units -= token;
            true
        } else {
            false
        }
    }

    fn tokens(&self, limits: &BucketLimits) -> f64 {
        self.units as f64 / limits.token_units() as f64
    }
}

type SharedBucket = Arc<Mutex<TokenBucket>>;

/// Admission control keyed by identity.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<String, SharedBucket>,
    limits: BucketLimits,
    enabled: bool,
}

impl RateLimiter {
    pub fn new(limits: BucketLimits) -> Self {
        Self {
            buckets: DashMap::new(),
            limits,
            enabled: true,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            enabled: config.enabled,
            ..Self::new(BucketLimits::from_config(config))
        }
    }

    /// Admit one request for `key` at `now`, consuming a token if one is available.
    pub fn try_admit(&self, key: &str, now: Instant) -> bool {
        if !self.enabled {
            return true;
        }

        let bucket = self.bucket_for(key, now);
        let mut bucket = bucket.lock().unwrap_or_else(PoisonError::into_inner);
        bucket.try_acquire(now, &self.limits)
    }

    /// Tokens currently available to `key`, refilled to `now`. None if never seen.
    pub fn available(&self, key: &str, now: Instant) -> Option<f64> {
        let bucket = self.buckets.get(key)?.value().clone();
        let mut bucket = bucket.lock().unwrap_or_else(PoisonError::into_inner);
        bucket.refill(now, &self.limits);
        Some(bucket.tokens(&self.limits))
    }

    /// Number of identities with a bucket.
    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }

    fn bucket_for(&self, key: &str, now: Instant) -> SharedBucket {
        // Fast path only takes a shard read lock.
        if let Some(bucket) = self.buckets.get(key) {
            return bucket.value().clone();
        }

        let limits = self.limits;
        self.buckets
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(TokenBucket::new(&limits, now))))
            .value()
            .clone()
    }

    /// Drop buckets that would be full by `now` and that no request is using.
    ///
    /// A full idle bucket is indistinguishable from a fresh one, so removal
    /// never hands an active caller extra quota. Returns the number removed.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let before = self.buckets.len();
        let full_after = self.limits.full_refill_time();

        self.buckets.retain(|_, bucket| {
            // The shard is write-locked here, so nobody can clone the Arc from
            // the map; an extra count means a request already holds it.
            if Arc::strong_count(bucket) > 1 {
                return true;
            }
            let bucket = bucket.lock().unwrap_or_else(PoisonError::into_inner);
            now.saturating_duration_since(bucket.last_refill) < full_after
        });

        before.saturating_sub(self.buckets.len())
    }

    /// Periodically evict idle buckets until shutdown.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(interval_secs = interval.as_secs(), "Rate limit sweeper starting");
            let mut ticker = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = self.evict_idle(Instant::now());
                        let remaining = self.tracked_keys();
                        metrics::record_bucket_count(remaining);
                        if evicted > 0 {
                            tracing::debug!(evicted, remaining, "Evicted idle rate limit buckets");
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("Rate limit sweeper received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn limiter() -> RateLimiter {
        RateLimiter::from_config(&RateLimitConfig::default())
    }

    #[test]
    fn test_capacity_then_reject() {
        let limiter = limiter();
        let now = Instant::now();

        for i in 0..10 {
            assert!(limiter.try_admit("alice", now), "request {} should pass", i + 1);
        }
        assert!(!limiter.try_admit("alice", now));
    }

    #[test]
    fn test_identities_are_independent() {
        let limiter = limiter();
        let now = Instant::now();

        for _ in 0..10 {
            assert!(limiter.try_admit("u1", now));
        }
        assert!(!limiter.try_admit("u1", now));
        assert!(limiter.try_admit("u2", now));
        assert_eq!(limiter.tracked_keys(), 2);
    }

    #[test]
    fn test_greedy_refill() {
        let limiter = limiter();
        let start = Instant::now();

        for _ in 0..10 {
            assert!(limiter.try_admit("alice", start));
        }
        assert!(!limiter.try_admit("alice", start + Duration::from_secs(5)));

        // 10 tokens per 60s: a little over one token back after 7 seconds.
        assert!(limiter.try_admit("alice", start + Duration::from_secs(7)));
        assert!(!limiter.try_admit("alice", start + Duration::from_secs(7)));
    }

    #[test]
    fn test_polling_drained_bucket_refills_exactly() {
        let limiter = limiter();
        let start = Instant::now();

        for _ in 0..10 {
            assert!(limiter.try_admit("alice", start));
        }
        for secs in 1..=5 {
            assert!(!limiter.try_admit("alice", start + Duration::from_secs(secs)));
        }

        // 10 tokens per 60s: exactly one token after 6 seconds, however often polled.
        let six = start + Duration::from_secs(6);
        assert_eq!(limiter.available("alice", six), Some(1.0));
        assert!(limiter.try_admit("alice", six));
        assert!(!limiter.try_admit("alice", six));
    }

    #[test]
    fn test_custom_limits() {
        let limiter = RateLimiter::new(BucketLimits::new(2, 1, Duration::from_secs(3)));
        let start = Instant::now();

        assert!(limiter.try_admit("bob", start));
        assert!(limiter.try_admit("bob", start));
        assert!(!limiter.try_admit("bob", start + Duration::from_millis(2999)));
        assert!(limiter.try_admit("bob", start + Duration::from_secs(3)));
        assert_eq!(
            BucketLimits::new(2, 1, Duration::from_secs(3)).full_refill_time(),
            Duration::from_secs(6)
        );
    }

    #[test]
    fn test_refill_caps_at_capacity() {
        let limiter = limiter();
        let start = Instant::now();
        assert!(limiter.try_admit("alice", start));

        let later = start + Duration::from_secs(3600);
        let available = limiter.available("alice", later).unwrap();
        assert!((available - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_out_of_order_clock_does_not_refill() {
        let limiter = limiter();
        let later = Instant::now() + Duration::from_secs(30);
        for _ in 0..10 {
            assert!(limiter.try_admit("alice", later));
        }
        assert!(!limiter.try_admit("alice", later - Duration::from_secs(10)));
    }

    #[test]
    fn test_disabled_admits_everything() {
        let config = RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        };
        let limiter = RateLimiter::from_config(&config);
        let now = Instant::now();
        for _ in 0..100 {
            assert!(limiter.try_admit("alice", now));
        }
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn test_evicts_only_full_idle_buckets() {
        let limiter = limiter();
        let start = Instant::now();

        for _ in 0..10 {
            limiter.try_admit("busy", start);
        }
        limiter.try_admit("idle", start);

        // Neither bucket has sat idle for a full refill period yet.
        assert_eq!(limiter.evict_idle(start + Duration::from_secs(30)), 0);

        limiter.try_admit("busy", start + Duration::from_secs(55));
        assert_eq!(limiter.evict_idle(start + Duration::from_secs(61)), 1);
        assert!(limiter.available("idle", start).is_none());
        assert!(limiter.available("busy", start + Duration::from_secs(61)).is_some());
    }

    #[test]
    fn test_eviction_skips_bucket_in_use() {
        let limiter = limiter();
        let start = Instant::now();
        limiter.try_admit("alice", start);

        let held = limiter.bucket_for("alice", start);
        assert_eq!(limiter.evict_idle(start + Duration::from_secs(600)), 0);
        drop(held);
        assert_eq!(limiter.evict_idle(start + Duration::from_secs(600)), 1);
    }

    #[test]
    fn test_threads_never_over_admit() {
        let limiter = limiter();
        let now = Instant::now();
        let admitted = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..32 {
                s.spawn(|| {
                    for _ in 0..4 {
                        if limiter.try_admit("shared", now) {
                            admitted.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        assert_eq!(admitted.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_callers_get_exactly_remaining_tokens() {
        let limiter = Arc::new(limiter());
        let now = Instant::now();

        // Spend 3 up front; 7 remain.
        for _ in 0..3 {
            assert!(limiter.try_admit("stress", now));
        }

        let mut tasks = Vec::new();
        for _ in 0..200 {
            let limiter = limiter.clone();
            tasks.push(tokio::spawn(async move { limiter.try_admit("stress", now) }));
        }

        let mut admitted = 0;
        for task in tasks {
            if task.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_within_remaining_all_pass() {
        let limiter = Arc::new(limiter());
        let now = Instant::now();

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.try_admit("fits", now) })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_shutdown() {
        let limiter = Arc::new(limiter());
        let (tx, rx) = broadcast::channel(1);
        let handle = limiter.clone().spawn_sweeper(Duration::from_millis(10), rx);

        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper should exit")
            .unwrap();
    }
}
