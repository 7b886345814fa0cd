//! Fixed window request counting keyed by (address, endpoint).
//!
//! [`CountingStore`] is the contract the limiter function depends on: one call
//! atomically creates or increments the caller's bucket and reports whether the
//! caller is still within budget. [`InMemoryStore`] implements it in-process;
//! [`crate::postgrest::PostgrestStore`] delegates it to the hosted database.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::clock::{Clock, SystemClock};
use crate::error::LimiterError;
use crate::metrics::TRACKED_BUCKETS;
use crate::models::RateLimitDecision;

pub const DEFAULT_MAX_REQUESTS: i64 = 100;
pub const DEFAULT_WINDOW_MINUTES: i64 = 1;
/// Longest accepted window: one year
pub const MAX_WINDOW_MINUTES: i64 = 525_600;

// Bucket identity: one active bucket per pair
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BucketKey {
    pub address: String,
    pub endpoint: String,
}

impl BucketKey {
    pub fn new(address: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            endpoint: endpoint.into(),
        }
    }
}

/// Counting record for the current window of one (address, endpoint) pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitBucket {
    pub window_start: DateTime<Utc>,
    pub request_count: i64,
    /// Window length used by the most recent call
    pub window: TimeDelta,
}

impl RateLimitBucket {
    fn fresh(now: DateTime<Utc>, window: TimeDelta) -> Self {
        Self {
            window_start: now,
            request_count: 1,
            window,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, window: TimeDelta) -> bool {
        now - self.window_start >= window
    }

    pub fn reset_at(&self) -> DateTime<Utc> {
        self.window_start + self.window
    }

    pub fn decide(&self, max_requests: i64) -> RateLimitDecision {
        RateLimitDecision {
            allowed: self.request_count <= max_requests,
            remaining: max_requests.saturating_sub(self.request_count).max(0),
            reset_at: self.reset_at(),
        }
    }
}

/// Converts a policy window to a duration, rejecting lengths outside
/// `1..=MAX_WINDOW_MINUTES`.
pub fn window_length(window_minutes: i64) -> Result<TimeDelta, LimiterError> {
    if !(1..=MAX_WINDOW_MINUTES).contains(&window_minutes) {
        return Err(LimiterError::InvalidWindow(window_minutes));
    }
    TimeDelta::try_minutes(window_minutes).ok_or(LimiterError::InvalidWindow(window_minutes))
}

#[async_trait]
pub trait CountingStore: Send + Sync {
    /// Counts one request for `(address, endpoint)` and returns the decision.
    ///
    /// Must be atomic per identity: concurrent calls never under-count.
    async fn check_rate_limit(
        &self,
        address: &str,
        endpoint: &str,
        max_requests: i64,
        window_minutes: i64,
    ) -> Result<RateLimitDecision, LimiterError>;

    /// Drops buckets whose window ended more than `retention` ago.
    ///
    /// Returns the number removed when the backend can tell.
    async fn cleanup_expired(&self, retention: TimeDelta) -> Result<Option<usize>, LimiterError>;
}

/// In-process store. Each read-modify-write runs under the map's entry lock.
pub struct InMemoryStore {
    buckets: DashMap<BucketKey, RateLimitBucket>,
    // tracked on insert/remove so checks never lock every shard
    tracked: AtomicUsize,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: DashMap::new(),
            tracked: AtomicUsize::new(0),
            clock,
        }
    }

    pub fn bucket(&self, key: &BucketKey) -> Option<RateLimitBucket> {
        self.buckets.get(key).map(|bucket| bucket.clone())
    }

    pub fn len(&self) -> usize {
        self.tracked.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn increment(
        &self,
        address: &str,
        endpoint: &str,
        max_requests: i64,
        window_minutes: i64,
    ) -> Result<RateLimitDecision, LimiterError> {
        let window = window_length(window_minutes)?;
        let now = self.clock.now();
        if now.checked_add_signed(window).is_none() {
            return Err(LimiterError::InvalidWindow(window_minutes));
        }

        let decision = match self.buckets.entry(BucketKey::new(address, endpoint)) {
            Entry::Occupied(mut occupied) => {
                let bucket = occupied.get_mut();
                // expired window? start over
                if bucket.is_expired(now, window) {
                    *bucket = RateLimitBucket::fresh(now, window);
                } else {
                    bucket.request_count = bucket.request_count.saturating_add(1);
                    bucket.window = window;
                }
                bucket.decide(max_requests)
            }
            Entry::Vacant(vacant) => {
                let tracked = self.tracked.fetch_add(1, Ordering::Relaxed) + 1;
                TRACKED_BUCKETS.set(tracked as f64);
                vacant
                    .insert(RateLimitBucket::fresh(now, window))
                    .decide(max_requests)
            }
        };

        Ok(decision)
    }

    pub fn sweep(&self, retention: TimeDelta) -> usize {
        let now = self.clock.now();
        let mut removed = 0;

        self.buckets.retain(|_, bucket| {
            let stale_at = bucket
                .window_start
                .checked_add_signed(bucket.window)
                .and_then(|end| end.checked_add_signed(retention));
            let keep = match stale_at {
                Some(stale_at) => now < stale_at,
                None => true,
            };
            if !keep {
                removed += 1;
            }
            keep
        });

        let tracked = self.tracked.fetch_sub(removed, Ordering::Relaxed) - removed;
        TRACKED_BUCKETS.set(tracked as f64);
        removed
    }
}

#[async_trait]
impl CountingStore for InMemoryStore {
    async fn check_rate_limit(
        &self,
        address: &str,
        endpoint: &str,
        max_requests: i64,
        window_minutes: i64,
    ) -> Result<RateLimitDecision, LimiterError> {
        self.increment(address, endpoint, max_requests, window_minutes)
    }

    async fn cleanup_expired(&self, retention: TimeDelta) -> Result<Option<usize>, LimiterError> {
        Ok(Some(self.sweep(retention)))
    }
}
