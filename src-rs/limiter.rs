//! Token bucket store: one bucket per client key behind a single lock.

use std::{
    collections::{hash_map::Entry, HashMap},
    time::{Duration, Instant},
};

use parking_lot::Mutex;

#[derive(Debug)]
struct TokenBucket {
    tokens: u32,
    last_refill: Instant,
}

/// Per-key token bucket rate limiter.
///
/// Buckets are created lazily on the first request for a key and refilled in
/// whole-minute increments of `rate`, capped at `burst`. One mutex guards the
/// whole mapping; admission checks for all keys serialize through it, which
/// keeps the eviction sweep trivially correct.
#[derive(Debug)]
pub struct RateLimiter {
    rate: u32,
    burst: u32,
    buckets: Mutex<HashMap<String, TokenBucket>>,
}

impl RateLimiter {
    /// `rate` is tokens granted per elapsed whole minute, `burst` the bucket
    /// capacity and the size of the initial grant.
    pub fn new(rate: u32, burst: u32) -> Self {
        Self {
            rate,
            burst,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Checks whether a request for `key` is admitted, consuming a token if so.
    ///
    /// Never blocks beyond lock acquisition; deny is a normal outcome, not an
    /// error.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut buckets = self.buckets.lock();

        let bucket = match buckets.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                // First request for this key consumes its token immediately.
                slot.insert(TokenBucket {
                    tokens: self.burst.saturating_sub(1),
                    last_refill: now,
                });
                return true;
            }
            Entry::Occupied(slot) => slot.into_mut(),
        };

        // Refill in whole minutes only. Fractional minutes grant nothing and
        // leave the refill timer untouched; when a refill does land, the timer
        // resets even if the grant was clamped away by the burst ceiling.
        let elapsed = now.saturating_duration_since(bucket.last_refill);
        let tokens_to_add = (elapsed.as_secs() / 60) * u64::from(self.rate);
        if tokens_to_add > 0 {
            bucket.tokens =
                (u64::from(bucket.tokens) + tokens_to_add).min(u64::from(self.burst)) as u32;
            bucket.last_refill = now;
        }

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Removes every bucket idle strictly longer than `idle_cutoff`, returning
    /// the number removed. A later request for an evicted key recreates its
    /// bucket from scratch with a full budget.
    pub fn evict_idle(&self, idle_cutoff: Duration) -> usize {
        self.evict_idle_at(Instant::now(), idle_cutoff)
    }

    fn evict_idle_at(&self, now: Instant, idle_cutoff: Duration) -> usize {
        let mut buckets = self.buckets.lock();
        let before = buckets.len();
        buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_refill) <= idle_cutoff);
        before - buckets.len()
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.buckets.lock().len()
    }

    /// Tokens remaining for `key`, or `None` if no bucket exists for it.
    pub fn available_tokens(&self, key: &str) -> Option<u32> {
        self.buckets.lock().get(key).map(|bucket| bucket.tokens)
    }
}
