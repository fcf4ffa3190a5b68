//! TTL memoization with per-key single flight.

use super::clock::{Clock, SystemClock};
use super::key::CacheKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default time-to-live for cached entry points.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// What to do when the producer fails and an expired value is still held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalePolicy {
    /// Propagate the failure.
    #[default]
    FailHard,
    /// Return the expired value and keep it until a producer succeeds.
    ServeStale,
}

/// One memoized value.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: CacheKey,
    pub value: V,
    pub computed_at: Instant,
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

type Slot<V> = Arc<Mutex<Option<CacheEntry<V>>>>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// TTL cache keyed by call signature.
///
/// Each key owns a slot mutex held for the duration of the producer call,
/// so concurrent callers of the same key wait for the first computation
/// instead of repeating it. Different keys never block each other.
/// Expiry is checked on access.
#[derive(Debug)]
pub struct TtlCache<V> {
    ttl: Duration,
    stale_policy: StalePolicy,
    clock: Arc<dyn Clock>,
    slots: Mutex<HashMap<CacheKey, Slot<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            stale_policy: StalePolicy::default(),
            clock,
            slots: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn with_stale_policy(mut self, policy: StalePolicy) -> Self {
        self.stale_policy = policy;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn slot(&self, key: &CacheKey) -> Slot<V> {
        let mut slots = lock(&self.slots);
        if let Some(slot) = slots.get(key) {
            return slot.clone();
        }
        self.prune(&mut slots);
        slots.entry(key.clone()).or_default().clone()
    }

    /// Drop slots that hold nothing worth keeping.
    ///
    /// Slots are only cloned under the map lock, so a strong count of one
    /// means no caller is waiting on or computing into it.
    fn prune(&self, slots: &mut HashMap<CacheKey, Slot<V>>) {
        let before = slots.len();
        slots.retain(|_, slot| Arc::strong_count(slot) > 1 || self.keeps(slot));
        let dropped = before - slots.len();
        if dropped > 0 {
            debug!(dropped, remaining = slots.len(), "pruned expired cache slots");
        }
    }

    fn keeps(&self, slot: &Mutex<Option<CacheEntry<V>>>) -> bool {
        let Ok(guard) = slot.try_lock() else {
            return true;
        };
        match guard.as_ref() {
            Some(entry) => self.is_fresh(entry) || self.stale_policy == StalePolicy::ServeStale,
            None => false,
        }
    }

    fn is_fresh(&self, entry: &CacheEntry<V>) -> bool {
        self.clock.now().duration_since(entry.computed_at) < self.ttl
    }

    /// Cached value for `key` if fresh, otherwise run `producer` and cache its
    /// success. Producer errors propagate unchanged and are never cached.
    pub fn get_or_compute<E, F>(&self, key: &CacheKey, producer: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
        E: std::fmt::Display,
    {
        let slot = self.slot(key);
        let mut guard = lock(&slot);

        if let Some(entry) = guard.as_ref() {
            if self.is_fresh(entry) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(%key, "cache hit");
                return Ok(entry.value.clone());
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(%key, "cache miss");
        match producer() {
            Ok(value) => {
                *guard = Some(CacheEntry {
                    key: key.clone(),
                    value: value.clone(),
                    computed_at: self.clock.now(),
                });
                Ok(value)
            }
            Err(e) => match (self.stale_policy, guard.as_ref()) {
                (StalePolicy::ServeStale, Some(stale)) => {
                    warn!(%key, error = %e, "producer failed, serving stale value");
                    Ok(stale.value.clone())
                }
                _ => Err(e),
            },
        }
    }

    /// Fresh cached value without computing.
    pub fn peek(&self, key: &CacheKey) -> Option<V> {
        let slot = lock(&self.slots).get(key).cloned()?;
        let guard = lock(&slot);
        guard
            .as_ref()
            .filter(|e| self.is_fresh(e))
            .map(|e| e.value.clone())
    }

    pub fn invalidate(&self, key: &CacheKey) -> bool {
        lock(&self.slots).remove(key).is_some()
    }

    pub fn clear(&self) {
        lock(&self.slots).clear();
    }

    /// Number of keys currently held.
    ///
    /// Expired and failed keys linger until the next new key is inserted.
    /// Under [`StalePolicy::ServeStale`] expired values are kept.
    pub fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
