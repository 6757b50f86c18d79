//! # Time-Bounded Cache
//!
//! Injectable cache and clock used by the exchange rate provider and the
//! postal resolver.
//!
//! ## Locking
//! ```text
//! get()  ── read lock ── clone Arc<Entry> ── unlock ── check expiry
//! set()  ── write lock ── evict expired / oldest ── insert ── unlock
//! ```
//! Locks are never held while the caller does I/O; a refresh race costs at
//! most one redundant fetch.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};
use std::time::Duration;

// =============================================================================
// Clock
// =============================================================================

/// Source of "now" for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Used by tests.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock {
            now: RwLock::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
        *now = *now + to_chrono(by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

fn to_chrono(duration: Duration) -> ChronoDuration {
    ChronoDuration::from_std(duration).unwrap_or(ChronoDuration::MAX)
}

// =============================================================================
// Cache Trait
// =============================================================================

/// Key/value cache with per-entry time to live.
pub trait Cache<K, V>: Send + Sync {
    /// Returns a fresh value, or `None` if absent or expired.
    fn get(&self, key: &K) -> Option<V>;

    fn set(&self, key: K, value: V, ttl: Duration);

    fn remove(&self, key: &K);
}

// =============================================================================
// TTL Cache
// =============================================================================

#[derive(Debug)]
struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
    seq: u64,
}

#[derive(Debug)]
struct Inner<K, V> {
    entries: HashMap<K, Arc<Entry<V>>>,
    next_seq: u64,
}

/// In-memory [`Cache`] with a size cap; when full, expired entries go
/// first, then the oldest insertion.
pub struct TtlCache<K, V> {
    inner: RwLock<Inner<K, V>>,
    capacity: usize,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// `capacity` of zero is treated as one.
    pub fn new(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        TtlCache {
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                next_seq: 0,
            }),
            capacity: capacity.max(1),
            clock,
        }
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<K, V> Cache<K, V> for TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<V> {
        let entry = {
            let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
            inner.entries.get(key).cloned()
        }?;
        if self.clock.now() < entry.expires_at {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    fn set(&self, key: K, value: V, ttl: Duration) {
        let now = self.clock.now();
        let expires_at = now.checked_add_signed(to_chrono(ttl)).unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.capacity {
            inner.entries.retain(|_, entry| entry.expires_at > now);
            while inner.entries.len() >= self.capacity {
                let oldest = inner
                    .entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.seq)
                    .map(|(k, _)| k.clone());
                match oldest {
                    Some(k) => {
                        inner.entries.remove(&k);
                    }
                    None => break,
                }
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            key,
            Arc::new(Entry {
                value,
                expires_at,
                seq,
            }),
        );
    }

    fn remove(&self, key: &K) {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .remove(key);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
