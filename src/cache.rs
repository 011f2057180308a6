//! Capacity-bounded LRU cache with per-entry expiry.
//!
//! Recency is tracked by [`lru::LruCache`]; expiry is checked lazily on read.
//! Time comes from [`tokio::time::Instant`] so tests can pause and advance the
//! clock.

use lru::LruCache;
use serde::Serialize;
use std::hash::Hash;
use std::num::NonZeroUsize;
use tokio::time::{Duration, Instant};

/// Default number of entries a cache holds.
pub const DEFAULT_MAX_SIZE: usize = 50;

/// Default time-to-live for cached entries.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    expires_at: Instant,
    last_accessed: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// Hit/miss counters and occupancy of a [`TtlCache`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_ratio: f64,
}

/// Timing information about one live entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryInfo {
    /// Time since the entry was stored
    pub age: Duration,
    /// Time since the entry was last read or written
    pub idle: Duration,
    /// Time left before the entry expires
    pub remaining: Duration,
}

/// LRU cache whose entries expire after a TTL.
///
/// Not internally synchronized: owners wrap it in a mutex and never hold the
/// lock across an `.await`.
pub struct TtlCache<K: Hash + Eq, V> {
    entries: LruCache<K, CacheEntry<V>>,
    default_ttl: Duration,
    sweep_on_overflow: bool,
    hits: u64,
    misses: u64,
}

impl<K: Hash + Eq, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("len", &self.entries.len())
            .field("capacity", &self.entries.cap())
            .field("default_ttl", &self.default_ttl)
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .finish()
    }
}

impl<K: Hash + Eq + Clone, V: Clone> TtlCache<K, V> {
    /// Create a cache holding at most `max_size` entries (at least one).
    pub fn new(max_size: usize, default_ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            default_ttl,
            sweep_on_overflow: false,
            hits: 0,
            misses: 0,
        }
    }

    /// Purge expired entries before evicting a live one when full.
    pub fn with_overflow_sweep(mut self) -> Self {
        self.sweep_on_overflow = true;
        self
    }

    /// Store `value` under `key` with the default TTL.
    pub fn insert(&mut self, key: K, value: V) {
        let ttl = self.default_ttl;
        self.set(key, value, ttl);
    }

    /// Store `value` under `key`, expiring after `ttl`.
    ///
    /// When the cache is full and `key` is new, the least recently accessed
    /// entry is evicted.
    pub fn set(&mut self, key: K, value: V, ttl: Duration) {
        let now = Instant::now();

        if self.sweep_on_overflow
            && !self.entries.contains(&key)
            && self.entries.len() >= self.entries.cap().get()
        {
            let purged = self.purge_expired();
            tracing::trace!("Cache full, purged {} expired entries", purged);
        }

        self.entries.put(
            key,
            CacheEntry {
                value,
                created_at: now,
                expires_at: now + ttl,
                last_accessed: now,
            },
        );
    }

    /// Fetch a live entry, refreshing its recency.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let now = Instant::now();

        if let Some(entry) = self.entries.get_mut(key) {
            if !entry.is_expired(now) {
                entry.last_accessed = now;
                self.hits += 1;
                return Some(entry.value.clone());
            }
            self.entries.pop(key);
        }

        self.misses += 1;
        None
    }

    /// Whether a live entry exists. Does not affect recency or stats.
    pub fn has(&self, key: &K) -> bool {
        let now = Instant::now();
        self.entries
            .peek(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Timing of a live entry without touching recency.
    pub fn inspect(&self, key: &K) -> Option<EntryInfo> {
        let now = Instant::now();
        self.entries
            .peek(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| EntryInfo {
                age: now.duration_since(entry.created_at),
                idle: now.duration_since(entry.last_accessed),
                remaining: entry.expires_at.duration_since(now),
            })
    }

    /// Remove an entry. Returns whether it was present.
    pub fn delete(&mut self, key: &K) -> bool {
        self.entries.pop(key).is_some()
    }

    /// Remove every entry. Hit/miss counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Keep only entries whose key satisfies `keep`. Returns how many were removed.
    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) -> usize {
        let doomed: Vec<K> = self
            .entries
            .iter()
            .filter(|(key, _)| !keep(*key))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            self.entries.pop(key);
        }
        doomed.len()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.entries.pop(key);
        }
        expired.len()
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys of live entries, most recently used first.
    pub fn keys(&self) -> Vec<K> {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn stats(&self) -> CacheStats {
        let lookups = self.hits + self.misses;
        #[allow(clippy::cast_precision_loss)]
        let hit_ratio = if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        };

        CacheStats {
            size: self.entries.len(),
            capacity: self.entries.cap().get(),
            hits: self.hits,
            misses: self.misses,
            hit_ratio,
        }
    }
}
