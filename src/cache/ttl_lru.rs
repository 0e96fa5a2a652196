//! Bounded in-memory cache with TTL expiry and LRU eviction.
//!
//! Entries sit in a slab-backed doubly linked list ordered by recency
//! (head = most recently used) and are indexed by canonical key, so lookups,
//! promotion and eviction are O(1). A single mutex guards the list, the index
//! and the counters.
//!
//! An entry whose age exceeds the TTL is never returned. `get` removes it
//! lazily; `cleanup_expired` sweeps eagerly.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::clock::{Clock, SystemClock};
use super::key::CacheKey;
use super::stats::{CacheStats, Counters};

/// Default entry limit.
pub const DEFAULT_MAX_SIZE: usize = 1000;

/// Default time-to-live.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Node<V> {
    key: String,
    value: V,
    stored_at: Instant,
    prev: usize,
    next: usize,
}

#[derive(Debug)]
struct Inner<V> {
    index: HashMap<String, usize>,
    slots: Vec<Option<Node<V>>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    ttl: Duration,
    counters: Counters,
}

impl<V> Inner<V> {
    fn new(ttl: Duration) -> Self {
        Self {
            index: HashMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            ttl,
            counters: Counters::default(),
        }
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn node(&self, idx: usize) -> Option<&Node<V>> {
        self.slots.get(idx).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, idx: usize) -> Option<&mut Node<V>> {
        self.slots.get_mut(idx).and_then(Option::as_mut)
    }

    fn is_expired(&self, stored_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(stored_at) > self.ttl
    }

    /// Detach a node from the recency list, keeping its slot.
    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match self.node(idx) {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match self.node_mut(prev) {
            Some(p) => p.next = next,
            None => self.head = next,
        }
        match self.node_mut(next) {
            Some(n) => n.prev = prev,
            None => self.tail = prev,
        }

        if let Some(node) = self.node_mut(idx) {
            node.prev = NIL;
            node.next = NIL;
        }
    }

    /// Attach a detached node at the most recently used end.
    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(node) = self.node_mut(idx) {
            node.prev = NIL;
            node.next = old_head;
        }
        match self.node_mut(old_head) {
            Some(h) => h.prev = idx,
            None => self.tail = idx,
        }
        self.head = idx;
    }

    fn insert(&mut self, key: String, value: V, now: Instant) {
        let node = Node {
            key: key.clone(),
            value,
            stored_at: now,
            prev: NIL,
            next: NIL,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        self.index.insert(key, idx);
        self.push_front(idx);
    }

    fn remove_at(&mut self, idx: usize) -> Option<V> {
        self.unlink(idx);
        let node = self.slots.get_mut(idx)?.take()?;
        self.index.remove(&node.key);
        self.free.push(idx);
        Some(node.value)
    }

    fn remove(&mut self, key: &str) -> Option<V> {
        let idx = *self.index.get(key)?;
        self.remove_at(idx)
    }

    fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
    }
}

/// A bounded key/value cache combining TTL expiry with LRU eviction.
///
/// Share it as `Arc<TtlLruCache<V>>`; every method takes `&self`.
#[derive(Debug)]
pub struct TtlLruCache<V> {
    name: String,
    max_size: usize,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner<V>>,
}

impl<V: Clone> TtlLruCache<V> {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self::with_clock(max_size, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(max_size: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: "cache".to_string(),
            max_size,
            clock,
            inner: Mutex::new(Inner::new(ttl)),
        }
    }

    /// Set the name used in log events.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn ttl(&self) -> Duration {
        self.lock().ttl
    }

    /// Change the TTL; applies to existing entries too.
    pub fn set_ttl(&self, ttl: Duration) {
        self.lock().ttl = ttl;
    }

    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a key.
    ///
    /// A key that cannot be canonicalized counts as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        match key.canonical() {
            Ok(key) => self.get_canonical(&key),
            Err(e) => {
                tracing::warn!(cache = %self.name, error = %e, "uncacheable key on get");
                self.lock().counters.misses += 1;
                None
            }
        }
    }

    /// Look up an already canonical key.
    pub fn get_canonical(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut inner = self.lock();

        let Some(&idx) = inner.index.get(key) else {
            inner.counters.misses += 1;
            return None;
        };

        let stored_at = inner.node(idx).map(|node| node.stored_at)?;
        if inner.is_expired(stored_at, now) {
            inner.remove_at(idx);
            inner.counters.expirations += 1;
            inner.counters.misses += 1;
            return None;
        }

        inner.unlink(idx);
        inner.push_front(idx);
        inner.counters.hits += 1;
        inner.node(idx).map(|node| node.value.clone())
    }

    /// Store a value as the most recently used entry.
    ///
    /// A key that cannot be canonicalized is not stored.
    pub fn set(&self, key: &CacheKey, value: V) {
        match key.canonical() {
            Ok(key) => self.set_canonical(key, value),
            Err(e) => {
                tracing::warn!(cache = %self.name, error = %e, "uncacheable key on set");
            }
        }
    }

    /// Store a value under an already canonical key.
    pub fn set_canonical(&self, key: String, value: V) {
        let now = self.clock.now();
        let mut inner = self.lock();

        inner.remove(&key);
        inner.insert(key, value, now);

        if inner.len() > self.max_size {
            let lru = inner.tail;
            if let Some(evicted) = inner.node(lru).map(|node| node.key.clone()) {
                inner.remove_at(lru);
                inner.counters.evictions += 1;
                tracing::trace!(cache = %self.name, key = %evicted, "evicted least recently used entry");
            }
        }
    }

    /// Remove a key, returning its value if present (expired or not).
    pub fn remove(&self, key: &CacheKey) -> Option<V> {
        let key = key.canonical().ok()?;
        self.lock().remove(&key)
    }

    /// Whether a live entry exists, without touching recency or counters.
    pub fn contains(&self, key: &CacheKey) -> bool {
        let Ok(key) = key.canonical() else {
            return false;
        };
        let now = self.clock.now();
        let inner = self.lock();
        inner
            .index
            .get(&key)
            .and_then(|&idx| inner.node(idx))
            .is_some_and(|node| !inner.is_expired(node.stored_at, now))
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry. Counters are kept; see `reset_stats`.
    pub fn clear(&self) {
        let mut inner = self.lock();
        let removed = inner.len();
        inner.clear();
        tracing::info!(cache = %self.name, removed, "cache cleared");
    }

    /// Zero the hit, miss, eviction and expiration counters.
    pub fn reset_stats(&self) {
        self.lock().counters = Counters::default();
    }

    /// Remove every expired entry now. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let mut inner = self.lock();

        let expired: Vec<usize> = inner
            .slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| {
                slot.as_ref()
                    .filter(|node| inner.is_expired(node.stored_at, now))
                    .map(|_| idx)
            })
            .collect();

        for &idx in &expired {
            inner.remove_at(idx);
        }
        inner.counters.expirations += expired.len() as u64;

        if !expired.is_empty() {
            tracing::debug!(cache = %self.name, removed = expired.len(), "cleaned up expired entries");
        }

        expired.len()
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats::from_counters(
            inner.counters,
            inner.len(),
            self.max_size,
            inner.ttl.as_secs_f64(),
        )
    }

    /// Keys from most to least recently used.
    pub fn keys_by_recency(&self) -> Vec<String> {
        let inner = self.lock();
        let mut keys = Vec::with_capacity(inner.len());
        let mut cursor = inner.head;
        while let Some(node) = inner.node(cursor) {
            keys.push(node.key.clone());
            cursor = node.next;
        }
        keys
    }
}

impl<V: Clone> Default for TtlLruCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE, DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use pretty_assertions::assert_eq;

    fn key(s: &str) -> CacheKey {
        CacheKey::from(s)
    }

    fn manual_cache(max_size: usize, ttl_secs: u64) -> (TtlLruCache<u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = TtlLruCache::with_clock(max_size, Duration::from_secs(ttl_secs), clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_set_then_get_hits() {
        let (cache, _) = manual_cache(10, 60);
        cache.set(&key("a"), 1);

        assert_eq!(cache.get(&key("a")), Some(1));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn test_missing_key_is_a_miss() {
        let (cache, _) = manual_cache(10, 60);
        assert_eq!(cache.get(&key("nope")), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_overflow_evicts_exactly_one_lru() {
        let (cache, _) = manual_cache(3, 60);
        for (i, k) in ["a", "b", "c", "d"].iter().enumerate() {
            cache.set(&key(k), i as u32);
        }

        let stats = cache.stats();
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.size, 3);
        assert!(!cache.contains(&key("a")));
        assert_eq!(cache.keys_by_recency(), vec!["d", "c", "b"]);
    }

    #[test]
    fn test_get_refreshes_recency() {
        let (cache, _) = manual_cache(3, 60);
        cache.set(&key("a"), 1);
        cache.set(&key("b"), 2);
        cache.set(&key("c"), 3);
        assert_eq!(cache.get(&key("a")), Some(1));

        cache.set(&key("d"), 4);

        assert_eq!(cache.get(&key("b")), None);
        assert_eq!(cache.get(&key("c")), Some(3));
        assert_eq!(cache.get(&key("d")), Some(4));
        assert_eq!(cache.get(&key("a")), Some(1));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_reinsert_resets_recency_and_value() {
        let (cache, _) = manual_cache(2, 60);
        cache.set(&key("a"), 1);
        cache.set(&key("b"), 2);
        cache.set(&key("a"), 10);
        cache.set(&key("c"), 3);

        assert_eq!(cache.get(&key("a")), Some(10));
        assert_eq!(cache.get(&key("b")), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_expired_entry_is_absent() {
        let (cache, clock) = manual_cache(10, 60);
        cache.set(&key("a"), 1);

        clock.advance(Duration::from_secs(61));

        assert_eq!(cache.get(&key("a")), None);
        let stats = cache.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 0);
    }

    #[test]
    fn test_entry_at_exact_ttl_is_fresh() {
        let (cache, clock) = manual_cache(10, 60);
        cache.set(&key("a"), 1);
        clock.advance(Duration::from_secs(60));
        assert_eq!(cache.get(&key("a")), Some(1));
    }

    #[test]
    fn test_get_does_not_refresh_timestamp() {
        let (cache, clock) = manual_cache(10, 60);
        cache.set(&key("a"), 1);
        clock.advance(Duration::from_secs(40));
        assert_eq!(cache.get(&key("a")), Some(1));
        clock.advance(Duration::from_secs(40));
        assert_eq!(cache.get(&key("a")), None);
    }

    #[test]
    fn test_set_refreshes_timestamp() {
        let (cache, clock) = manual_cache(10, 60);
        cache.set(&key("a"), 1);
        clock.advance(Duration::from_secs(40));
        cache.set(&key("a"), 2);
        clock.advance(Duration::from_secs(40));
        assert_eq!(cache.get(&key("a")), Some(2));
    }

    #[test]
    fn test_expiry_with_real_clock() {
        let cache: TtlLruCache<u32> = TtlLruCache::new(10, Duration::from_millis(20));
        cache.set(&key("a"), 1);
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get(&key("a")), None);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_cleanup_expired_sweeps_eagerly() {
        let (cache, clock) = manual_cache(10, 60);
        cache.set(&key("old1"), 1);
        cache.set(&key("old2"), 2);
        clock.advance(Duration::from_secs(30));
        cache.set(&key("new"), 3);
        clock.advance(Duration::from_secs(31));

        assert_eq!(cache.cleanup_expired(), 2);

        let stats = cache.stats();
        assert_eq!(stats.expirations, 2);
        assert_eq!(stats.size, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(cache.keys_by_recency(), vec!["new"]);
        assert_eq!(cache.cleanup_expired(), 0);
    }

    #[test]
    fn test_clear_keeps_counters() {
        let (cache, _) = manual_cache(10, 60);
        cache.set(&key("a"), 1);
        cache.get(&key("a"));
        cache.get(&key("b"));

        cache.clear();

        let stats = cache.stats();
        assert_eq!(stats.size, 0);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(cache.get(&key("a")), None);
    }

    #[test]
    fn test_reset_stats() {
        let (cache, _) = manual_cache(10, 60);
        cache.set(&key("a"), 1);
        cache.get(&key("a"));
        cache.reset_stats();

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn test_hit_rate_tracks_requests() {
        let (cache, _) = manual_cache(2, 60);
        assert_eq!(cache.stats().hit_rate_percent, 0.0);

        cache.set(&key("a"), 1);
        let ops = ["a", "b", "a", "a", "c", "a"];
        for k in ops {
            cache.get(&key(k));
            let stats = cache.stats();
            let expected = 100.0 * stats.hits as f64 / (stats.hits + stats.misses) as f64;
            assert_eq!(stats.hit_rate_percent, expected);
        }
        assert_eq!(cache.stats().hit_rate_percent, 100.0 * 4.0 / 6.0);
    }

    #[test]
    fn test_uncacheable_key_counts_miss_and_skips_set() {
        let (cache, _) = manual_cache(10, 60);
        let bad = CacheKey::Float(f64::NAN);
        cache.set(&bad, 1);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.get(&bad), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_remove_and_slot_reuse() {
        let (cache, _) = manual_cache(3, 60);
        cache.set(&key("a"), 1);
        cache.set(&key("b"), 2);
        assert_eq!(cache.remove(&key("a")), Some(1));
        assert_eq!(cache.remove(&key("a")), None);

        cache.set(&key("c"), 3);
        cache.set(&key("d"), 4);

        assert_eq!(cache.keys_by_recency(), vec!["d", "c", "b"]);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_set_ttl() {
        let (cache, clock) = manual_cache(10, 60);
        cache.set(&key("a"), 1);
        cache.set_ttl(Duration::from_secs(5));
        clock.advance(Duration::from_secs(6));
        assert!(!cache.contains(&key("a")));
        assert_eq!(cache.stats().ttl_seconds, 5.0);
    }

    #[test]
    fn test_concurrent_access_stays_bounded() {
        let cache: Arc<TtlLruCache<u32>> = Arc::new(TtlLruCache::new(50, DEFAULT_TTL));

        std::thread::scope(|scope| {
            for t in 0..4u32 {
                let cache = Arc::clone(&cache);
                scope.spawn(move || {
                    for i in 0..500u32 {
                        let k = CacheKey::from(i64::from((i * 7 + t) % 120));
                        if cache.get(&k).is_none() {
                            cache.set(&k, i);
                        }
                    }
                });
            }
        });

        let stats = cache.stats();
        assert!(stats.size <= 50);
        assert_eq!(stats.total_requests, 2000);
        assert_eq!(cache.keys_by_recency().len(), stats.size);
    }
}
