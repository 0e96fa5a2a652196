//! Cache statistics.

use serde::Serialize;

/// Cumulative counters kept by a cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Counters {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

/// Point-in-time snapshot of a cache's state and counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub ttl_seconds: f64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub total_requests: u64,
    pub hit_rate_percent: f64,
}

impl CacheStats {
    pub(crate) fn from_counters(
        counters: Counters,
        size: usize,
        max_size: usize,
        ttl_seconds: f64,
    ) -> Self {
        let total_requests = counters.hits + counters.misses;
        let hit_rate_percent = if total_requests == 0 {
            0.0
        } else {
            100.0 * counters.hits as f64 / total_requests as f64
        };

        Self {
            size,
            max_size,
            ttl_seconds,
            hits: counters.hits,
            misses: counters.misses,
            evictions: counters.evictions,
            expirations: counters.expirations,
            total_requests,
            hit_rate_percent,
        }
    }
}
