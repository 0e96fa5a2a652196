//! In-memory caching: a TTL/LRU store, canonical keys and a cache-aside
//! wrapper for async lookups.

mod clock;
mod key;
mod memoize;
mod stats;
mod ttl_lru;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key::CacheKey;
pub use memoize::Memoized;
pub use stats::CacheStats;
pub use ttl_lru::{TtlLruCache, DEFAULT_MAX_SIZE, DEFAULT_TTL};
