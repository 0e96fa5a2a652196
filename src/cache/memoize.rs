//! Cache-aside wrapper for async lookups.
//!
//! Callers derive the key themselves and hand over the fetch future. Only
//! `Some` results are cached, so a record that does not exist yet can be
//! fetched again on the next call instead of being pinned as missing for the
//! whole TTL.

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use super::key::CacheKey;
use super::ttl_lru::TtlLruCache;

/// An async lookup fronted by a [`TtlLruCache`].
#[derive(Debug)]
pub struct Memoized<V> {
    cache: Arc<TtlLruCache<V>>,
}

impl<V: Clone> Clone for Memoized<V> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<V: Clone> Memoized<V> {
    pub fn new(cache: Arc<TtlLruCache<V>>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<TtlLruCache<V>> {
        &self.cache
    }

    /// Return the cached value for `key`, or await `fetch` and cache its
    /// result when it is `Some`.
    ///
    /// A key that cannot be canonicalized bypasses the cache entirely.
    pub async fn get_or_fetch<F, Fut>(&self, key: &CacheKey, fetch: F) -> Option<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<V>>,
    {
        let infallible = move || async move { Ok::<_, Infallible>(fetch().await) };
        match self.get_or_fetch_result(key, infallible).await {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Like [`get_or_fetch`](Self::get_or_fetch) for fallible lookups.
    /// Errors pass through and are never cached.
    pub async fn get_or_fetch_result<F, Fut, E>(
        &self,
        key: &CacheKey,
        fetch: F,
    ) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
    {
        let canonical = match key.canonical() {
            Ok(canonical) => canonical,
            Err(e) => {
                tracing::warn!(
                    cache = %self.cache.name(),
                    error = %e,
                    "cache key unavailable, calling through"
                );
                return fetch().await;
            }
        };

        if let Some(value) = self.cache.get_canonical(&canonical) {
            tracing::debug!(cache = %self.cache.name(), key = %canonical, "cache hit");
            return Ok(Some(value));
        }
        tracing::debug!(cache = %self.cache.name(), key = %canonical, "cache miss");

        let fetched = fetch().await?;
        if let Some(value) = &fetched {
            self.cache.set_canonical(canonical, value.clone());
        }
        Ok(fetched)
    }
}
