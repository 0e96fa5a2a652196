//! Cached frame access.
//!
//! [`FrameService`] fronts a [`FrameStore`] with two caches: one for single
//! frames keyed by depth and one for range queries keyed by the whole query.
//! The caches belong to the service instance; nothing is global.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::cache::{CacheKey, CacheStats, Memoized};
use crate::config::CacheConfig;
use crate::error::{FrameError, Result};
use crate::ingest::{IngestReport, Ingestor};
use crate::store::{Frame, FramePage, FrameQuery, FrameStore};

/// Stats key of the single-frame cache.
pub const FRAME_CACHE: &str = "frame_cache";

/// Stats key of the range-query cache.
pub const RANGE_CACHE: &str = "range_cache";

/// Store summary for health checks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Health {
    pub frame_count: usize,
    pub depth_min: Option<f64>,
    pub depth_max: Option<f64>,
}

pub struct FrameService {
    store: Arc<dyn FrameStore>,
    frames: Memoized<Frame>,
    ranges: Memoized<FramePage>,
}

impl FrameService {
    pub fn new(store: Arc<dyn FrameStore>, caches: &CacheConfig) -> Self {
        Self {
            store,
            frames: Memoized::new(Arc::new(caches.frame.build(FRAME_CACHE))),
            ranges: Memoized::new(Arc::new(caches.range.build(RANGE_CACHE))),
        }
    }

    pub fn store(&self) -> &Arc<dyn FrameStore> {
        &self.store
    }

    /// Frame at exactly `depth`. Missing frames are not cached.
    pub async fn get_frame(&self, depth: f64) -> Result<Option<Frame>> {
        // non-finite depths fail canonicalization and go straight to the store
        let key = CacheKey::namespaced("frame", &CacheKey::Float(depth))
            .unwrap_or(CacheKey::Float(depth));
        let store = Arc::clone(&self.store);
        self.frames
            .get_or_fetch_result(&key, || async move { store.get_frame(depth).await })
            .await
    }

    /// One page of frames in a depth range, with the total match count.
    pub async fn list_frames(&self, query: FrameQuery) -> Result<FramePage> {
        query.validate()?;
        let key = CacheKey::composite(&query)?;
        let store = Arc::clone(&self.store);

        let page = self
            .ranges
            .get_or_fetch_result(&key, || async move {
                let frames = store.frames_in_range(&query).await?;
                let total = store.count_frames(query.depth_min, query.depth_max).await?;
                Ok::<_, FrameError>(Some(FramePage {
                    frames,
                    total,
                    limit: query.limit,
                    offset: query.offset,
                }))
            })
            .await?;

        Ok(page.unwrap_or(FramePage {
            frames: Vec::new(),
            total: 0,
            limit: query.limit,
            offset: query.offset,
        }))
    }

    pub async fn depth_bounds(&self) -> Result<Option<(f64, f64)>> {
        self.store.depth_bounds().await
    }

    pub async fn health(&self) -> Result<Health> {
        let frame_count = self.store.count_frames(None, None).await?;
        let bounds = self.store.depth_bounds().await?;
        Ok(Health {
            frame_count,
            depth_min: bounds.map(|(lo, _)| lo),
            depth_max: bounds.map(|(_, hi)| hi),
        })
    }

    pub fn cache_stats(&self) -> BTreeMap<String, CacheStats> {
        BTreeMap::from([
            (FRAME_CACHE.to_string(), self.frames.cache().stats()),
            (RANGE_CACHE.to_string(), self.ranges.cache().stats()),
        ])
    }

    /// Drop every cached entry. Counters are kept.
    pub fn clear_caches(&self) {
        self.frames.cache().clear();
        self.ranges.cache().clear();
    }

    /// Sweep expired entries from both caches. Returns removals per cache.
    pub fn cleanup_expired(&self) -> BTreeMap<String, usize> {
        BTreeMap::from([
            (FRAME_CACHE.to_string(), self.frames.cache().cleanup_expired()),
            (RANGE_CACHE.to_string(), self.ranges.cache().cleanup_expired()),
        ])
    }

    /// Re-ingest a CSV file into the store, then drop cached results.
    pub async fn reload(&self, csv: &Path, ingestor: &Ingestor) -> Result<IngestReport> {
        let report = ingestor.ingest_file(csv, self.store.as_ref()).await?;
        self.clear_caches();
        Ok(report)
    }
}
