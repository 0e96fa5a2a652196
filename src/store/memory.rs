use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{depth_key, key_range, DepthKey, Frame, FrameQuery, FrameStore};
use crate::error::Result;

/// Frames held in a sorted in-process map.
#[derive(Debug, Default)]
pub struct MemoryFrameStore {
    frames: RwLock<BTreeMap<DepthKey, Frame>>,
}

impl MemoryFrameStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FrameStore for MemoryFrameStore {
    async fn upsert_frames(&self, frames: Vec<Frame>) -> Result<usize> {
        let keyed = frames
            .into_iter()
            .map(|frame| Ok((depth_key(frame.depth)?, frame)))
            .collect::<Result<Vec<_>>>()?;

        let count = keyed.len();
        let mut map = self.frames.write().await;
        map.extend(keyed);
        Ok(count)
    }

    async fn get_frame(&self, depth: f64) -> Result<Option<Frame>> {
        let Some(key) = DepthKey::new(depth) else {
            return Ok(None);
        };
        Ok(self.frames.read().await.get(&key).cloned())
    }

    async fn frames_in_range(&self, query: &FrameQuery) -> Result<Vec<Frame>> {
        query.validate()?;
        let Some(bounds) = key_range(query.depth_min, query.depth_max) else {
            return Ok(Vec::new());
        };

        let map = self.frames.read().await;
        Ok(map
            .range(bounds)
            .skip(query.offset)
            .take(query.limit)
            .map(|(_, frame)| frame.clone())
            .collect())
    }

    async fn count_frames(&self, depth_min: Option<f64>, depth_max: Option<f64>) -> Result<usize> {
        let Some(bounds) = key_range(depth_min, depth_max) else {
            return Ok(0);
        };
        Ok(self.frames.read().await.range(bounds).count())
    }

    async fn depth_bounds(&self) -> Result<Option<(f64, f64)>> {
        let map = self.frames.read().await;
        let first = map.keys().next();
        let last = map.keys().next_back();
        Ok(first.zip(last).map(|(lo, hi)| (lo.get(), hi.get())))
    }

    async fn delete_frame(&self, depth: f64) -> Result<bool> {
        let Some(key) = DepthKey::new(depth) else {
            return Ok(false);
        };
        Ok(self.frames.write().await.remove(&key).is_some())
    }
}
