//! Frame storage.
//!
//! Frames are keyed by depth. [`FrameStore`] is the async seam the service and
//! ingest layers talk to; [`MemoryFrameStore`] keeps everything in a sorted
//! map and [`DirectoryFrameStore`] persists PNG files next to a JSON index.

mod directory;
mod memory;

use std::cmp::Ordering;
use std::fmt;
use std::ops::Bound;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FrameError, Result};
use crate::render::EncodedFrame;

pub use directory::{DirectoryFrameStore, INDEX_FILE};
pub use memory::MemoryFrameStore;

/// Default page size for range queries.
pub const DEFAULT_LIMIT: usize = 100;

/// Largest page a range query may request.
pub const MAX_LIMIT: usize = 1000;

/// A stored frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub depth: f64,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
    pub updated_at: DateTime<Utc>,
}

impl Frame {
    /// Wrap pipeline output as a frame stamped with the current time.
    pub fn from_encoded(depth: f64, encoded: EncodedFrame) -> Self {
        Self {
            depth,
            width: encoded.width,
            height: encoded.height,
            png: encoded.png,
            updated_at: Utc::now(),
        }
    }
}

/// Totally ordered depth used as a map key.
///
/// Only finite depths are representable, and `-0.0` is folded into `0.0`.
#[derive(Debug, Clone, Copy)]
pub struct DepthKey(f64);

impl DepthKey {
    pub fn new(depth: f64) -> Option<Self> {
        if !depth.is_finite() {
            return None;
        }
        Some(Self(if depth == 0.0 { 0.0 } else { depth }))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl PartialEq for DepthKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DepthKey {}

impl PartialOrd for DepthKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DepthKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for DepthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub(crate) fn depth_key(depth: f64) -> Result<DepthKey> {
    DepthKey::new(depth).ok_or_else(|| FrameError::Store {
        message: format!("depth {} is not a finite number", depth),
    })
}

/// Inclusive key bounds for an optional depth range.
///
/// `None` when the range cannot match anything (inverted or non-finite).
pub(crate) fn key_range(
    depth_min: Option<f64>,
    depth_max: Option<f64>,
) -> Option<(Bound<DepthKey>, Bound<DepthKey>)> {
    let lower = match depth_min {
        Some(v) => Bound::Included(DepthKey::new(v)?),
        None => Bound::Unbounded,
    };
    let upper = match depth_max {
        Some(v) => Bound::Included(DepthKey::new(v)?),
        None => Bound::Unbounded,
    };
    if let (Bound::Included(lo), Bound::Included(hi)) = (&lower, &upper) {
        if lo > hi {
            return None;
        }
    }
    Some((lower, upper))
}

/// A depth range with pagination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameQuery {
    pub depth_min: Option<f64>,
    pub depth_max: Option<f64>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for FrameQuery {
    fn default() -> Self {
        Self {
            depth_min: None,
            depth_max: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl FrameQuery {
    pub fn range(depth_min: f64, depth_max: f64) -> Self {
        Self {
            depth_min: Some(depth_min),
            depth_max: Some(depth_max),
            ..Self::default()
        }
    }

    pub fn with_page(mut self, limit: usize, offset: usize) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (name, bound) in [("depth_min", self.depth_min), ("depth_max", self.depth_max)] {
            if let Some(v) = bound {
                if !v.is_finite() || v < 0.0 {
                    return Err(FrameError::InvalidQuery {
                        message: format!("{} must be a non-negative number, got {}", name, v),
                    });
                }
            }
        }

        if let (Some(min), Some(max)) = (self.depth_min, self.depth_max) {
            if max < min {
                return Err(FrameError::InvalidQuery {
                    message: format!(
                        "depth_max ({}) must be greater than or equal to depth_min ({})",
                        max, min
                    ),
                });
            }
        }

        if self.limit == 0 || self.limit > MAX_LIMIT {
            return Err(FrameError::InvalidQuery {
                message: format!("limit must be between 1 and {}, got {}", MAX_LIMIT, self.limit),
            });
        }

        Ok(())
    }
}

/// One page of a range query.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePage {
    pub frames: Vec<Frame>,
    /// Frames matching the depth range, ignoring pagination.
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

impl FramePage {
    /// Whether frames remain past this page.
    pub fn has_more(&self) -> bool {
        self.offset + self.frames.len() < self.total
    }

    /// Depths of the first and last frame on this page.
    pub fn depth_range(&self) -> Option<(f64, f64)> {
        let first = self.frames.first()?;
        let last = self.frames.last()?;
        Some((first.depth, last.depth))
    }
}

/// Persistent home for frames, keyed by depth.
#[async_trait]
pub trait FrameStore: Send + Sync {
    /// Insert or replace frames by depth. Returns how many were written.
    async fn upsert_frames(&self, frames: Vec<Frame>) -> Result<usize>;

    async fn upsert_frame(&self, frame: Frame) -> Result<()> {
        self.upsert_frames(vec![frame]).await.map(|_| ())
    }

    async fn get_frame(&self, depth: f64) -> Result<Option<Frame>>;

    /// Frames within the inclusive depth range, depth ascending, with
    /// `offset` applied before `limit`.
    async fn frames_in_range(&self, query: &FrameQuery) -> Result<Vec<Frame>>;

    async fn count_frames(&self, depth_min: Option<f64>, depth_max: Option<f64>)
        -> Result<usize>;

    /// Smallest and largest stored depth.
    async fn depth_bounds(&self) -> Result<Option<(f64, f64)>>;

    /// Remove a frame. Returns whether it existed.
    async fn delete_frame(&self, depth: f64) -> Result<bool>;
}
