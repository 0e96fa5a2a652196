//! Directory-backed frame store.
//!
//! Layout:
//!
//! ```text
//! <dir>/frames.json     index, one entry per frame, sorted by depth
//! <dir>/<depth>.png     encoded frame
//! ```
//!
//! The index is loaded once on open and rewritten after every mutation. All
//! files are written to a temporary sibling first and renamed into place.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{depth_key, key_range, DepthKey, Frame, FrameQuery, FrameStore};
use crate::error::{FrameError, Result};

/// Name of the index file inside the store directory.
pub const INDEX_FILE: &str = "frames.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    depth: f64,
    file: String,
    width: u32,
    height: u32,
    updated_at: DateTime<Utc>,
}

/// Frames persisted as PNG files plus a JSON index.
#[derive(Debug)]
pub struct DirectoryFrameStore {
    dir: PathBuf,
    index: RwLock<BTreeMap<DepthKey, IndexEntry>>,
}

impl DirectoryFrameStore {
    /// Open a store, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, "Failed to create store directory", e))?;

        let index = load_index(&dir.join(INDEX_FILE)).await?;
        tracing::debug!(dir = %dir.display(), frames = index.len(), "opened frame store");

        Ok(Self {
            dir,
            index: RwLock::new(index),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the PNG file for a stored depth, if present.
    pub async fn frame_path(&self, depth: f64) -> Option<PathBuf> {
        let key = DepthKey::new(depth)?;
        let index = self.index.read().await;
        index.get(&key).map(|entry| self.dir.join(&entry.file))
    }

    async fn read_frame(&self, entry: &IndexEntry) -> Result<Frame> {
        let path = self.dir.join(&entry.file);
        let png = tokio::fs::read(&path)
            .await
            .map_err(|e| io_error(&path, "Failed to read frame", e))?;
        Ok(Frame {
            depth: entry.depth,
            width: entry.width,
            height: entry.height,
            png,
            updated_at: entry.updated_at,
        })
    }

    async fn save_index(&self, index: &BTreeMap<DepthKey, IndexEntry>) -> Result<()> {
        let entries: Vec<&IndexEntry> = index.values().collect();
        let json = serde_json::to_vec_pretty(&entries).map_err(|e| FrameError::Store {
            message: format!("Failed to serialize frame index: {}", e),
        })?;
        write_atomic(&self.dir.join(INDEX_FILE), &json).await
    }

    /// Write PNGs and record their entries in `staged`. Files that did not
    /// exist in the index before are pushed onto `created`.
    async fn stage_frames(
        &self,
        frames: Vec<Frame>,
        staged: &mut BTreeMap<DepthKey, IndexEntry>,
        created: &mut Vec<PathBuf>,
    ) -> Result<usize> {
        let mut written = 0;
        for frame in frames {
            let key = depth_key(frame.depth)?;
            let file = frame_file_name(key);
            let path = self.dir.join(&file);
            write_atomic(&path, &frame.png).await?;
            let previous = staged.insert(
                key,
                IndexEntry {
                    depth: key.get(),
                    file,
                    width: frame.width,
                    height: frame.height,
                    updated_at: frame.updated_at,
                },
            );
            if previous.is_none() {
                created.push(path);
            }
            written += 1;
        }
        Ok(written)
    }

    async fn remove_files(&self, paths: &[PathBuf]) {
        for path in paths {
            if let Err(e) = tokio::fs::remove_file(path).await {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove unindexed frame");
            }
        }
    }
}

fn frame_file_name(key: DepthKey) -> String {
    format!("{}.png", key)
}

fn io_error(path: &Path, context: &str, e: std::io::Error) -> FrameError {
    FrameError::Io {
        path: path.to_path_buf(),
        message: format!("{}: {}", context, e),
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    tokio::fs::write(&temp_path, bytes)
        .await
        .map_err(|e| io_error(&temp_path, "Failed to write", e))?;
    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(io_error(path, "Failed to move into place", e));
    }
    Ok(())
}

async fn load_index(path: &Path) -> Result<BTreeMap<DepthKey, IndexEntry>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(io_error(path, "Failed to read frame index", e)),
    };

    let entries: Vec<IndexEntry> = serde_json::from_slice(&bytes).map_err(|e| FrameError::Parse {
        message: format!("Invalid frame index {}: {}", path.display(), e),
        help: Some(format!(
            "Delete {} and re-run `depthframe ingest` to rebuild it",
            path.display()
        )),
    })?;

    entries
        .into_iter()
        .map(|entry| Ok((depth_key(entry.depth)?, entry)))
        .collect()
}

#[async_trait]
impl FrameStore for DirectoryFrameStore {
    async fn upsert_frames(&self, frames: Vec<Frame>) -> Result<usize> {
        let mut index = self.index.write().await;
        let mut staged = index.clone();
        let mut created = Vec::new();

        let result = self.stage_frames(frames, &mut staged, &mut created).await;
        let written = match result {
            Ok(written) => written,
            Err(e) => {
                self.remove_files(&created).await;
                return Err(e);
            }
        };

        if written > 0 {
            if let Err(e) = self.save_index(&staged).await {
                self.remove_files(&created).await;
                return Err(e);
            }
            *index = staged;
        }
        Ok(written)
    }

    async fn get_frame(&self, depth: f64) -> Result<Option<Frame>> {
        let Some(key) = DepthKey::new(depth) else {
            return Ok(None);
        };
        let entry = self.index.read().await.get(&key).cloned();
        match entry {
            Some(entry) => self.read_frame(&entry).await.map(Some),
            None => Ok(None),
        }
    }

    async fn frames_in_range(&self, query: &FrameQuery) -> Result<Vec<Frame>> {
        query.validate()?;
        let Some(bounds) = key_range(query.depth_min, query.depth_max) else {
            return Ok(Vec::new());
        };

        let entries: Vec<IndexEntry> = {
            let index = self.index.read().await;
            index
                .range(bounds)
                .skip(query.offset)
                .take(query.limit)
                .map(|(_, entry)| entry.clone())
                .collect()
        };

        let mut frames = Vec::with_capacity(entries.len());
        for entry in &entries {
            frames.push(self.read_frame(entry).await?);
        }
        Ok(frames)
    }

    async fn count_frames(&self, depth_min: Option<f64>, depth_max: Option<f64>) -> Result<usize> {
        let Some(bounds) = key_range(depth_min, depth_max) else {
            return Ok(0);
        };
        Ok(self.index.read().await.range(bounds).count())
    }

    async fn depth_bounds(&self) -> Result<Option<(f64, f64)>> {
        let index = self.index.read().await;
        let first = index.keys().next();
        let last = index.keys().next_back();
        Ok(first.zip(last).map(|(lo, hi)| (lo.get(), hi.get())))
    }

    async fn delete_frame(&self, depth: f64) -> Result<bool> {
        let Some(key) = DepthKey::new(depth) else {
            return Ok(false);
        };

        let mut index = self.index.write().await;
        let Some(entry) = index.remove(&key) else {
            return Ok(false);
        };

        let path = self.dir.join(&entry.file);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(&path, "Failed to remove frame", e)),
        }

        self.save_index(&index).await?;
        Ok(true)
    }
}
