//! Query command implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;

use crate::error::{FrameError, Result};
use crate::output::Printer;
use crate::render::write_png;
use crate::service::FrameService;
use crate::store::{DirectoryFrameStore, Frame, FramePage, FrameQuery, DEFAULT_LIMIT};

/// Look up frames by depth or depth range
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Exact depth of a single frame
    #[arg(long, conflicts_with_all = ["min", "max"])]
    pub depth: Option<f64>,

    /// Lower depth bound (inclusive)
    #[arg(long)]
    pub min: Option<f64>,

    /// Upper depth bound (inclusive)
    #[arg(long)]
    pub max: Option<f64>,

    /// Maximum frames to return
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    pub limit: usize,

    /// Frames to skip
    #[arg(long, default_value_t = 0)]
    pub offset: usize,

    /// Frame store directory
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Write the matching PNGs into this directory
    #[arg(long)]
    pub extract: Option<PathBuf>,
}

/// Frame metadata as printed on stdout.
#[derive(Debug, Serialize)]
struct FrameSummary {
    depth: f64,
    width: u32,
    height: u32,
    png_bytes: usize,
    updated_at: DateTime<Utc>,
}

impl From<&Frame> for FrameSummary {
    fn from(frame: &Frame) -> Self {
        Self {
            depth: frame.depth,
            width: frame.width,
            height: frame.height,
            png_bytes: frame.png.len(),
            updated_at: frame.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct PageSummary {
    frames: Vec<FrameSummary>,
    total: usize,
    limit: usize,
    offset: usize,
    has_more: bool,
    depth_min: Option<f64>,
    depth_max: Option<f64>,
}

impl From<&FramePage> for PageSummary {
    fn from(page: &FramePage) -> Self {
        let range = page.depth_range();
        Self {
            frames: page.frames.iter().map(FrameSummary::from).collect(),
            total: page.total,
            limit: page.limit,
            offset: page.offset,
            has_more: page.has_more(),
            depth_min: range.map(|(lo, _)| lo),
            depth_max: range.map(|(_, hi)| hi),
        }
    }
}

pub async fn run(args: QueryArgs, config: Option<&Path>, printer: &Printer) -> Result<()> {
    let settings = super::load_settings(config)?;
    let store_dir = args.store.clone().unwrap_or(settings.store);
    let store = DirectoryFrameStore::open(&store_dir).await?;
    let service = FrameService::new(Arc::new(store), &settings.cache);

    let frames = match args.depth {
        Some(depth) => {
            let frame = service.get_frame(depth).await?;
            match &frame {
                Some(frame) => printer.json(&FrameSummary::from(frame))?,
                None => printer.missing_frame(depth),
            }
            frame.into_iter().collect()
        }
        None => {
            let query = FrameQuery {
                depth_min: args.min,
                depth_max: args.max,
                limit: args.limit,
                offset: args.offset,
            };
            let page = service.list_frames(query).await?;
            printer.json(&PageSummary::from(&page))?;
            page.frames
        }
    };

    if let Some(dir) = &args.extract {
        extract(&frames, dir)?;
        printer.extracted(frames.len(), dir);
    }

    Ok(())
}

fn extract(frames: &[Frame], dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| FrameError::Io {
        path: dir.to_path_buf(),
        message: format!("Failed to create output directory: {}", e),
    })?;
    for frame in frames {
        write_png(&frame.png, &dir.join(format!("{}.png", frame.depth)))?;
    }
    Ok(())
}
