//! depthframe - Depth-keyed scanlines to colourised PNG frames
//!
//! A library for turning rows of grayscale samples into small colourised PNG
//! thumbnails, storing them by depth, and serving them through a bounded
//! TTL/LRU cache.

pub mod cache;
pub mod cli;
pub mod colour;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod output;
pub mod render;
pub mod service;
pub mod store;

pub use cache::{CacheKey, CacheStats, Memoized, TtlLruCache};
pub use colour::{apply_lut, ColorLut, ColorStop, Rgb};
pub use config::Settings;
pub use error::{FrameError, Result};
pub use ingest::{CsvFrameReader, IngestReport, Ingestor};
pub use render::{encode_png, EncodedFrame, FramePipeline, PipelineConfig, ResampleFilter, RowResampler};
pub use service::FrameService;
pub use store::{DirectoryFrameStore, Frame, FramePage, FrameQuery, FrameStore, MemoryFrameStore};
