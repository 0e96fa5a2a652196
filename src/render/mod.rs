//! Rendering module for depthframe.
//!
//! This module turns grayscale rows into colourised PNG frames: width
//! resampling, LUT colourisation, and PNG encoding.

pub mod pipeline;
mod png;
mod resample;

pub use pipeline::{
    default_workers, EncodedFrame, FramePipeline, PipelineConfig, DEFAULT_SOURCE_WIDTH,
    DEFAULT_TARGET_WIDTH,
};
pub use png::{encode_png, is_png, write_png, PNG_SIGNATURE};
pub use resample::{ResampleFilter, RowResampler};
