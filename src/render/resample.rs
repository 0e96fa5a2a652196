//! Width-only resampling of grayscale rasters.
//!
//! Each [`ResampleFilter`] maps onto an `image` filter; the height is passed
//! through unchanged so only columns are resampled.

use std::fmt;

use clap::ValueEnum;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};

use crate::error::{FrameError, Result};

/// Interpolation filter used when resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResampleFilter {
    /// Pick the source pixel under the output pixel centre.
    Nearest,
    /// Triangle filter.
    #[default]
    Bilinear,
    /// Catmull-Rom cubic.
    Bicubic,
    /// Windowed sinc, three lobes.
    Lanczos,
}

impl ResampleFilter {
    fn filter_type(self) -> FilterType {
        match self {
            ResampleFilter::Nearest => FilterType::Nearest,
            ResampleFilter::Bilinear => FilterType::Triangle,
            ResampleFilter::Bicubic => FilterType::CatmullRom,
            ResampleFilter::Lanczos => FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for ResampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResampleFilter::Nearest => "nearest",
            ResampleFilter::Bilinear => "bilinear",
            ResampleFilter::Bicubic => "bicubic",
            ResampleFilter::Lanczos => "lanczos",
        };
        f.write_str(name)
    }
}

/// Resizes grayscale rasters along their width.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowResampler {
    filter: ResampleFilter,
}

impl RowResampler {
    pub fn new(filter: ResampleFilter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> ResampleFilter {
        self.filter
    }

    /// Resize `gray` to `target_width` columns, keeping its height.
    ///
    /// Returns the input unchanged when it already has the target width.
    pub fn resize(&self, gray: &GrayImage, target_width: u32) -> Result<GrayImage> {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Err(FrameError::InvalidShape {
                message: format!("raster must be non-empty, got {}x{}", height, width),
            });
        }
        if target_width == 0 {
            return Err(FrameError::InvalidShape {
                message: "target width must be at least 1".to_string(),
            });
        }

        if width == target_width {
            return Ok(gray.clone());
        }

        Ok(imageops::resize(
            gray,
            target_width,
            height,
            self.filter.filter_type(),
        ))
    }

    /// Resize a decoded image, which must be 8-bit single-channel grayscale.
    pub fn resize_image(&self, image: &DynamicImage, target_width: u32) -> Result<GrayImage> {
        match image.as_luma8() {
            Some(gray) => self.resize(gray, target_width),
            None => Err(FrameError::InvalidDtype {
                found: format!("{:?}", image.color()),
            }),
        }
    }
}
