//! Row-to-PNG frame pipeline.
//!
//! One input row goes through: length check, clamp to u8, width resampling,
//! LUT colourisation, PNG encoding. The LUT is built once per pipeline and
//! shared read-only, so a pipeline can process rows from many threads.

use std::sync::Arc;

use image::GrayImage;

use crate::colour::{apply_lut, ColorLut};
use crate::error::{FrameError, Result};

use super::png::encode_png;
use super::resample::{ResampleFilter, RowResampler};

/// Canonical number of samples per input row.
pub const DEFAULT_SOURCE_WIDTH: usize = 200;

/// Canonical width of an output frame.
pub const DEFAULT_TARGET_WIDTH: u32 = 150;

/// Pipeline geometry and filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub source_width: usize,
    pub target_width: u32,
    pub filter: ResampleFilter,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_width: DEFAULT_SOURCE_WIDTH,
            target_width: DEFAULT_TARGET_WIDTH,
            filter: ResampleFilter::default(),
        }
    }
}

/// A colourised, PNG-encoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    pub png: Vec<u8>,
    pub width: u32,
    /// Always 1: frames are single rows.
    pub height: u32,
    /// Input samples that fell outside `[0, 255]` and were clamped.
    pub clamped: usize,
}

/// Converts numeric rows into colourised PNG frames.
#[derive(Debug, Clone)]
pub struct FramePipeline {
    config: PipelineConfig,
    resampler: RowResampler,
    lut: Arc<ColorLut>,
}

impl FramePipeline {
    pub fn new(config: PipelineConfig, lut: ColorLut) -> Self {
        Self::with_shared_lut(config, Arc::new(lut))
    }

    pub fn with_shared_lut(config: PipelineConfig, lut: Arc<ColorLut>) -> Self {
        Self {
            config,
            resampler: RowResampler::new(config.filter),
            lut,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn lut(&self) -> &ColorLut {
        &self.lut
    }

    /// Process one row using the configured source and target widths.
    pub fn process(&self, values: &[f64]) -> Result<EncodedFrame> {
        self.process_with_widths(values, self.config.source_width, self.config.target_width)
    }

    /// Process one row with explicit widths.
    ///
    /// Fails with `ShapeMismatch` when `values` does not hold exactly
    /// `source_width` samples. Out-of-range samples are clamped, not rejected.
    /// A zero or oversized width is degenerate geometry rather than a bad row
    /// and fails with `InvalidShape` before any sample is looked at.
    pub fn process_with_widths(
        &self,
        values: &[f64],
        source_width: usize,
        target_width: u32,
    ) -> Result<EncodedFrame> {
        let width = check_geometry(source_width, target_width)?;
        if values.len() != source_width {
            return Err(FrameError::ShapeMismatch {
                expected: source_width,
                actual: values.len(),
            });
        }

        let (samples, clamped) = quantize(values);
        if clamped > 0 {
            tracing::debug!(clamped, "clamped out-of-range samples");
        }

        let gray = GrayImage::from_raw(width, 1, samples).ok_or_else(|| {
            FrameError::InvalidShape {
                message: format!("row of {} samples does not fit 1x{}", values.len(), width),
            }
        })?;

        let resized = self.resampler.resize(&gray, target_width)?;
        let rgb = apply_lut(&resized, &self.lut);
        let png = encode_png(&rgb)?;

        Ok(EncodedFrame {
            png,
            width: rgb.width(),
            height: rgb.height(),
            clamped,
        })
    }

    /// Process many rows across scoped worker threads.
    ///
    /// Results come back in input order, one per row.
    pub fn process_many<R>(&self, rows: &[R], workers: usize) -> Vec<Result<EncodedFrame>>
    where
        R: AsRef<[f64]> + Sync,
    {
        let workers = workers.max(1);
        if workers == 1 || rows.len() <= 1 {
            return rows.iter().map(|row| self.process(row.as_ref())).collect();
        }

        let per_worker = rows.len().div_ceil(workers);
        let mut results: Vec<Option<Result<EncodedFrame>>> = (0..rows.len()).map(|_| None).collect();

        std::thread::scope(|scope| {
            for (input, output) in rows.chunks(per_worker).zip(results.chunks_mut(per_worker)) {
                scope.spawn(move || {
                    for (row, slot) in input.iter().zip(output.iter_mut()) {
                        *slot = Some(self.process(row.as_ref()));
                    }
                });
            }
        });

        results
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    Err(FrameError::InvalidShape {
                        message: "row was not processed".to_string(),
                    })
                })
            })
            .collect()
    }
}

impl Default for FramePipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default(), ColorLut::default())
    }
}

fn check_geometry(source_width: usize, target_width: u32) -> Result<u32> {
    if source_width == 0 || target_width == 0 {
        return Err(FrameError::InvalidShape {
            message: format!(
                "source and target widths must be at least 1, got {} and {}",
                source_width, target_width
            ),
        });
    }
    u32::try_from(source_width).map_err(|_| FrameError::InvalidShape {
        message: format!("source width {} is too large", source_width),
    })
}

/// Clamp samples into `[0, 255]` and truncate to u8. NaN becomes 0.
///
/// Returns the samples and how many were out of range.
fn quantize(values: &[f64]) -> (Vec<u8>, usize) {
    let clamped = values
        .iter()
        .filter(|v| !(0.0..=255.0).contains(*v))
        .count();
    let samples = values.iter().map(|&v| v.clamp(0.0, 255.0) as u8).collect();
    (samples, clamped)
}

/// Number of worker threads to use for row processing.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::png::is_png;

    fn noisy_row(len: usize) -> Vec<f64> {
        (0..len).map(|i| (i as f64 * 37.0) % 300.0 - 20.0).collect()
    }

    #[test]
    fn test_process_canonical_row() {
        let pipeline = FramePipeline::default();
        let row: Vec<f64> = (0..200).map(|i| i as f64 * 1.2).collect();

        let frame = pipeline.process(&row).unwrap();

        assert_eq!(frame.width, 150);
        assert_eq!(frame.height, 1);
        assert!(is_png(&frame.png));
        assert_eq!(frame.clamped, 0);
    }

    #[test]
    fn test_process_decodes_to_lut_colours() {
        let pipeline = FramePipeline::default();
        let frame = pipeline.process(&vec![255.0; 200]).unwrap();

        let img = image::load_from_memory(&frame.png).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (150, 1));
        assert!(img.pixels().all(|p| p.0 == [255, 69, 0]));
    }

    #[test]
    fn test_shape_mismatch() {
        let pipeline = FramePipeline::default();
        let err = pipeline.process(&vec![0.0; 199]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::ShapeMismatch {
                expected: 200,
                actual: 199
            }
        ));
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let pipeline = FramePipeline::default();
        let mut row = vec![-50.0; 100];
        row.extend(vec![900.0; 100]);

        let frame = pipeline.process(&row).unwrap();

        assert_eq!(frame.clamped, 200);
        let img = image::load_from_memory(&frame.png).unwrap().to_rgb8();
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 139]);
        assert_eq!(img.get_pixel(149, 0).0, [255, 69, 0]);
    }

    #[test]
    fn test_quantize_truncates_and_counts() {
        let (samples, clamped) = quantize(&[1.9, -0.1, 255.5, f64::NAN, 128.0]);
        assert_eq!(samples, vec![1, 0, 255, 0, 128]);
        assert_eq!(clamped, 3);
    }

    #[test]
    fn test_process_with_widths_identity() {
        let pipeline = FramePipeline::default();
        let frame = pipeline
            .process_with_widths(&vec![10.0; 150], 150, 150)
            .unwrap();
        assert_eq!((frame.width, frame.height), (150, 1));
    }

    #[test]
    fn test_zero_widths_fail_before_row_check() {
        let pipeline = FramePipeline::default();

        let err = pipeline.process_with_widths(&[], 0, 150).unwrap_err();
        assert!(matches!(err, FrameError::InvalidShape { .. }));

        let err = pipeline
            .process_with_widths(&vec![1.0; 3], 200, 0)
            .unwrap_err();
        assert!(matches!(err, FrameError::InvalidShape { .. }));
    }

    #[test]
    fn test_deterministic_output() {
        let pipeline = FramePipeline::default();
        let row = noisy_row(200);
        assert_eq!(pipeline.process(&row).unwrap(), pipeline.process(&row).unwrap());
    }

    #[test]
    fn test_process_many_preserves_order() {
        let pipeline = FramePipeline::default();
        let rows: Vec<Vec<f64>> = vec![noisy_row(200), vec![0.0; 3], noisy_row(200), vec![42.0; 200]];

        let results = pipeline.process_many(&rows, 3);

        assert_eq!(results.len(), 4);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(FrameError::ShapeMismatch { .. })));
        assert_eq!(
            results[3].as_ref().unwrap(),
            &pipeline.process(&rows[3]).unwrap()
        );
    }
}
