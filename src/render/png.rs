//! PNG output for colourised frames.
//!
//! Encoding uses fixed compression and filter settings so identical rasters
//! always produce identical bytes.

use std::fs;
use std::path::Path;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, RgbImage};

use crate::error::{FrameError, Result};

/// The 8-byte PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Encode an RGB raster as an 8-bit, alpha-free PNG.
pub fn encode_png(rgb: &RgbImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut bytes, CompressionType::Best, FilterType::Adaptive);

    encoder
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| FrameError::Encode {
            message: e.to_string(),
        })?;

    tracing::trace!(
        width = rgb.width(),
        height = rgb.height(),
        bytes = bytes.len(),
        "encoded png"
    );

    Ok(bytes)
}

/// Write encoded PNG bytes to a file.
pub fn write_png(png: &[u8], path: &Path) -> Result<()> {
    fs::write(path, png).map_err(|e| FrameError::Io {
        path: path.to_path_buf(),
        message: format!("Failed to write PNG: {}", e),
    })
}

/// Whether `bytes` starts with the PNG signature.
pub fn is_png(bytes: &[u8]) -> bool {
    bytes.starts_with(&PNG_SIGNATURE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> RgbImage {
        RgbImage::from_fn(4, 1, |x, _| image::Rgb([x as u8 * 60, 0, 255 - x as u8 * 60]))
    }

    #[test]
    fn test_encode_has_signature() {
        let png = encode_png(&sample()).unwrap();
        assert!(is_png(&png));
    }

    #[test]
    fn test_encode_is_deterministic() {
        assert_eq!(encode_png(&sample()).unwrap(), encode_png(&sample()).unwrap());
    }

    #[test]
    fn test_encode_is_lossless_rgb8() {
        let rgb = sample();
        let png = encode_png(&rgb).unwrap();

        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
        assert_eq!(decoded.to_rgb8(), rgb);
    }

    #[test]
    fn test_write_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let png = encode_png(&sample()).unwrap();

        write_png(&png, &path).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (4, 1));
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 255]);
    }

    #[test]
    fn test_write_png_missing_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("frame.png");
        let err = write_png(&[0u8; 4], &path).unwrap_err();
        assert!(matches!(err, FrameError::Io { .. }));
    }
}
