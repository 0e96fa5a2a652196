//! Grayscale to RGB colourisation through a lookup table.

use image::{GrayImage, RgbImage};

use super::ColorLut;

/// Map every grayscale pixel to its lookup table colour.
///
/// The output has the input's dimensions with three channels per pixel.
/// Works as a gather over the flat sample buffers: no per-pixel branching.
pub fn apply_lut(gray: &GrayImage, lut: &ColorLut) -> RgbImage {
    let table = lut.as_slice();
    let mut rgb = RgbImage::new(gray.width(), gray.height());

    for (dst, &level) in rgb.chunks_exact_mut(3).zip(gray.as_raw()) {
        dst.copy_from_slice(&table[usize::from(level)].to_array());
    }

    rgb
}
