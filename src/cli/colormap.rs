use std::path::{Path, PathBuf};

use clap::Args;
use image::{GrayImage, Luma, RgbImage};

use crate::colour::{apply_lut, ColorLut};
use crate::error::{FrameError, Result};
use crate::output::Printer;
use crate::render::{encode_png, write_png};

/// Render the colour ramp as a gradient PNG
#[derive(Args, Debug)]
pub struct ColormapArgs {
    /// Output PNG file
    #[arg(long, short, default_value = "colormap.png")]
    pub output: PathBuf,

    /// Height of the gradient in pixels
    #[arg(long, default_value_t = 20)]
    pub height: u32,
}

pub fn run(args: ColormapArgs, config: Option<&Path>, printer: &Printer) -> Result<()> {
    if args.height == 0 {
        return Err(FrameError::InvalidShape {
            message: "gradient height must be at least 1".to_string(),
        });
    }

    let settings = super::load_settings(config)?;
    let lut = settings.lut()?;

    let png = encode_png(&gradient(&lut, args.height))?;
    write_png(&png, &args.output)?;

    printer.colormap_rendered(lut.stops().len(), &args.output);

    for stop in lut.stops() {
        println!("{:>3} {}", stop.level, stop.colour);
    }

    Ok(())
}

/// A `256 x height` image with one column per grayscale level.
fn gradient(lut: &ColorLut, height: u32) -> RgbImage {
    let levels = GrayImage::from_fn(lut.len() as u32, height, |x, _| Luma([x as u8]));
    apply_lut(&levels, lut)
}
