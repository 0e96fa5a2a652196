//! 256-entry colour lookup tables built from ordered colour stops.
//!
//! A table is built by linear interpolation between adjacent stops. Ranges
//! share their boundary index and are written in stop order, so every stop
//! level holds exactly that stop's colour.

use serde::{Deserialize, Serialize};

use crate::error::{FrameError, Result};

use super::Rgb;

/// Number of entries in a lookup table (one per 8-bit intensity).
pub const LUT_SIZE: usize = 256;

/// An anchor mapping a grayscale level to a colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorStop {
    pub level: u8,
    pub colour: Rgb,
}

impl ColorStop {
    pub const fn new(level: u8, colour: Rgb) -> Self {
        Self { level, colour }
    }
}

/// Depth ramp: deep blue, teal, green, yellow, orange-red.
pub const DEFAULT_STOPS: [ColorStop; 5] = [
    ColorStop::new(0, Rgb::new(0, 0, 139)),
    ColorStop::new(64, Rgb::new(0, 139, 139)),
    ColorStop::new(128, Rgb::new(0, 200, 100)),
    ColorStop::new(192, Rgb::new(255, 215, 0)),
    ColorStop::new(255, Rgb::new(255, 69, 0)),
];

/// Immutable grayscale-to-RGB lookup table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorLut {
    table: [Rgb; LUT_SIZE],
    stops: Vec<ColorStop>,
}

impl ColorLut {
    /// Build a table from ordered colour stops.
    ///
    /// The stops must start at level 0, end at level 255, and have strictly
    /// increasing levels.
    pub fn build(stops: &[ColorStop]) -> Result<Self> {
        validate_stops(stops)?;

        let mut table = [Rgb::BLACK; LUT_SIZE];
        for pair in stops.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            let span = f64::from(end.level - start.level);

            for level in start.level..=end.level {
                let t = f64::from(level - start.level) / span;
                table[usize::from(level)] = Rgb::new(
                    lerp_channel(start.colour.r, end.colour.r, t),
                    lerp_channel(start.colour.g, end.colour.g, t),
                    lerp_channel(start.colour.b, end.colour.b, t),
                );
            }
        }

        tracing::debug!(stops = stops.len(), "built colour lookup table");

        Ok(Self {
            table,
            stops: stops.to_vec(),
        })
    }

    /// Colour for a grayscale level.
    #[inline]
    pub fn get(&self, level: u8) -> Rgb {
        self.table[usize::from(level)]
    }

    /// The full table, indexed by grayscale level.
    pub fn as_slice(&self) -> &[Rgb; LUT_SIZE] {
        &self.table
    }

    /// The stops this table was built from.
    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    /// Number of entries; always 256.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for ColorLut {
    fn default() -> Self {
        // DEFAULT_STOPS satisfy every stop invariant, so this cannot fail.
        match Self::build(&DEFAULT_STOPS) {
            Ok(lut) => lut,
            Err(e) => unreachable!("default colour stops are invalid: {e}"),
        }
    }
}

fn lerp_channel(from: u8, to: u8, t: f64) -> u8 {
    let from = f64::from(from);
    let to = f64::from(to);
    (from + (to - from) * t).round().clamp(0.0, 255.0) as u8
}

fn validate_stops(stops: &[ColorStop]) -> Result<()> {
    let help = Some("Stops must start at level 0, end at level 255, and increase strictly".to_string());

    if stops.len() < 2 {
        return Err(FrameError::InvalidColorStops {
            message: format!("need at least 2 stops, got {}", stops.len()),
            help,
        });
    }

    let first = stops[0].level;
    let last = stops[stops.len() - 1].level;
    if first != 0 {
        return Err(FrameError::InvalidColorStops {
            message: format!("first stop is at level {}, expected 0", first),
            help,
        });
    }
    if last != 255 {
        return Err(FrameError::InvalidColorStops {
            message: format!("last stop is at level {}, expected 255", last),
            help,
        });
    }

    if let Some(pair) = stops.windows(2).find(|pair| pair[0].level >= pair[1].level) {
        return Err(FrameError::InvalidColorStops {
            message: format!(
                "stop levels must increase strictly, found {} followed by {}",
                pair[0].level, pair[1].level
            ),
            help,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_is_deterministic() {
        let a = ColorLut::build(&DEFAULT_STOPS).unwrap();
        let b = ColorLut::build(&DEFAULT_STOPS).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 256);
    }

    #[test]
    fn test_stop_levels_are_exact() {
        let lut = ColorLut::default();
        assert_eq!(lut.get(0), Rgb::new(0, 0, 139));
        assert_eq!(lut.get(64), Rgb::new(0, 139, 139));
        assert_eq!(lut.get(128), Rgb::new(0, 200, 100));
        assert_eq!(lut.get(192), Rgb::new(255, 215, 0));
        assert_eq!(lut.get(255), Rgb::new(255, 69, 0));
    }

    #[test]
    fn test_interpolated_level_lies_between_stops() {
        let lut = ColorLut::default();
        assert!(lut.get(32).is_between(lut.get(0), lut.get(64)));
        assert!(lut.get(160).is_between(lut.get(128), lut.get(192)));
        // Halfway between teal (0,139,139) and green (0,200,100)
        assert_eq!(lut.get(96), Rgb::new(0, 170, 120));
    }

    #[test]
    fn test_two_stop_gradient() {
        let stops = [
            ColorStop::new(0, Rgb::BLACK),
            ColorStop::new(255, Rgb::WHITE),
        ];
        let lut = ColorLut::build(&stops).unwrap();
        for level in 0..=255u8 {
            assert_eq!(lut.get(level), Rgb::new(level, level, level));
        }
    }

    #[test]
    fn test_rejects_single_stop() {
        let err = ColorLut::build(&[ColorStop::new(0, Rgb::BLACK)]).unwrap_err();
        assert!(matches!(err, FrameError::InvalidColorStops { .. }));
    }

    #[test]
    fn test_rejects_missing_anchors() {
        let no_zero = [
            ColorStop::new(10, Rgb::BLACK),
            ColorStop::new(255, Rgb::WHITE),
        ];
        assert!(ColorLut::build(&no_zero).is_err());

        let no_top = [
            ColorStop::new(0, Rgb::BLACK),
            ColorStop::new(200, Rgb::WHITE),
        ];
        assert!(ColorLut::build(&no_top).is_err());
    }

    #[test]
    fn test_rejects_unsorted_stops() {
        let stops = [
            ColorStop::new(0, Rgb::BLACK),
            ColorStop::new(128, Rgb::WHITE),
            ColorStop::new(64, Rgb::BLACK),
            ColorStop::new(255, Rgb::WHITE),
        ];
        let err = ColorLut::build(&stops).unwrap_err();
        assert!(err.to_string().contains("increase strictly"));
    }

    #[test]
    fn test_rejects_duplicate_levels() {
        let stops = [
            ColorStop::new(0, Rgb::BLACK),
            ColorStop::new(0, Rgb::WHITE),
            ColorStop::new(255, Rgb::WHITE),
        ];
        assert!(ColorLut::build(&stops).is_err());
    }
}
