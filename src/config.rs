//! Project settings (depthframe.yaml) parsing.
//!
//! Every field has a default, so an empty or missing file is valid. Command
//! line flags override whatever the file sets.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::TtlLruCache;
use crate::colour::{ColorLut, ColorStop};
use crate::error::{FrameError, Result};
use crate::render::{PipelineConfig, ResampleFilter, DEFAULT_SOURCE_WIDTH, DEFAULT_TARGET_WIDTH};

/// File name looked up by [`Settings::discover`].
pub const SETTINGS_FILE: &str = "depthframe.yaml";

/// Allowed range for `chunk_size`.
pub const CHUNK_SIZE_RANGE: std::ops::RangeInclusive<usize> = 1..=10_000;

/// Settings loaded from depthframe.yaml.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Pixel columns per CSV row.
    pub source_width: usize,

    /// Width of encoded frames.
    pub target_width: u32,

    pub filter: ResampleFilter,

    /// CSV rows processed per batch.
    pub chunk_size: usize,

    /// Directory of the frame store.
    pub store: PathBuf,

    /// Colour ramp; the built-in depth ramp when omitted.
    pub stops: Option<Vec<ColorStop>>,

    pub cache: CacheConfig,
}

fn default_store() -> PathBuf {
    PathBuf::from("frames")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_width: DEFAULT_SOURCE_WIDTH,
            target_width: DEFAULT_TARGET_WIDTH,
            filter: ResampleFilter::default(),
            chunk_size: 500,
            store: default_store(),
            stops: None,
            cache: CacheConfig::default(),
        }
    }
}

/// Sizing for the two service caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Single-frame lookups.
    pub frame: CacheSettings,
    /// Range queries.
    pub range: CacheSettings,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            frame: CacheSettings {
                max_size: 1000,
                ttl_seconds: 60,
            },
            range: CacheSettings {
                max_size: 100,
                ttl_seconds: 60,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    pub max_size: usize,
    pub ttl_seconds: u64,
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// Build an empty cache with these limits.
    pub fn build<V: Clone>(&self, name: &str) -> TtlLruCache<V> {
        TtlLruCache::new(self.max_size, self.ttl()).named(name)
    }
}

impl Settings {
    /// Load settings from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| FrameError::Io {
            path: path.to_path_buf(),
            message: format!("Failed to read settings: {}", e),
        })?;

        Self::parse(&content)
    }

    /// Parse settings from a YAML string.
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| FrameError::Parse {
            message: format!("Invalid settings: {}", e),
            help: Some(format!("Check {} syntax", SETTINGS_FILE)),
        })
    }

    /// Load `depthframe.yaml` from `dir` if it exists, defaults otherwise.
    pub fn discover(dir: &Path) -> Result<Self> {
        let path = dir.join(SETTINGS_FILE);
        if path.is_file() {
            tracing::debug!(path = %path.display(), "loading settings");
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| FrameError::Parse {
            message,
            help: Some(format!("Fix the value in {}", SETTINGS_FILE)),
        };

        if self.source_width == 0 {
            return Err(invalid("source_width must be greater than 0".to_string()));
        }
        if self.target_width == 0 {
            return Err(invalid("target_width must be greater than 0".to_string()));
        }
        if !CHUNK_SIZE_RANGE.contains(&self.chunk_size) {
            return Err(invalid(format!(
                "chunk_size must be between {} and {}, got {}",
                CHUNK_SIZE_RANGE.start(),
                CHUNK_SIZE_RANGE.end(),
                self.chunk_size
            )));
        }
        for (name, cache) in [("frame", self.cache.frame), ("range", self.cache.range)] {
            if cache.max_size == 0 {
                return Err(invalid(format!("cache.{}.max_size must be greater than 0", name)));
            }
            if cache.ttl_seconds == 0 {
                return Err(invalid(format!("cache.{}.ttl_seconds must be greater than 0", name)));
            }
        }

        self.lut().map(|_| ())
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            source_width: self.source_width,
            target_width: self.target_width,
            filter: self.filter,
        }
    }

    /// Build the configured lookup table.
    pub fn lut(&self) -> Result<ColorLut> {
        match &self.stops {
            Some(stops) => ColorLut::build(stops),
            None => Ok(ColorLut::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colour::Rgb;
    use tempfile::tempdir;

    #[test]
    fn test_parse_empty_is_default() {
        assert_eq!(Settings::parse("").unwrap(), Settings::default());
    }

    #[test]
    fn test_parse_partial_settings() {
        let yaml = "target_width: 64\nfilter: lanczos\ncache:\n  range:\n    max_size: 5\n    ttl_seconds: 10\n";
        let settings = Settings::parse(yaml).unwrap();

        assert_eq!(settings.target_width, 64);
        assert_eq!(settings.filter, ResampleFilter::Lanczos);
        assert_eq!(settings.source_width, 200);
        assert_eq!(settings.cache.range.max_size, 5);
        assert_eq!(settings.cache.range.ttl(), Duration::from_secs(10));
        assert_eq!(settings.cache.frame.max_size, 1000);
        assert_eq!(settings.store, PathBuf::from("frames"));
    }

    #[test]
    fn test_parse_stops() {
        let yaml = r##"
stops:
  - { level: 0, colour: "#000" }
  - { level: 255, colour: "#ffffff" }
"##;
        let settings = Settings::parse(yaml).unwrap();
        let lut = settings.lut().unwrap();
        assert_eq!(lut.get(0), Rgb::BLACK);
        assert_eq!(lut.get(255), Rgb::WHITE);
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let err = Settings::parse("chunk_size: [").unwrap_err();
        assert!(matches!(err, FrameError::Parse { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(Settings::default().validate().is_ok());

        let settings = Settings {
            chunk_size: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());

        let settings = Settings {
            chunk_size: 10_001,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.cache.frame.ttl_seconds = 0;
        assert!(settings.validate().is_err());

        let settings = Settings {
            stops: Some(vec![ColorStop::new(10, Rgb::BLACK), ColorStop::new(255, Rgb::WHITE)]),
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate().unwrap_err(),
            FrameError::InvalidColorStops { .. }
        ));
    }

    #[test]
    fn test_discover() {
        let dir = tempdir().unwrap();
        assert_eq!(Settings::discover(dir.path()).unwrap(), Settings::default());

        std::fs::write(dir.path().join(SETTINGS_FILE), "chunk_size: 42\n").unwrap();
        assert_eq!(Settings::discover(dir.path()).unwrap().chunk_size, 42);
    }
}
