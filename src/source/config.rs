//! Encoder session configuration.
//!
//! Output width and height are inputs, not discovered from the source.
//! Everything is validated before any I/O is opened, since a bad
//! width/height/block size relationship cannot be recovered mid-stream.

use crate::container::MAX_PIXELS;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default block edge length for key image averaging.
pub const DEFAULT_BLOCK_SIZE: u32 = 8;

/// Default key image quality.
pub const DEFAULT_QUALITY: u8 = 75;

/// Configuration for an encoder session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Output frame width in pixels.
    pub width: u32,
    /// Output frame height in pixels.
    pub height: u32,
    /// Frames per second (informational only).
    pub fps: u16,
    /// Edge length of the square blocks averaged into the key image.
    pub block_size: u32,
    /// Key image compression quality, 1-100.
    pub quality: u8,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
            block_size: DEFAULT_BLOCK_SIZE,
            quality: DEFAULT_QUALITY,
        }
    }
}

impl EncoderConfig {
    /// Default settings at the given output size.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Checks every constraint the encoder relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 || self.block_size > 255 {
            return Err(ConfigError::InvalidBlockSize(self.block_size));
        }
        if self.width == 0
            || self.height == 0
            || self.width as u64 * self.height as u64 > MAX_PIXELS
            || self.width % self.block_size != 0
            || self.height % self.block_size != 0
        {
            return Err(ConfigError::InvalidDimensions {
                width: self.width,
                height: self.height,
                block_size: self.block_size,
            });
        }
        if !(1..=100).contains(&self.quality) {
            return Err(ConfigError::InvalidQuality(self.quality));
        }
        if self.fps == 0 {
            return Err(ConfigError::InvalidFrameRate);
        }
        Ok(())
    }

    /// Returns the number of pixels per frame.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid frame dimensions {width}x{height} (must be non-zero multiples of block size {block_size}, at most 2^28 pixels)")]
    InvalidDimensions {
        width: u32,
        height: u32,
        block_size: u32,
    },
    #[error("invalid block size {0} (must be 1-255)")]
    InvalidBlockSize(u32),
    #[error("invalid quality {0} (must be 1-100)")]
    InvalidQuality(u8),
    #[error("invalid frame rate (must be non-zero)")]
    InvalidFrameRate,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Stop after this many frames (0 for the whole source).
    pub max_frames: u64,
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_frames: 0,
            metrics_port: 0,
        }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.encoder.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_vga_block_8() {
        let config = EncoderConfig::default();
        assert_eq!((config.width, config.height), (640, 480));
        assert_eq!(config.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(config.pixel_count(), 640 * 480);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_zero_height_rejected() {
        let config = EncoderConfig::with_dimensions(64, 0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidDimensions {
                width: 64,
                height: 0,
                block_size: 8,
            })
        );
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let config = EncoderConfig::with_dimensions(32768, 16384);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimensions { width: 32768, .. })
        ));
    }

    #[test]
    fn test_zero_fps_rejected() {
        let config = EncoderConfig {
            fps: 0,
            ..EncoderConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidFrameRate));
    }

    #[test]
    fn test_non_multiple_of_block_size_invalid() {
        let config = EncoderConfig::with_dimensions(17, 8);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimensions { width: 17, .. })
        ));
    }

    #[test]
    fn test_block_size_bounds() {
        let mut config = EncoderConfig::with_dimensions(256, 256);
        config.block_size = 256;
        assert_eq!(config.validate(), Err(ConfigError::InvalidBlockSize(256)));

        config.block_size = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidBlockSize(0)));
    }

    #[test]
    fn test_quality_bounds() {
        let mut config = EncoderConfig::default();
        config.quality = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidQuality(0)));

        config.quality = 101;
        assert_eq!(config.validate(), Err(ConfigError::InvalidQuality(101)));
    }

    #[test]
    fn test_from_toml_partial() {
        let config = FileConfig::from_toml(
            r#"
            [encoder]
            width = 320
            height = 240
            quality = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.encoder.width, 320);
        assert_eq!(config.encoder.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(config.encoder.quality, 50);
        assert_eq!(config.output.max_frames, 0);
    }

    #[test]
    fn test_from_toml_rejects_invalid() {
        let result = FileConfig::from_toml("[encoder]\nwidth = 100\nheight = 64\n");
        assert!(matches!(result, Err(ConfigError::InvalidDimensions { .. })));
    }
}
