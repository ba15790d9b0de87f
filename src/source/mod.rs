//! Raw frame input and session configuration.
//!
//! This module provides the frame type, the encoder configuration, and
//! the sources that feed the pipeline: an external decoder process, a
//! raw RGB24 byte stream, and synthetic frames for testing.

mod config;
mod ffmpeg;
mod frame;
mod stream;

pub use config::{
    ConfigError, EncoderConfig, FileConfig, OutputConfig, DEFAULT_BLOCK_SIZE, DEFAULT_QUALITY,
};
pub use ffmpeg::FfmpegSource;
pub use frame::{luminance, Frame, BYTES_PER_PIXEL};
pub use stream::{FrameSource, FrameSourceError, MockSource, RawFrameReader};
