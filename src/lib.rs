//! Chunked Delta Video Library
//!
//! A lossy video container in which every frame is carried two ways: a
//! small, lossily compressed image of per-block average colors, and one
//! luminance delta bit per pixel, run-length coded.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! source → keyframe → delta → rle → container
//!              ↓         ↓
//!            analysis (statistics, metrics)
//! ```
//!
//! # Design Principles
//!
//! - **Closed loop**: the encoder biases its decisions against the key
//!   image the decoder will actually decompress, not the original
//! - **Lock-step state**: encoder and decoder apply identical 4-bit
//!   saturating accumulator updates, so their state never diverges
//! - **Forward-only output**: chunks carry explicit lengths and are
//!   written in one pass, so the output need not be seekable
//! - **Fail loudly**: a stream without its end marker is reported as
//!   truncated, never as a short success
//!
//! # Example
//!
//! ```no_run
//! use akc_video::{
//!     keyframe::JpegCodec,
//!     pipeline::{DecodeSession, EncodeSession},
//!     source::{EncoderConfig, FrameSource, MockSource},
//! };
//!
//! let config = EncoderConfig::with_dimensions(64, 48);
//! let mut source = MockSource::new(64, 48, 10);
//! let mut session = EncodeSession::new(config, JpegCodec, Vec::new()).unwrap();
//!
//! while let Some(frame) = source.next_frame().unwrap() {
//!     session.encode_frame(&frame).unwrap();
//! }
//! let (bytes, stats) = session.finish().unwrap();
//! println!("{} frames, ratio {:.1}", stats.frames, stats.compression_ratio());
//!
//! let decoder = DecodeSession::open(JpegCodec, bytes.as_slice()).unwrap();
//! for frame in decoder {
//!     let frame = frame.unwrap();
//!     assert!(frame.is_valid());
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod analysis;
pub mod container;
pub mod delta;
pub mod error;
pub mod keyframe;
pub mod metrics;
pub mod pipeline;
pub mod rle;
pub mod source;

// Re-export commonly used types at crate root
pub use analysis::{FrameStats, SessionStats};
pub use container::{ContainerReader, ContainerWriter, FormatError, Header};
pub use delta::{AccumulatorBank, BitPlane, DeltaEncoder};
pub use error::{Error, Result};
pub use keyframe::{BlockAverager, BlockGrid, CodecError, JpegCodec, KeyImageCodec, RawCodec};
pub use pipeline::{DecodeSession, EncodeSession};
pub use rle::RlePacker;
pub use source::{ConfigError, EncoderConfig, Frame, FrameSource, FrameSourceError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
