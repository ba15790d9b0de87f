//! Prometheus metrics exporter for encoder sessions.
//!
//! # Metrics Exposed
//!
//! ## Throughput
//! - `akc_frames_encoded_total` - Frames encoded
//! - `akc_key_image_bytes_total` - Compressed key image bytes written
//! - `akc_rle_bytes_total` - Run-length coded delta bytes written
//! - `akc_session_complete` - Whether the container was finalized
//!
//! ## Stream shape
//! - `akc_compression_ratio` - Raw RGB24 bytes over payload bytes
//! - `akc_accumulator_mean` - Mean accumulator value after the latest frame
//! - `akc_delta_ones_ratio` - Fraction of delta bits set in the latest frame
//! - `akc_reconstruction_psnr_db` - PSNR of the latest reconstruction
//!
//! The live HTTP exporter (`/metrics`, `/status`, `/health`) requires the
//! `metrics` feature.
//!
//! # Example
//!
//! ```no_run
//! use akc_video::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! let snapshot = MetricsSnapshot {
//!     frames: 120,
//!     key_bytes: 48_000,
//!     rle_bytes: 96_000,
//!     complete: false,
//!     compression_ratio: 18.4,
//!     accumulator_mean: 1.7,
//!     ones_ratio: Some(0.21),
//!     psnr: Some(27.5),
//! };
//!
//! registry.update(&snapshot);
//! println!("{}", registry.encode().unwrap());
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, MetricsState, ServerError};
