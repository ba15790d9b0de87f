//! Encoding statistics and reconstruction quality.
//!
//! These are observations about a session, not inputs to it: nothing
//! here feeds back into the bits written to the container.

mod quality;
mod stats;

pub use quality::{mse, psnr};
pub use stats::{FrameStats, SessionStats};
