//! Per-pixel delta bits and the accumulator state behind them.
//!
//! This module turns a frame and its reconstructed key image into one
//! bit per pixel, and back. The accumulator bank is the only state
//! carried from frame to frame, so frames must be processed in order.

mod accumulator;
mod bitplane;
mod encoder;

pub use accumulator::{AccumulatorBank, ACCUMULATOR_BITS, ACCUMULATOR_MAX};
pub use bitplane::BitPlane;
pub use encoder::{
    biased_luminance, delta_bit, reconstruct_channel, DeltaEncoder, DeltaError,
};
