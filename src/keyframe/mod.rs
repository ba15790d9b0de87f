//! Key images: per-block average colors and their compression.
//!
//! Every frame is reduced to a coarse grid of block averages which is
//! then lossily compressed. The grid is the base signal the per-pixel
//! delta bits refine.

mod block;
mod codec;

pub use block::{BlockAverager, BlockGrid};
pub use codec::{CodecError, JpegCodec, KeyImageCodec, RawCodec};
