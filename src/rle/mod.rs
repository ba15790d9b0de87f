//! Run-length coding of delta bits.

mod packer;

pub use packer::{runs, RleError, RlePacker, Run, MAX_RUN};
