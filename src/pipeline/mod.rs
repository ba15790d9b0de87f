//! Encode and decode sessions.
//!
//! ```text
//! encode: frame → BlockAverager → codec.compress ──────────────┐
//!                                   └→ codec.decompress        │
//!                                        → DeltaEncoder → RLE ─┴→ ContainerWriter
//!
//! decode: ContainerReader → codec.decompress ─┐
//!                         → RLE unpack ───────┴→ reconstruct → frame
//! ```

mod decoder;
mod encoder;

pub use decoder::DecodeSession;
pub use encoder::EncodeSession;
