//! Binary framing of the chunked delta video stream.
//!
//! A header is followed by one video chunk per frame and a one-byte end
//! marker. Each video chunk carries explicit lengths for both its key
//! image and its run-length coded delta bits.

mod format;
mod reader;
mod writer;

pub use format::{
    ChunkType, FormatError, Header, VideoChunk, CONTINUE, END_OF_STREAM, HEADER_LEN, MAGIC,
    MAX_PIXELS,
};
pub use reader::ContainerReader;
pub use writer::ContainerWriter;
