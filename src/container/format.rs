//! Wire layout of the chunked delta video container.
//!
//! All integers are little-endian.
//!
//! ```text
//! header:  magic "ak-c" | width:u32 | height:u32 | fps:u16
//! chunk:   continuation:u8 = 0 | type:u8 | payload
//! end:     continuation:u8 = 1
//!
//! video payload:
//!          keyImageSize:u32 | keyImage | rleSize:u32 | rle
//! ```

use crate::delta::DeltaError;
use crate::keyframe::CodecError;
use crate::rle::RleError;
use std::io::{self, Read, Write};
use thiserror::Error;

/// Container magic bytes.
pub const MAGIC: [u8; 4] = *b"ak-c";

/// Header length in bytes.
pub const HEADER_LEN: usize = 4 + 4 + 4 + 2;

/// Continuation byte preceding a chunk.
pub const CONTINUE: u8 = 0;

/// Continuation byte marking end of stream.
pub const END_OF_STREAM: u8 = 1;

/// Largest frame a stream may declare (16384x16384).
pub const MAX_PIXELS: u64 = 1 << 28;

/// Decode-side format errors.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("bad magic {0:02x?}, expected \"ak-c\"")]
    BadMagic([u8; 4]),
    #[error("stream truncated while reading {0}")]
    TruncatedStream(&'static str),
    #[error("unsupported chunk type 0x{0:02x}")]
    UnsupportedChunk(u8),
    #[error("invalid continuation byte 0x{0:02x}")]
    InvalidContinuation(u8),
    #[error("invalid header dimensions {width}x{height}")]
    InvalidHeader { width: u32, height: u32 },
    #[error("undecodable key image: {0}")]
    KeyImage(#[from] CodecError),
    #[error("malformed delta bits: {0}")]
    Rle(#[from] RleError),
    #[error("key image does not match stream: {0}")]
    DimensionMismatch(#[from] DeltaError),
    #[error("read failed: {0}")]
    Io(io::Error),
}

/// Reads exactly `buf.len()` bytes, mapping EOF to a truncation error.
pub(crate) fn read_exact_or_truncated<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    what: &'static str,
) -> Result<(), FormatError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => FormatError::TruncatedStream(what),
        _ => FormatError::Io(e),
    })
}

/// Kinds of chunk the container can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChunkType {
    /// Key image plus delta bits for one frame.
    Video = 0,
}

impl ChunkType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Video),
            _ => None,
        }
    }
}

/// Stream header, written once before any chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second (informational only).
    pub fps: u16,
}

impl Header {
    pub fn new(width: u32, height: u32, fps: u16) -> Self {
        Self { width, height, fps }
    }

    /// Returns the number of pixels per frame.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// True if both dimensions are non-zero and the frame stays within
    /// [`MAX_PIXELS`].
    pub fn has_valid_dimensions(&self) -> bool {
        self.width != 0
            && self.height != 0
            && (self.width as u64)
                .checked_mul(self.height as u64)
                .is_some_and(|pixels| pixels <= MAX_PIXELS)
    }

    /// Serializes the header.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&MAGIC);
        out[4..8].copy_from_slice(&self.width.to_le_bytes());
        out[8..12].copy_from_slice(&self.height.to_le_bytes());
        out[12..14].copy_from_slice(&self.fps.to_le_bytes());
        out
    }

    /// Writes the header.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_bytes())
    }

    /// Reads and validates a header.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, FormatError> {
        let mut buf = [0u8; HEADER_LEN];
        read_exact_or_truncated(reader, &mut buf, "header")?;

        let magic = [buf[0], buf[1], buf[2], buf[3]];
        if magic != MAGIC {
            return Err(FormatError::BadMagic(magic));
        }

        let width = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let height = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
        let header = Self {
            width,
            height,
            fps: u16::from_le_bytes([buf[12], buf[13]]),
        };
        // Checked before anything is sized from these fields
        if !header.has_valid_dimensions() {
            return Err(FormatError::InvalidHeader { width, height });
        }
        Ok(header)
    }
}

/// Payload of one video chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoChunk {
    /// Compressed key image, opaque to the container.
    pub key_image: Vec<u8>,
    /// Run-length coded delta bits.
    pub rle: Vec<u8>,
}

impl VideoChunk {
    /// Encoded size of the chunk including continuation and type bytes.
    pub fn encoded_len(&self) -> usize {
        2 + 4 + self.key_image.len() + 4 + self.rle.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_header_layout() {
        let bytes = Header::new(16, 8, 30).to_bytes();
        assert_eq!(&bytes[0..4], b"ak-c");
        assert_eq!(&bytes[4..8], &[16, 0, 0, 0]);
        assert_eq!(&bytes[8..12], &[8, 0, 0, 0]);
        assert_eq!(&bytes[12..14], &[30, 0]);
    }

    #[test]
    fn test_header_read_back() {
        let header = Header::new(640, 480, 24);
        let mut cursor = Cursor::new(header.to_bytes().to_vec());
        assert_eq!(Header::read_from(&mut cursor).unwrap(), header);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = Header::new(8, 8, 1).to_bytes();
        bytes[0] = b'x';
        assert!(matches!(
            Header::read_from(&mut Cursor::new(bytes.to_vec())),
            Err(FormatError::BadMagic(_))
        ));
    }

    #[test]
    fn test_truncated_header() {
        let bytes = Header::new(8, 8, 1).to_bytes();
        assert!(matches!(
            Header::read_from(&mut Cursor::new(bytes[..9].to_vec())),
            Err(FormatError::TruncatedStream("header"))
        ));
    }

    #[test]
    fn test_oversized_header_rejected() {
        for (width, height) in [(u32::MAX, u32::MAX), (1 << 15, 1 << 14), (0, 8)] {
            let bytes = Header::new(width, height, 30).to_bytes();
            assert!(matches!(
                Header::read_from(&mut Cursor::new(bytes.to_vec())),
                Err(FormatError::InvalidHeader { width: w, height: h }) if w == width && h == height
            ));
        }
        assert!(Header::new(1 << 14, 1 << 14, 30).has_valid_dimensions());
    }

    #[test]
    fn test_chunk_type_bytes() {
        assert_eq!(ChunkType::from_byte(0), Some(ChunkType::Video));
        assert_eq!(ChunkType::from_byte(0xFF), None);
        assert_eq!(ChunkType::Video as u8, 0);
    }
}
