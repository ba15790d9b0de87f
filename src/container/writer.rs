//! Single-pass container writer.
//!
//! Each chunk's key image is already compressed in memory when it is
//! written, so sizes go out before payloads and the output never needs
//! to be seekable.

use super::format::{ChunkType, Header, CONTINUE, END_OF_STREAM, HEADER_LEN};
use std::io::{self, Write};

/// Writes a header, video chunks, and the end marker.
///
/// Dropping the writer without calling [`ContainerWriter::finish`]
/// leaves the stream without an end marker, which readers report as
/// truncated.
pub struct ContainerWriter<W: Write> {
    inner: W,
    header: Header,
    chunks_written: u64,
    bytes_written: u64,
}

fn length_prefix(len: usize, what: &str) -> io::Result<[u8; 4]> {
    u32::try_from(len)
        .map(u32::to_le_bytes)
        .map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} of {} bytes exceeds u32 length field", what, len),
            )
        })
}

impl<W: Write> ContainerWriter<W> {
    /// Writes the header and returns the writer.
    pub fn new(mut inner: W, header: Header) -> io::Result<Self> {
        header.write_to(&mut inner)?;
        Ok(Self {
            inner,
            header,
            chunks_written: 0,
            bytes_written: HEADER_LEN as u64,
        })
    }

    /// Returns the header this writer emitted.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns the number of chunks written.
    pub fn chunks_written(&self) -> u64 {
        self.chunks_written
    }

    /// Returns total bytes written, header included.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Writes one video chunk and returns its encoded size.
    pub fn write_video_chunk(&mut self, key_image: &[u8], rle: &[u8]) -> io::Result<usize> {
        let key_len = length_prefix(key_image.len(), "key image")?;
        let rle_len = length_prefix(rle.len(), "delta bits")?;

        self.inner.write_all(&[CONTINUE, ChunkType::Video as u8])?;
        self.inner.write_all(&key_len)?;
        self.inner.write_all(key_image)?;
        self.inner.write_all(&rle_len)?;
        self.inner.write_all(rle)?;

        let written = 2 + 4 + key_image.len() + 4 + rle.len();
        self.chunks_written += 1;
        self.bytes_written += written as u64;

        tracing::trace!(
            chunk = self.chunks_written,
            key_bytes = key_image.len(),
            rle_bytes = rle.len(),
            "Wrote video chunk"
        );
        Ok(written)
    }

    /// Writes the end marker, flushes, and returns the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.write_all(&[END_OF_STREAM])?;
        self.inner.flush()?;
        self.bytes_written += 1;

        tracing::debug!(
            chunks = self.chunks_written,
            bytes = self.bytes_written,
            "Container finalized"
        );
        Ok(self.inner)
    }

    /// Returns the inner writer without writing the end marker.
    pub fn into_inner(self) -> W {
        self.inner
    }
}
