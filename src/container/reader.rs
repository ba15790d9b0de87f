//! Streaming container reader.

use super::format::{
    read_exact_or_truncated, ChunkType, FormatError, Header, VideoChunk, CONTINUE, END_OF_STREAM,
};
use std::io::Read;

/// Reads the header, then yields video chunks until the end marker.
///
/// Running out of input before the end marker is a
/// [`FormatError::TruncatedStream`], never a silent end of stream.
pub struct ContainerReader<R: Read> {
    inner: R,
    header: Header,
    chunks_read: u64,
    finished: bool,
}

impl<R: Read> ContainerReader<R> {
    /// Reads and validates the header.
    pub fn open(mut inner: R) -> Result<Self, FormatError> {
        let header = Header::read_from(&mut inner)?;
        tracing::debug!(
            width = header.width,
            height = header.height,
            fps = header.fps,
            "Opened container"
        );
        Ok(Self {
            inner,
            header,
            chunks_read: 0,
            finished: false,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns the number of chunks read so far.
    pub fn chunks_read(&self) -> u64 {
        self.chunks_read
    }

    /// Returns true once the end marker or an error has been read.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Returns the next chunk, or `None` after the end marker.
    ///
    /// After an error the reader is finished and yields nothing more.
    pub fn next_chunk(&mut self) -> Result<Option<VideoChunk>, FormatError> {
        if self.finished {
            return Ok(None);
        }
        let result = self.read_chunk();
        if result.is_err() {
            self.finished = true;
        }
        result
    }

    fn read_chunk(&mut self) -> Result<Option<VideoChunk>, FormatError> {
        let mut marker = [0u8; 1];
        read_exact_or_truncated(&mut self.inner, &mut marker, "continuation byte")?;
        match marker[0] {
            CONTINUE => {}
            END_OF_STREAM => {
                self.finished = true;
                tracing::debug!(chunks = self.chunks_read, "Reached end marker");
                return Ok(None);
            }
            other => return Err(FormatError::InvalidContinuation(other)),
        }

        let mut kind = [0u8; 1];
        read_exact_or_truncated(&mut self.inner, &mut kind, "chunk type")?;
        match ChunkType::from_byte(kind[0]) {
            Some(ChunkType::Video) => {}
            None => return Err(FormatError::UnsupportedChunk(kind[0])),
        }

        let key_image = self.read_sized("key image")?;
        let rle = self.read_sized("delta bits")?;
        self.chunks_read += 1;

        Ok(Some(VideoChunk { key_image, rle }))
    }

    /// Reads a `u32` length prefix and that many bytes.
    fn read_sized(&mut self, what: &'static str) -> Result<Vec<u8>, FormatError> {
        let mut len = [0u8; 4];
        read_exact_or_truncated(&mut self.inner, &mut len, what)?;
        let len = u32::from_le_bytes(len) as u64;

        // Bounded by what the stream actually holds, not by the claimed length
        let mut buf = Vec::new();
        (&mut self.inner)
            .take(len)
            .read_to_end(&mut buf)
            .map_err(FormatError::Io)?;
        if (buf.len() as u64) < len {
            return Err(FormatError::TruncatedStream(what));
        }
        Ok(buf)
    }
}

impl<R: Read> Iterator for ContainerReader<R> {
    type Item = Result<VideoChunk, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}
