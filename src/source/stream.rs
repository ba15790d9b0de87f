//! Frame source abstraction.
//!
//! A source is a one-shot ordered stream of fixed-size RGB24 frames.
//! End of stream is a clean read of zero bytes at a frame boundary;
//! anything shorter than a full frame is an error.

use super::frame::{Frame, BYTES_PER_PIXEL};
use std::io::{self, Read};
use thiserror::Error;

/// Errors that can occur while reading frames.
#[derive(Debug, Error)]
pub enum FrameSourceError {
    #[error("short frame read: got {got} of {expected} bytes")]
    ShortRead { got: usize, expected: usize },
    #[error("frame is {got:?}, expected {expected:?}")]
    UnexpectedDimensions {
        expected: (u32, u32),
        got: (u32, u32),
    },
    #[error("failed to read frame: {0}")]
    Io(#[from] io::Error),
    #[error("failed to spawn frame decoder: {0}")]
    SpawnFailed(String),
    #[error("frame decoder exited with status {0}")]
    DecoderFailed(String),
}

/// Trait for ordered frame producers.
///
/// This abstraction allows swapping between an external decoder
/// process, a raw file, and synthetic frames for testing.
pub trait FrameSource {
    /// Returns the next frame, or `None` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameSourceError>;

    /// Returns the `(width, height)` of every frame this source produces.
    fn dimensions(&self) -> (u32, u32);
}

/// Reads fixed-size RGB24 frames from any byte stream.
pub struct RawFrameReader<R> {
    inner: R,
    width: u32,
    height: u32,
    sequence: u64,
}

impl<R: Read> RawFrameReader<R> {
    pub fn new(inner: R, width: u32, height: u32) -> Self {
        Self {
            inner,
            width,
            height,
            sequence: 0,
        }
    }

    /// Returns the number of frames read so far.
    pub fn frames_read(&self) -> u64 {
        self.sequence
    }

    /// Returns the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn frame_len(&self) -> usize {
        (self.width as usize) * (self.height as usize) * BYTES_PER_PIXEL
    }
}

impl<R: Read> FrameSource for RawFrameReader<R> {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameSourceError> {
        let expected = self.frame_len();
        let mut pixels = vec![0u8; expected];
        let mut filled = 0;

        while filled < expected {
            match self.inner.read(&mut pixels[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if filled == 0 {
            return Ok(None);
        }
        if filled < expected {
            return Err(FrameSourceError::ShortRead {
                got: filled,
                expected,
            });
        }

        let frame = Frame::new(pixels, self.width, self.height, self.sequence);
        self.sequence += 1;
        Ok(Some(frame))
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Mock source for testing that generates synthetic frames.
///
/// Produces a diagonal gradient that drifts by a few levels per frame,
/// so consecutive frames differ but stay correlated.
#[derive(Debug)]
pub struct MockSource {
    width: u32,
    height: u32,
    remaining: u64,
    sequence: u64,
}

impl MockSource {
    pub fn new(width: u32, height: u32, frames: u64) -> Self {
        Self {
            width,
            height,
            remaining: frames,
            sequence: 0,
        }
    }
}

impl FrameSource for MockSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameSourceError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;

        let shift = (self.sequence * 3) as u32;
        let mut pixels = Vec::with_capacity((self.width * self.height) as usize * BYTES_PER_PIXEL);
        for y in 0..self.height {
            for x in 0..self.width {
                let v = ((x + y + shift) % 256) as u8;
                pixels.extend_from_slice(&[v, v / 2, 255 - v]);
            }
        }

        let frame = Frame::new(pixels, self.width, self.height, self.sequence);
        self.sequence += 1;
        Ok(Some(frame))
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_raw_reader_reads_whole_frames() {
        let data = vec![7u8; 4 * 2 * 3 * 2];
        let mut reader = RawFrameReader::new(Cursor::new(data), 4, 2);

        let first = reader.next_frame().unwrap().unwrap();
        assert_eq!(first.sequence(), 0);
        assert!(first.is_valid());

        let second = reader.next_frame().unwrap().unwrap();
        assert_eq!(second.sequence(), 1);

        assert!(reader.next_frame().unwrap().is_none());
        assert_eq!(reader.frames_read(), 2);
    }

    #[test]
    fn test_raw_reader_short_read() {
        let data = vec![0u8; 4 * 2 * 3 + 5];
        let mut reader = RawFrameReader::new(Cursor::new(data), 4, 2);

        assert!(reader.next_frame().unwrap().is_some());
        assert!(matches!(
            reader.next_frame(),
            Err(FrameSourceError::ShortRead { got: 5, expected: 24 })
        ));
    }

    #[test]
    fn test_mock_source_is_finite() {
        let mut source = MockSource::new(8, 8, 2);

        let a = source.next_frame().unwrap().unwrap();
        let b = source.next_frame().unwrap().unwrap();
        assert!(a.is_valid());
        assert_ne!(a.pixels(), b.pixels());
        assert!(source.next_frame().unwrap().is_none());
    }
}
