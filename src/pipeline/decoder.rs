//! Decoder session: container in, frames out.

use crate::container::{ContainerReader, FormatError, Header};
use crate::delta::{AccumulatorBank, DeltaEncoder, DeltaError};
use crate::error::{Error, Result};
use crate::keyframe::{BlockGrid, KeyImageCodec};
use crate::rle::RlePacker;
use crate::source::Frame;
use std::io::Read;

/// Reconstructs frames from a container, in order.
///
/// Mirrors the encoder's accumulator updates bit for bit; a frame can
/// only be rebuilt after every earlier frame has been. The first error
/// ends the session: later frames would be built on a bank that missed
/// the failed frame's updates.
pub struct DecodeSession<R: Read, C: KeyImageCodec> {
    reader: ContainerReader<R>,
    codec: C,
    bank: AccumulatorBank,
    block_size: Option<u32>,
    frames_decoded: u64,
    failed: bool,
}

impl<R: Read, C: KeyImageCodec> DecodeSession<R, C> {
    /// Reads the container header from `input`.
    pub fn open(codec: C, input: R) -> Result<Self> {
        let reader = ContainerReader::open(input).map_err(|source| Error::Format {
            frames_decoded: 0,
            source,
        })?;
        let header = *reader.header();

        Ok(Self {
            reader,
            codec,
            bank: AccumulatorBank::new(header.width, header.height),
            block_size: None,
            frames_decoded: 0,
            failed: false,
        })
    }

    pub fn header(&self) -> &Header {
        self.reader.header()
    }

    /// Returns the decoder-side accumulator state.
    pub fn accumulator(&self) -> &AccumulatorBank {
        &self.bank
    }

    /// Returns the number of frames reconstructed so far.
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    /// True once an error has ended the session.
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Returns the block size, once the first key image has been seen.
    pub fn block_size(&self) -> Option<u32> {
        self.block_size
    }

    fn format_error(&self, source: impl Into<FormatError>) -> Error {
        Error::Format {
            frames_decoded: self.frames_decoded,
            source: source.into(),
        }
    }

    /// Derives the block size from a key image and checks it against
    /// the header and earlier frames.
    fn block_size_for(&self, grid: &BlockGrid) -> std::result::Result<u32, DeltaError> {
        let header = self.reader.header();
        let mismatch = |block_size| DeltaError::GridMismatch {
            grid_w: grid.width(),
            grid_h: grid.height(),
            width: header.width,
            height: header.height,
            block_size,
        };

        if grid.width() == 0 || header.width % grid.width() != 0 {
            return Err(mismatch(self.block_size.unwrap_or(0)));
        }
        let block_size = header.width / grid.width();
        if grid.height() * block_size != header.height {
            return Err(mismatch(block_size));
        }
        if let Some(known) = self.block_size {
            if known != block_size {
                return Err(mismatch(known));
            }
        }
        Ok(block_size)
    }

    /// Reconstructs the next frame, or returns `None` after the end marker.
    ///
    /// After an error every later call returns `Ok(None)`.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.failed {
            return Ok(None);
        }
        let result = self.decode_chunk();
        if let Err(e) = &result {
            self.failed = true;
            tracing::warn!(frames = self.frames_decoded, error = %e, "Decode session failed");
        }
        result
    }

    fn decode_chunk(&mut self) -> Result<Option<Frame>> {
        let chunk = match self.reader.next_chunk() {
            Ok(Some(chunk)) => chunk,
            Ok(None) => {
                tracing::info!(frames = self.frames_decoded, "Decode session finished");
                return Ok(None);
            }
            Err(e) => return Err(self.format_error(e)),
        };

        let grid = self
            .codec
            .decompress(&chunk.key_image)
            .map_err(|e| self.format_error(e))?;
        let block_size = self
            .block_size_for(&grid)
            .map_err(|e| self.format_error(e))?;
        self.block_size = Some(block_size);

        let plane = RlePacker::unpack(&chunk.rle, self.header().pixel_count())
            .map_err(|e| self.format_error(e))?;
        let frame = DeltaEncoder::new(block_size)
            .reconstruct(&grid, &plane, &mut self.bank, self.frames_decoded)
            .map_err(|e| self.format_error(e))?;

        tracing::debug!(
            frame = self.frames_decoded,
            key_bytes = chunk.key_image.len(),
            rle_bytes = chunk.rle.len(),
            "Decoded frame"
        );
        self.frames_decoded += 1;
        Ok(Some(frame))
    }
}

impl<R: Read, C: KeyImageCodec> Iterator for DecodeSession<R, C> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ContainerWriter, HEADER_LEN};
    use crate::keyframe::{BlockGrid, RawCodec};

    fn raw_key(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        RawCodec
            .compress(&BlockGrid::filled(width, height, rgb), 50)
            .unwrap()
    }

    #[test]
    fn test_rle_underrun_reports_frame() {
        let mut writer = ContainerWriter::new(Vec::new(), Header::new(16, 8, 30)).unwrap();
        writer.write_video_chunk(&raw_key(2, 1, [9, 9, 9]), &[0x7F, 0x01]).unwrap();
        writer.write_video_chunk(&raw_key(2, 1, [9, 9, 9]), &[0x7F]).unwrap();
        let bytes = writer.finish().unwrap();

        let mut session = DecodeSession::open(RawCodec, bytes.as_slice()).unwrap();
        assert!(session.next_frame().unwrap().is_some());

        let err = session.next_frame().unwrap_err();
        assert!(matches!(
            err,
            Error::Format {
                frames_decoded: 1,
                source: FormatError::Rle(_)
            }
        ));
    }

    fn collect_ok_flags(bytes: &[u8]) -> Vec<bool> {
        DecodeSession::open(RawCodec, bytes)
            .unwrap()
            .map(|frame| frame.is_ok())
            .collect()
    }

    #[test]
    fn test_stops_after_rle_error() {
        let mut writer = ContainerWriter::new(Vec::new(), Header::new(16, 8, 30)).unwrap();
        writer.write_video_chunk(&raw_key(2, 1, [9, 9, 9]), &[0x7F]).unwrap();
        writer.write_video_chunk(&raw_key(2, 1, [9, 9, 9]), &[0xFF, 0x81]).unwrap();
        let bytes = writer.finish().unwrap();

        assert_eq!(collect_ok_flags(&bytes), vec![false]);
    }

    #[test]
    fn test_stops_after_corrupt_key_image() {
        let mut writer = ContainerWriter::new(Vec::new(), Header::new(16, 8, 30)).unwrap();
        writer.write_video_chunk(&raw_key(2, 1, [9, 9, 9]), &[0xFF, 0x81]).unwrap();
        writer.write_video_chunk(&[1, 2, 3], &[0xFF, 0x81]).unwrap();
        writer.write_video_chunk(&raw_key(2, 1, [9, 9, 9]), &[0xFF, 0x81]).unwrap();
        let bytes = writer.finish().unwrap();

        assert_eq!(collect_ok_flags(&bytes), vec![true, false]);

        let mut session = DecodeSession::open(RawCodec, bytes.as_slice()).unwrap();
        assert!(session.next_frame().unwrap().is_some());
        assert!(matches!(
            session.next_frame(),
            Err(Error::Format {
                frames_decoded: 1,
                source: FormatError::KeyImage(_)
            })
        ));
        assert!(session.has_failed());
        assert!(session.next_frame().unwrap().is_none());
        assert_eq!(session.frames_decoded(), 1);
    }

    #[test]
    fn test_oversized_header_on_open() {
        let mut bytes = Header::new(8, 8, 1).to_bytes().to_vec();
        bytes[4..12].fill(0xFF);
        assert!(matches!(
            DecodeSession::open(RawCodec, bytes.as_slice()),
            Err(Error::Format {
                frames_decoded: 0,
                source: FormatError::InvalidHeader {
                    width: u32::MAX,
                    height: u32::MAX
                }
            })
        ));
    }

    #[test]
    fn test_key_image_size_mismatch() {
        let mut writer = ContainerWriter::new(Vec::new(), Header::new(16, 8, 30)).unwrap();
        writer.write_video_chunk(&raw_key(3, 1, [0, 0, 0]), &[0x7F, 0x01]).unwrap();
        let bytes = writer.finish().unwrap();

        let mut session = DecodeSession::open(RawCodec, bytes.as_slice()).unwrap();
        assert!(matches!(
            session.next_frame(),
            Err(Error::Format {
                source: FormatError::DimensionMismatch(_),
                ..
            })
        ));
    }

    #[test]
    fn test_bad_magic_on_open() {
        let mut bytes = Header::new(8, 8, 1).to_bytes().to_vec();
        bytes[3] = b'x';
        assert!(matches!(
            DecodeSession::open(RawCodec, bytes.as_slice()),
            Err(Error::Format {
                frames_decoded: 0,
                source: FormatError::BadMagic(_)
            })
        ));
    }

    #[test]
    fn test_empty_stream() {
        let writer = ContainerWriter::new(Vec::new(), Header::new(8, 8, 1)).unwrap();
        let bytes = writer.finish().unwrap();
        assert_eq!(bytes.len(), HEADER_LEN + 1);

        let session = DecodeSession::open(RawCodec, bytes.as_slice()).unwrap();
        assert_eq!(session.count(), 0);
    }
}
