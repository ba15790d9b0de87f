//! Key image codecs.
//!
//! The pipeline depends on a lossy image codec only through the
//! [`KeyImageCodec`] trait: compress a block grid into bytes, and turn
//! bytes back into an approximate grid.

use super::block::BlockGrid;
use crate::source::BYTES_PER_PIXEL;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, ExtendedColorType, ImageFormat};
use thiserror::Error;

/// Errors that can occur in a key image codec.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid quality {0} (must be 1-100)")]
    InvalidQuality(u8),
    #[error("key image encode failed: {0}")]
    Encode(String),
    #[error("key image decode failed: {0}")]
    Decode(String),
    #[error("key image has {found} channels, expected 3")]
    ChannelCount { found: u8 },
}

/// Trait for key image codec implementations.
///
/// `compress` must be deterministic for a fixed grid and quality; the
/// encoder relies on decompressing its own output to see exactly what
/// the decoder will see.
pub trait KeyImageCodec {
    /// Compresses a block grid at the given quality (1-100).
    fn compress(&self, grid: &BlockGrid, quality: u8) -> Result<Vec<u8>, CodecError>;

    /// Decompresses bytes produced by [`KeyImageCodec::compress`].
    fn decompress(&self, bytes: &[u8]) -> Result<BlockGrid, CodecError>;
}

impl<C: KeyImageCodec + ?Sized> KeyImageCodec for Box<C> {
    fn compress(&self, grid: &BlockGrid, quality: u8) -> Result<Vec<u8>, CodecError> {
        (**self).compress(grid, quality)
    }

    fn decompress(&self, bytes: &[u8]) -> Result<BlockGrid, CodecError> {
        (**self).decompress(bytes)
    }
}

fn check_quality(quality: u8) -> Result<(), CodecError> {
    if !(1..=100).contains(&quality) {
        return Err(CodecError::InvalidQuality(quality));
    }
    Ok(())
}

/// Baseline JPEG key images via the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegCodec;

impl KeyImageCodec for JpegCodec {
    fn compress(&self, grid: &BlockGrid, quality: u8) -> Result<Vec<u8>, CodecError> {
        check_quality(quality)?;

        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, quality)
            .encode(
                grid.as_bytes(),
                grid.width(),
                grid.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| CodecError::Encode(e.to_string()))?;

        tracing::trace!(
            grid_w = grid.width(),
            grid_h = grid.height(),
            quality,
            bytes = out.len(),
            "Compressed key image"
        );
        Ok(out)
    }

    fn decompress(&self, bytes: &[u8]) -> Result<BlockGrid, CodecError> {
        let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
            .map_err(|e| CodecError::Decode(e.to_string()))?;

        let color = decoded.color();
        if color != ColorType::Rgb8 {
            return Err(CodecError::ChannelCount {
                found: color.channel_count(),
            });
        }

        let rgb = decoded.into_rgb8();
        let (width, height) = rgb.dimensions();
        BlockGrid::from_raw(width, height, rgb.into_raw())
            .ok_or_else(|| CodecError::Decode("decoded buffer size mismatch".into()))
    }
}

/// Lossless key images: `width:u32 LE`, `height:u32 LE`, then packed RGB.
///
/// Ignores quality beyond range checking. Useful wherever exact block
/// colors must survive the round trip, such as reference tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl KeyImageCodec for RawCodec {
    fn compress(&self, grid: &BlockGrid, quality: u8) -> Result<Vec<u8>, CodecError> {
        check_quality(quality)?;

        let mut out = Vec::with_capacity(8 + grid.as_bytes().len());
        out.extend_from_slice(&grid.width().to_le_bytes());
        out.extend_from_slice(&grid.height().to_le_bytes());
        out.extend_from_slice(grid.as_bytes());
        Ok(out)
    }

    fn decompress(&self, bytes: &[u8]) -> Result<BlockGrid, CodecError> {
        if bytes.len() < 8 {
            return Err(CodecError::Decode("raw key image header truncated".into()));
        }
        let width = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let height = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let body = &bytes[8..];

        let cells = (width as usize) * (height as usize);
        if body.len() != cells * BYTES_PER_PIXEL {
            if cells != 0 && body.len() % cells == 0 {
                return Err(CodecError::ChannelCount {
                    found: (body.len() / cells).min(u8::MAX as usize) as u8,
                });
            }
            return Err(CodecError::Decode(format!(
                "raw key image has {} bytes for {}x{} cells",
                body.len(),
                width,
                height
            )));
        }

        BlockGrid::from_raw(width, height, body.to_vec())
            .ok_or_else(|| CodecError::Decode("raw key image size mismatch".into()))
    }
}
