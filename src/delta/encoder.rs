//! Closed-loop 1-bit luminance delta coding.
//!
//! For each pixel the key image's block luminance is biased upward by
//! the pixel's accumulator (`acc << 4`). The delta bit says whether the
//! true luminance is brighter than that estimate, and the accumulator
//! then moves one step toward the truth. Over successive frames each
//! accumulator converges on how much brighter the pixel is than its block.
//!
//! Every pixel touches only its own counter, and reads it before bumping,
//! so a frame sees the accumulator values as they stood at frame start.

use super::accumulator::AccumulatorBank;
use super::bitplane::BitPlane;
use crate::keyframe::BlockGrid;
use crate::source::{luminance, Frame, BYTES_PER_PIXEL};
use thiserror::Error;

/// Errors raised when frame, grid, plane and bank do not line up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeltaError {
    #[error("block grid {grid_w}x{grid_h} does not cover {width}x{height} with block size {block_size}")]
    GridMismatch {
        grid_w: u32,
        grid_h: u32,
        width: u32,
        height: u32,
        block_size: u32,
    },
    #[error("expected {expected} pixels, got {got}")]
    PixelCountMismatch { expected: usize, got: usize },
}

/// Key-image luminance raised by the accumulator's trend estimate.
#[inline]
pub fn biased_luminance(block_lum: u16, acc: u8) -> u16 {
    block_lum + ((acc as u16) << 4)
}

/// The delta decision: is the pixel brighter than the biased estimate?
#[inline]
pub fn delta_bit(block_lum: u16, acc: u8, true_lum: u16) -> bool {
    biased_luminance(block_lum, acc) < true_lum
}

/// Output channel value for a block channel and post-update accumulator.
#[inline]
pub fn reconstruct_channel(block_channel: u8, acc: u8) -> u8 {
    (block_channel as u16 + ((acc as u16) << 4)).min(255) as u8
}

/// Per-pixel delta encoder and its decoder-side mirror.
#[derive(Debug, Clone, Copy)]
pub struct DeltaEncoder {
    block_size: u32,
}

impl DeltaEncoder {
    pub fn new(block_size: u32) -> Self {
        Self { block_size }
    }

    #[inline]
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    fn check(
        &self,
        width: u32,
        height: u32,
        grid: &BlockGrid,
        bank: &AccumulatorBank,
    ) -> Result<(), DeltaError> {
        if grid.width() * self.block_size != width || grid.height() * self.block_size != height {
            return Err(DeltaError::GridMismatch {
                grid_w: grid.width(),
                grid_h: grid.height(),
                width,
                height,
                block_size: self.block_size,
            });
        }
        if bank.width() != width || bank.height() != height {
            return Err(DeltaError::PixelCountMismatch {
                expected: (width as usize) * (height as usize),
                got: (bank.width() as usize) * (bank.height() as usize),
            });
        }
        Ok(())
    }

    /// Computes the delta bits of `frame` against the reconstructed key
    /// image `grid`, updating `bank` once per pixel.
    pub fn encode(
        &self,
        frame: &Frame,
        grid: &BlockGrid,
        bank: &mut AccumulatorBank,
    ) -> Result<BitPlane, DeltaError> {
        self.check(frame.width(), frame.height(), grid, bank)?;

        let block_lums = block_luminances(grid);
        let width = frame.width();
        let mut bits = Vec::with_capacity(frame.pixel_count());

        for (i, px) in frame.pixels().chunks_exact(BYTES_PER_PIXEL).enumerate() {
            let x = (i % width as usize) as u32;
            let y = (i / width as usize) as u32;
            let cell = (y / self.block_size) * grid.width() + x / self.block_size;

            let acc = bank.read_at(i);
            let bit = delta_bit(block_lums[cell as usize], acc, luminance([px[0], px[1], px[2]]));
            bank.bump_at(i, bit);
            bits.push(bit);
        }

        Ok(BitPlane::from_bits(bits))
    }

    /// Rebuilds a frame from the decoded key image and delta bits,
    /// applying the same accumulator updates as [`DeltaEncoder::encode`].
    pub fn reconstruct(
        &self,
        grid: &BlockGrid,
        plane: &BitPlane,
        bank: &mut AccumulatorBank,
        sequence: u64,
    ) -> Result<Frame, DeltaError> {
        let width = grid.width() * self.block_size;
        let height = grid.height() * self.block_size;
        self.check(width, height, grid, bank)?;

        let pixel_count = (width as usize) * (height as usize);
        if plane.len() != pixel_count {
            return Err(DeltaError::PixelCountMismatch {
                expected: pixel_count,
                got: plane.len(),
            });
        }

        for (i, &bit) in plane.bits().iter().enumerate() {
            bank.bump_at(i, bit);
        }

        Ok(self.render(grid, bank, sequence))
    }

    /// Renders the frame a decoder shows for `grid` and the current
    /// accumulator values, without changing them.
    ///
    /// The caller guarantees `bank` matches the grid's pixel dimensions.
    pub fn render(&self, grid: &BlockGrid, bank: &AccumulatorBank, sequence: u64) -> Frame {
        let width = grid.width() * self.block_size;
        let height = grid.height() * self.block_size;
        let mut pixels = Vec::with_capacity((width as usize) * (height as usize) * BYTES_PER_PIXEL);

        for (i, &acc) in bank.values().iter().enumerate() {
            let x = (i % width as usize) as u32;
            let y = (i / width as usize) as u32;
            let rgb = grid.cell(x / self.block_size, y / self.block_size);
            pixels.extend(rgb.iter().map(|&c| reconstruct_channel(c, acc)));
        }

        Frame::new(pixels, width, height, sequence)
    }
}

fn block_luminances(grid: &BlockGrid) -> Vec<u16> {
    grid.cells().map(luminance).collect()
}
