//! Block averaging of RGB24 frames into a coarse color grid.

use crate::source::{ConfigError, Frame, BYTES_PER_PIXEL};

/// Grid of per-block average colors.
///
/// Stored as packed RGB triples, row-major, one triple per block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockGrid {
    /// Grid width in blocks.
    width: u32,
    /// Grid height in blocks.
    height: u32,
    /// Packed RGB data, `width * height * 3` bytes.
    data: Vec<u8>,
}

impl BlockGrid {
    /// Wraps packed RGB data. Returns `None` if the length does not match.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        let expected = (width as usize) * (height as usize) * BYTES_PER_PIXEL;
        (data.len() == expected).then_some(Self {
            width,
            height,
            data,
        })
    }

    /// Creates a grid with every cell set to `rgb`.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let count = (width as usize) * (height as usize);
        let data = rgb.iter().copied().cycle().take(count * BYTES_PER_PIXEL).collect();
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the packed RGB bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the color of cell `(bx, by)`.
    #[inline]
    pub fn cell(&self, bx: u32, by: u32) -> [u8; 3] {
        let i = ((by as usize) * (self.width as usize) + bx as usize) * BYTES_PER_PIXEL;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Iterates cell colors in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.data
            .chunks_exact(BYTES_PER_PIXEL)
            .map(|c| [c[0], c[1], c[2]])
    }
}

/// Reduces frames to a [`BlockGrid`] of average colors.
///
/// Each channel of a block is the truncated integer mean of its
/// `block_size²` samples.
#[derive(Debug, Clone, Copy)]
pub struct BlockAverager {
    block_size: u32,
}

impl BlockAverager {
    /// Creates an averager. The block size must be within 1-255 so a
    /// block's channel sum (at most `255³`) fits the accumulator.
    pub fn new(block_size: u32) -> Result<Self, ConfigError> {
        if block_size == 0 || block_size > 255 {
            return Err(ConfigError::InvalidBlockSize(block_size));
        }
        Ok(Self { block_size })
    }

    #[inline]
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Averages `frame` into a block grid.
    pub fn average(&self, frame: &Frame) -> Result<BlockGrid, ConfigError> {
        let bs = self.block_size;
        if frame.width() == 0
            || frame.height() == 0
            || frame.width() % bs != 0
            || frame.height() % bs != 0
        {
            return Err(ConfigError::InvalidDimensions {
                width: frame.width(),
                height: frame.height(),
                block_size: bs,
            });
        }

        let grid_w = frame.width() / bs;
        let grid_h = frame.height() / bs;
        let samples = bs * bs;
        let stride = frame.width() as usize * BYTES_PER_PIXEL;
        let pixels = frame.pixels();
        let mut data = Vec::with_capacity((grid_w * grid_h) as usize * BYTES_PER_PIXEL);

        for by in 0..grid_h {
            for bx in 0..grid_w {
                let mut sum = [0u32; 3];
                for y in by * bs..(by + 1) * bs {
                    let row = y as usize * stride;
                    let start = row + (bx * bs) as usize * BYTES_PER_PIXEL;
                    let end = start + bs as usize * BYTES_PER_PIXEL;
                    for px in pixels[start..end].chunks_exact(BYTES_PER_PIXEL) {
                        sum[0] += px[0] as u32;
                        sum[1] += px[1] as u32;
                        sum[2] += px[2] as u32;
                    }
                }
                data.extend(sum.iter().map(|&s| (s / samples) as u8));
            }
        }

        tracing::trace!(grid_w, grid_h, block_size = bs, "Averaged frame into blocks");

        Ok(BlockGrid {
            width: grid_w,
            height: grid_h,
            data,
        })
    }
}

impl Default for BlockAverager {
    fn default() -> Self {
        Self {
            block_size: crate::source::DEFAULT_BLOCK_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_frame_averages_exactly() {
        let averager = BlockAverager::new(8).unwrap();
        for color in [[0, 0, 0], [255, 255, 255], [13, 200, 77]] {
            let frame = Frame::filled(32, 16, color, 0);
            let grid = averager.average(&frame).unwrap();

            assert_eq!(grid.width(), 4);
            assert_eq!(grid.height(), 2);
            assert!(grid.cells().all(|c| c == color));
        }
    }

    #[test]
    fn test_average_truncates() {
        // 2x2 block with red channel 0,0,0,3 -> mean 0.75 -> 0
        let mut pixels = vec![0u8; 2 * 2 * 3];
        pixels[9] = 3;
        pixels[10] = 255;
        pixels[11] = 2;
        let frame = Frame::new(pixels, 2, 2, 0);

        let grid = BlockAverager::new(2).unwrap().average(&frame).unwrap();
        assert_eq!(grid.cell(0, 0), [0, 63, 0]);
    }

    #[test]
    fn test_blocks_are_independent() {
        // Left half black, right half white
        let mut pixels = Vec::new();
        for _y in 0..8 {
            for x in 0..16 {
                let v = if x < 8 { 0 } else { 255 };
                pixels.extend_from_slice(&[v, v, v]);
            }
        }
        let frame = Frame::new(pixels, 16, 8, 0);

        let grid = BlockAverager::default().average(&frame).unwrap();
        assert_eq!(grid.cell(0, 0), [0, 0, 0]);
        assert_eq!(grid.cell(1, 0), [255, 255, 255]);
    }

    #[test]
    fn test_max_block_size_does_not_overflow() {
        let frame = Frame::filled(255, 255, [255, 255, 255], 0);
        let grid = BlockAverager::new(255).unwrap().average(&frame).unwrap();
        assert_eq!(grid.cell(0, 0), [255, 255, 255]);
    }

    #[test]
    fn test_rejects_non_multiple_dimensions() {
        let frame = Frame::filled(12, 8, [0, 0, 0], 0);
        assert!(matches!(
            BlockAverager::new(8).unwrap().average(&frame),
            Err(ConfigError::InvalidDimensions { width: 12, .. })
        ));
    }

    #[test]
    fn test_rejects_invalid_block_size() {
        assert!(BlockAverager::new(0).is_err());
        assert!(BlockAverager::new(256).is_err());
    }

    #[test]
    fn test_grid_from_raw_checks_length() {
        assert!(BlockGrid::from_raw(2, 1, vec![0; 6]).is_some());
        assert!(BlockGrid::from_raw(2, 1, vec![0; 5]).is_none());
    }
}
