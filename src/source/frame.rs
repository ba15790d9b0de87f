//! Frame type representing one RGB24 raster of the video stream.

/// Bytes per RGB24 pixel.
pub const BYTES_PER_PIXEL: usize = 3;

/// A single RGB24 frame.
///
/// Pixels are stored row-major, 3 bytes per pixel, with no row padding.
/// Frames are consumed by one encode or decode step and then dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw RGB24 pixel data.
    pixels: Vec<u8>,
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
    /// Zero-based position in the stream.
    sequence: u64,
}

impl Frame {
    /// Wraps a packed RGB24 buffer. Use [`Frame::is_valid`] to check its length.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self {
            pixels,
            width,
            height,
            sequence,
        }
    }

    /// Creates a frame filled with a single color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], sequence: u64) -> Self {
        let count = (width as usize) * (height as usize);
        let pixels = rgb.iter().copied().cycle().take(count * BYTES_PER_PIXEL).collect();
        Self::new(pixels, width, height, sequence)
    }

    /// Packed RGB24 bytes.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Consumes the frame and returns its pixel buffer.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Zero-based position in the stream.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Returns the expected buffer length for the frame dimensions.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.pixel_count() * BYTES_PER_PIXEL
    }

    /// True if the buffer holds exactly `width * height` RGB triples.
    pub fn is_valid(&self) -> bool {
        self.pixels.len() == self.byte_len()
    }

    /// Returns the RGB triple at `(x, y)`.
    #[inline]
    pub fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        let i = ((y as usize) * (self.width as usize) + x as usize) * BYTES_PER_PIXEL;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
    }
}

/// Luminance of an RGB triple: truncated mean of the three channels.
#[inline]
pub fn luminance(rgb: [u8; 3]) -> u16 {
    (rgb[0] as u16 + rgb[1] as u16 + rgb[2] as u16) / 3
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}
