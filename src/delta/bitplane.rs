//! One delta bit per pixel for a single frame.

/// The per-pixel delta bits of one frame, in row-major order.
///
/// Produced fresh every frame and consumed immediately by the RLE packer
/// (encode) or the reconstruction step (decode).
#[derive(Clone, PartialEq, Eq)]
pub struct BitPlane {
    bits: Vec<bool>,
}

impl BitPlane {
    /// Creates a plane from row-major bits.
    pub fn from_bits(bits: Vec<bool>) -> Self {
        Self { bits }
    }

    /// Creates a plane of `len` zero bits.
    pub fn zeroed(len: usize) -> Self {
        Self {
            bits: vec![false; len],
        }
    }

    /// Returns the bits.
    #[inline]
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    #[inline]
    pub fn get(&self, index: usize) -> bool {
        self.bits[index]
    }

    /// Returns the number of bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Returns true if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Counts the number of set bits.
    pub fn popcount(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Fraction of set bits, in `[0, 1]`.
    pub fn ones_ratio(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.popcount() as f64 / self.len() as f64
    }

    /// Number of value changes between neighbouring bits, plus one.
    pub fn transitions(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        1 + self.bits.windows(2).filter(|w| w[0] != w[1]).count()
    }
}

impl std::fmt::Debug for BitPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitPlane")
            .field("bits", &self.bits.len())
            .field("ones_ratio", &format!("{:.4}", self.ones_ratio()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alternating_ratio() {
        let bits = (0..100).map(|i| i % 2 == 0).collect();
        let plane = BitPlane::from_bits(bits);

        assert!((plane.ones_ratio() - 0.5).abs() < 0.001);
        assert_eq!(plane.transitions(), 100);
    }

    #[test]
    fn test_all_zeros() {
        let plane = BitPlane::zeroed(64);
        assert_eq!(plane.popcount(), 0);
        assert_eq!(plane.ones_ratio(), 0.0);
        assert_eq!(plane.transitions(), 1);
    }

    #[test]
    fn test_empty_plane() {
        let plane = BitPlane::from_bits(Vec::new());
        assert!(plane.is_empty());
        assert_eq!(plane.ones_ratio(), 0.0);
        assert_eq!(plane.transitions(), 0);
    }
}
