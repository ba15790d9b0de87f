//! Per-pixel saturating trend counters.

/// Number of bits in each accumulator.
pub const ACCUMULATOR_BITS: u32 = 4;

/// Largest value an accumulator can hold.
pub const ACCUMULATOR_MAX: u8 = (1 << ACCUMULATOR_BITS) - 1;

/// One 4-bit saturating counter per output pixel.
///
/// Counters start at zero, live for the whole session, and are never
/// reset mid-stream. Encoder and decoder each own a bank and must apply
/// the same bumps in the same order to stay in sync.
#[derive(Clone, PartialEq, Eq)]
pub struct AccumulatorBank {
    width: u32,
    height: u32,
    counters: Vec<u8>,
}

impl AccumulatorBank {
    /// Creates a zeroed bank for a `width`x`height` frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            counters: vec![0; (width as usize) * (height as usize)],
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

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + x as usize
    }

    /// Returns the counter for pixel `(x, y)`, in `0..=15`.
    #[inline]
    pub fn read(&self, x: u32, y: u32) -> u8 {
        self.counters[self.index(x, y)]
    }

    /// Increments (if `increase`) or decrements the counter for `(x, y)`,
    /// saturating at the range bounds.
    #[inline]
    pub fn bump(&mut self, x: u32, y: u32, increase: bool) {
        let i = self.index(x, y);
        self.bump_at(i, increase);
    }

    /// Reads the counter at a row-major pixel index.
    #[inline]
    pub fn read_at(&self, index: usize) -> u8 {
        self.counters[index]
    }

    /// Bumps the counter at a row-major pixel index.
    #[inline]
    pub fn bump_at(&mut self, index: usize, increase: bool) {
        let c = &mut self.counters[index];
        *c = if increase {
            (*c + 1).min(ACCUMULATOR_MAX)
        } else {
            c.saturating_sub(1)
        };
    }

    /// Returns all counters in row-major order.
    pub fn values(&self) -> &[u8] {
        &self.counters
    }

    /// Returns the mean counter value.
    pub fn mean(&self) -> f64 {
        if self.counters.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.counters.iter().map(|&c| c as u64).sum();
        sum as f64 / self.counters.len() as f64
    }
}

impl std::fmt::Debug for AccumulatorBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccumulatorBank")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("mean", &format!("{:.3}", self.mean()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_starts_at_zero() {
        let bank = AccumulatorBank::new(4, 4);
        assert!(bank.values().iter().all(|&c| c == 0));
        assert_eq!(bank.mean(), 0.0);
    }

    #[test]
    fn test_saturates_high() {
        let mut bank = AccumulatorBank::new(1, 1);
        for _ in 0..20 {
            bank.bump(0, 0, true);
        }
        assert_eq!(bank.read(0, 0), ACCUMULATOR_MAX);
    }

    #[test]
    fn test_saturates_low() {
        let mut bank = AccumulatorBank::new(1, 1);
        bank.bump(0, 0, false);
        assert_eq!(bank.read(0, 0), 0);
    }

    #[test]
    fn test_pixels_are_independent() {
        let mut bank = AccumulatorBank::new(3, 2);
        bank.bump(2, 1, true);
        bank.bump(2, 1, true);

        assert_eq!(bank.read(2, 1), 2);
        assert_eq!(bank.read_at(5), 2);
        assert_eq!(bank.values().iter().filter(|&&c| c != 0).count(), 1);
    }

    proptest! {
        #[test]
        fn prop_stays_in_range(bumps in proptest::collection::vec(any::<bool>(), 0..200)) {
            let mut bank = AccumulatorBank::new(1, 1);
            for up in bumps {
                bank.bump(0, 0, up);
                prop_assert!(bank.read(0, 0) <= ACCUMULATOR_MAX);
            }
        }

        #[test]
        fn prop_sixteen_bumps_reach_bound(start in 0u8..=15, up in any::<bool>()) {
            let mut bank = AccumulatorBank::new(1, 1);
            for _ in 0..start {
                bank.bump(0, 0, true);
            }
            prop_assert_eq!(bank.read(0, 0), start);

            for _ in 0..16 {
                bank.bump(0, 0, up);
            }
            let expected = if up { ACCUMULATOR_MAX } else { 0 };
            prop_assert_eq!(bank.read(0, 0), expected);
        }
    }
}
