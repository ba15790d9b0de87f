//! Greedy run-length coding of delta bit planes.
//!
//! Each byte is one run: the high bit is the bit value, the low seven
//! bits the run length (1-127). Longer runs are split.

use crate::delta::BitPlane;
use thiserror::Error;

/// Longest run a single byte can describe.
pub const MAX_RUN: u8 = 0x7F;

const FLAG_MASK: u8 = 0x80;

/// Errors raised while expanding RLE bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RleError {
    #[error("zero-length run at byte {offset}")]
    ZeroLengthRun { offset: usize },
    #[error("run at byte {offset} overruns the plane: {decoded} of {expected} bits already decoded")]
    Overrun {
        offset: usize,
        decoded: usize,
        expected: usize,
    },
    #[error("runs end after {decoded} of {expected} bits")]
    Underrun { decoded: usize, expected: usize },
}

/// A single run of identical bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub bit: bool,
    /// Always within `1..=MAX_RUN`.
    pub len: u8,
}

impl Run {
    /// Packs the run into its wire byte.
    #[inline]
    pub fn to_byte(self) -> u8 {
        if self.bit {
            FLAG_MASK | self.len
        } else {
            self.len
        }
    }

    /// Unpacks a wire byte.
    #[inline]
    pub fn from_byte(byte: u8) -> Self {
        Self {
            bit: byte & FLAG_MASK != 0,
            len: byte & MAX_RUN,
        }
    }
}

/// Splits bits into maximal runs of at most [`MAX_RUN`].
pub fn runs(bits: &[bool]) -> Vec<Run> {
    let mut out = Vec::new();
    let mut iter = bits.iter().copied();
    let Some(mut current) = iter.next() else {
        return out;
    };
    let mut len: u8 = 1;

    for bit in iter {
        if bit == current && len < MAX_RUN {
            len += 1;
        } else {
            out.push(Run { bit: current, len });
            current = bit;
            len = 1;
        }
    }

    // Flush the trailing run
    out.push(Run { bit: current, len });
    out
}

/// Run-length codec for [`BitPlane`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RlePacker;

impl RlePacker {
    /// Encodes a plane as run bytes in row-major pixel order.
    pub fn pack(plane: &BitPlane) -> Vec<u8> {
        runs(plane.bits()).into_iter().map(Run::to_byte).collect()
    }

    /// Expands run bytes into exactly `pixel_count` bits.
    ///
    /// Every byte of `bytes` must be consumed and must land inside the
    /// plane; anything else is a malformed stream.
    pub fn unpack(bytes: &[u8], pixel_count: usize) -> Result<BitPlane, RleError> {
        let mut bits = Vec::with_capacity(pixel_count);

        for (offset, &byte) in bytes.iter().enumerate() {
            let run = Run::from_byte(byte);
            if run.len == 0 {
                return Err(RleError::ZeroLengthRun { offset });
            }
            if bits.len() + run.len as usize > pixel_count {
                return Err(RleError::Overrun {
                    offset,
                    decoded: bits.len(),
                    expected: pixel_count,
                });
            }
            bits.extend(std::iter::repeat(run.bit).take(run.len as usize));
        }

        if bits.len() < pixel_count {
            return Err(RleError::Underrun {
                decoded: bits.len(),
                expected: pixel_count,
            });
        }

        Ok(BitPlane::from_bits(bits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn round_trip(bits: Vec<bool>) {
        let plane = BitPlane::from_bits(bits);
        let packed = RlePacker::pack(&plane);
        let unpacked = RlePacker::unpack(&packed, plane.len()).unwrap();
        assert_eq!(unpacked, plane);
    }

    #[test]
    fn test_all_zero_and_all_one() {
        round_trip(vec![false; 128]);
        round_trip(vec![true; 128]);
    }

    #[test]
    fn test_alternating() {
        let bits: Vec<bool> = (0..128).map(|i| i % 2 == 1).collect();
        let packed = RlePacker::pack(&BitPlane::from_bits(bits.clone()));

        assert_eq!(packed.len(), 128);
        assert_eq!(packed[0], 0x01);
        assert_eq!(packed[1], 0x81);
        round_trip(bits);
    }

    #[test]
    fn test_long_run_is_split() {
        let packed = RlePacker::pack(&BitPlane::from_bits(vec![true; 300]));
        assert_eq!(packed, vec![0xFF, 0xFF, 0x80 | 46]);
    }

    #[test]
    fn test_trailing_run_is_flushed() {
        let packed = RlePacker::pack(&BitPlane::from_bits(vec![false, false, true]));
        assert_eq!(packed, vec![0x02, 0x81]);
    }

    #[test]
    fn test_empty_plane() {
        assert!(RlePacker::pack(&BitPlane::from_bits(Vec::new())).is_empty());
        assert!(RlePacker::unpack(&[], 0).unwrap().is_empty());
    }

    #[test]
    fn test_unpack_underrun() {
        assert_eq!(
            RlePacker::unpack(&[0x05], 8),
            Err(RleError::Underrun { decoded: 5, expected: 8 })
        );
    }

    #[test]
    fn test_unpack_overrun() {
        assert_eq!(
            RlePacker::unpack(&[0x05, 0x84], 8),
            Err(RleError::Overrun { offset: 1, decoded: 5, expected: 8 })
        );
    }

    #[test]
    fn test_unpack_zero_length() {
        assert_eq!(
            RlePacker::unpack(&[0x80], 8),
            Err(RleError::ZeroLengthRun { offset: 0 })
        );
    }

    proptest! {
        #[test]
        fn prop_round_trip(bits in proptest::collection::vec(any::<bool>(), 0..2048)) {
            let plane = BitPlane::from_bits(bits);
            let packed = RlePacker::pack(&plane);
            prop_assert_eq!(RlePacker::unpack(&packed, plane.len()).unwrap(), plane);
        }

        #[test]
        fn prop_long_runs_round_trip(
            segments in proptest::collection::vec((any::<bool>(), 1usize..400), 1..12)
        ) {
            let bits: Vec<bool> = segments
                .iter()
                .flat_map(|&(bit, len)| std::iter::repeat(bit).take(len))
                .collect();
            let plane = BitPlane::from_bits(bits);
            let packed = RlePacker::pack(&plane);

            prop_assert!(packed.iter().all(|&b| b & MAX_RUN != 0));
            prop_assert_eq!(RlePacker::unpack(&packed, plane.len()).unwrap(), plane);
        }
    }
}
