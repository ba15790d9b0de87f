//! Reconstruction quality measures.

use crate::source::Frame;

/// Mean squared error over all channel samples.
///
/// Returns `None` if the frames differ in size.
pub fn mse(a: &Frame, b: &Frame) -> Option<f64> {
    if a.width() != b.width() || a.height() != b.height() || a.pixels().len() != b.pixels().len() {
        return None;
    }
    if a.pixels().is_empty() {
        return Some(0.0);
    }

    let sum: u64 = a
        .pixels()
        .iter()
        .zip(b.pixels())
        .map(|(&x, &y)| {
            let d = x.abs_diff(y) as u64;
            d * d
        })
        .sum();

    Some(sum as f64 / a.pixels().len() as f64)
}

/// Peak signal-to-noise ratio in dB (8-bit peak).
///
/// Identical frames yield `f64::INFINITY`.
pub fn psnr(a: &Frame, b: &Frame) -> Option<f64> {
    let mse = mse(a, b)?;
    if mse == 0.0 {
        return Some(f64::INFINITY);
    }
    Some(10.0 * (255.0f64 * 255.0 / mse).log10())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_frames() {
        let a = Frame::filled(4, 4, [10, 20, 30], 0);
        assert_eq!(mse(&a, &a), Some(0.0));
        assert_eq!(psnr(&a, &a), Some(f64::INFINITY));
    }

    #[test]
    fn test_known_error() {
        let a = Frame::filled(2, 2, [0, 0, 0], 0);
        let b = Frame::filled(2, 2, [16, 16, 16], 0);

        assert_eq!(mse(&a, &b), Some(256.0));
        let p = psnr(&a, &b).unwrap();
        assert!((p - 24.05).abs() < 0.01, "psnr {}", p);
    }

    #[test]
    fn test_size_mismatch() {
        let a = Frame::filled(2, 2, [0, 0, 0], 0);
        let b = Frame::filled(4, 1, [0, 0, 0], 0);
        assert!(mse(&a, &b).is_none());
    }
}
