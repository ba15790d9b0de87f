//! Per-frame and per-session encoding statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistics for one encoded (or decoded) frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameStats {
    /// Zero-based frame index.
    pub sequence: u64,
    /// Compressed key image size.
    pub key_bytes: usize,
    /// Run-length coded delta size (one byte per run).
    pub rle_bytes: usize,
    /// Fraction of delta bits set.
    pub ones_ratio: f64,
    /// Mean accumulator value after the frame.
    pub accumulator_mean: f64,
    /// PSNR of the decoder-side reconstruction against the source, if known.
    pub psnr: Option<f64>,
}

impl FrameStats {
    /// Total payload bytes for the frame.
    pub fn payload_bytes(&self) -> usize {
        self.key_bytes + self.rle_bytes
    }
}

/// Running totals for a whole session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Session start time.
    pub started_at: DateTime<Utc>,
    /// Session end time, once finished or aborted.
    pub finished_at: Option<DateTime<Utc>>,
    /// True only if the container was closed with an end marker.
    pub complete: bool,
    /// Frames processed.
    pub frames: u64,
    /// Total key image bytes.
    pub key_bytes: u64,
    /// Total RLE bytes (equal to the number of runs).
    pub rle_bytes: u64,
    /// Total delta bits set.
    pub ones: u64,
    /// Mean PSNR over frames with a finite PSNR.
    pub mean_psnr: Option<f64>,
    /// Mean accumulator value after the last frame.
    pub accumulator_mean: f64,
    #[serde(skip)]
    psnr_sum: f64,
    #[serde(skip)]
    psnr_frames: u64,
}

impl SessionStats {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            started_at: Utc::now(),
            finished_at: None,
            complete: false,
            frames: 0,
            key_bytes: 0,
            rle_bytes: 0,
            ones: 0,
            mean_psnr: None,
            accumulator_mean: 0.0,
            psnr_sum: 0.0,
            psnr_frames: 0,
        }
    }

    /// Folds one frame into the totals.
    pub fn record(&mut self, frame: &FrameStats) {
        let pixels = (self.width as u64) * (self.height as u64);

        self.frames += 1;
        self.key_bytes += frame.key_bytes as u64;
        self.rle_bytes += frame.rle_bytes as u64;
        self.ones += (frame.ones_ratio * pixels as f64).round() as u64;
        self.accumulator_mean = frame.accumulator_mean;

        if let Some(p) = frame.psnr.filter(|p| p.is_finite()) {
            self.psnr_sum += p;
            self.psnr_frames += 1;
            self.mean_psnr = Some(self.psnr_sum / self.psnr_frames as f64);
        }
    }

    /// Stamps the end time.
    pub fn finish(&mut self, complete: bool) {
        self.finished_at = Some(Utc::now());
        self.complete = complete;
    }

    /// Size of the processed frames as raw RGB24.
    pub fn raw_bytes(&self) -> u64 {
        self.frames * (self.width as u64) * (self.height as u64) * 3
    }

    /// Payload bytes (key images plus RLE).
    pub fn payload_bytes(&self) -> u64 {
        self.key_bytes + self.rle_bytes
    }

    /// Raw size over payload size, or 0 before any payload.
    pub fn compression_ratio(&self) -> f64 {
        if self.payload_bytes() == 0 {
            return 0.0;
        }
        self.raw_bytes() as f64 / self.payload_bytes() as f64
    }

    /// Serializes the summary as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(sequence: u64, psnr: Option<f64>) -> FrameStats {
        FrameStats {
            sequence,
            key_bytes: 100,
            rle_bytes: 28,
            ones_ratio: 0.25,
            accumulator_mean: 1.5,
            psnr,
        }
    }

    #[test]
    fn test_record_accumulates() {
        let mut stats = SessionStats::new(16, 8);
        stats.record(&frame(0, Some(30.0)));
        stats.record(&frame(1, Some(40.0)));

        assert_eq!(stats.frames, 2);
        assert_eq!(stats.payload_bytes(), 256);
        assert_eq!(stats.ones, 64);
        assert_eq!(stats.mean_psnr, Some(35.0));
        assert_eq!(stats.raw_bytes(), 2 * 16 * 8 * 3);
        assert!((stats.compression_ratio() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_infinite_psnr_is_skipped() {
        let mut stats = SessionStats::new(8, 8);
        stats.record(&frame(0, Some(f64::INFINITY)));
        assert_eq!(stats.mean_psnr, None);
    }

    #[test]
    fn test_finish_and_serialize() {
        let mut stats = SessionStats::new(8, 8);
        stats.record(&frame(0, None));
        stats.finish(true);

        assert!(stats.complete);
        assert!(stats.finished_at.is_some());

        let text = stats.to_toml().unwrap();
        assert!(text.contains("frames = 1"));
        assert!(text.contains("complete = true"));
    }
}
