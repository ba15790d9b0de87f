//! Metrics collection and registry.

use crate::analysis::{FrameStats, SessionStats};
use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of session state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Frames encoded so far.
    pub frames: u64,
    /// Total key image bytes.
    pub key_bytes: u64,
    /// Total RLE bytes.
    pub rle_bytes: u64,
    /// Whether the container has been closed with an end marker.
    pub complete: bool,
    /// Raw-to-payload size ratio.
    pub compression_ratio: f64,
    /// Mean accumulator value after the latest frame.
    pub accumulator_mean: f64,
    /// Fraction of delta bits set in the latest frame.
    pub ones_ratio: Option<f64>,
    /// PSNR of the latest frame's reconstruction.
    pub psnr: Option<f64>,
}

/// Prometheus metrics registry for encoder sessions.
pub struct MetricsRegistry {
    registry: Registry,

    // Throughput metrics
    frames_total: IntCounter,
    key_bytes_total: IntCounter,
    rle_bytes_total: IntCounter,
    session_complete: IntGauge,

    // Stream shape metrics
    compression_ratio: Gauge,
    accumulator_mean: Gauge,
    ones_ratio: Gauge,
    psnr: Gauge,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all encoder metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let frames_total = IntCounter::new("akc_frames_encoded_total", "Total frames encoded")?;
        let key_bytes_total = IntCounter::new(
            "akc_key_image_bytes_total",
            "Total compressed key image bytes written",
        )?;
        let rle_bytes_total = IntCounter::new(
            "akc_rle_bytes_total",
            "Total run-length coded delta bytes written",
        )?;
        let session_complete = IntGauge::new(
            "akc_session_complete",
            "Whether the container was finalized (1=complete, 0=open or aborted)",
        )?;

        let compression_ratio = Gauge::new(
            "akc_compression_ratio",
            "Raw RGB24 bytes divided by payload bytes",
        )?;
        let accumulator_mean = Gauge::new(
            "akc_accumulator_mean",
            "Mean accumulator value after the latest frame",
        )?;
        let ones_ratio = Gauge::new(
            "akc_delta_ones_ratio",
            "Fraction of delta bits set in the latest frame",
        )?;
        let psnr = Gauge::new(
            "akc_reconstruction_psnr_db",
            "PSNR of the latest frame's decoder-side reconstruction",
        )?;

        registry.register(Box::new(frames_total.clone()))?;
        registry.register(Box::new(key_bytes_total.clone()))?;
        registry.register(Box::new(rle_bytes_total.clone()))?;
        registry.register(Box::new(session_complete.clone()))?;
        registry.register(Box::new(compression_ratio.clone()))?;
        registry.register(Box::new(accumulator_mean.clone()))?;
        registry.register(Box::new(ones_ratio.clone()))?;
        registry.register(Box::new(psnr.clone()))?;

        Ok(Self {
            registry,
            frames_total,
            key_bytes_total,
            rle_bytes_total,
            session_complete,
            compression_ratio,
            accumulator_mean,
            ones_ratio,
            psnr,
        })
    }

    /// Updates all metrics from a snapshot of session state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        // For counters, we need to increment by the difference
        advance(&self.frames_total, snapshot.frames);
        advance(&self.key_bytes_total, snapshot.key_bytes);
        advance(&self.rle_bytes_total, snapshot.rle_bytes);
        self.session_complete.set(if snapshot.complete { 1 } else { 0 });

        self.compression_ratio.set(snapshot.compression_ratio);
        self.accumulator_mean.set(snapshot.accumulator_mean);
        if let Some(ratio) = snapshot.ones_ratio {
            self.ones_ratio.set(ratio);
        }
        if let Some(p) = snapshot.psnr.filter(|p| p.is_finite()) {
            self.psnr.set(p);
        }
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

impl MetricsSnapshot {
    /// Creates a snapshot from session totals and the latest frame.
    pub fn from_stats(session: &SessionStats, latest: Option<&FrameStats>) -> Self {
        Self {
            frames: session.frames,
            key_bytes: session.key_bytes,
            rle_bytes: session.rle_bytes,
            complete: session.complete,
            compression_ratio: session.compression_ratio(),
            accumulator_mean: session.accumulator_mean,
            ones_ratio: latest.map(|f| f.ones_ratio),
            psnr: latest.and_then(|f| f.psnr),
        }
    }
}
