//! Encoder session: frames in, container out.

use crate::analysis::{psnr, FrameStats, SessionStats};
use crate::container::{ContainerWriter, Header};
use crate::delta::{AccumulatorBank, DeltaEncoder};
use crate::error::Result;
use crate::keyframe::{BlockAverager, KeyImageCodec};
use crate::rle::RlePacker;
use crate::source::{EncoderConfig, Frame, FrameSource, FrameSourceError};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

/// Encodes an ordered frame stream into a container.
///
/// The session owns the accumulator bank for its whole lifetime. Frames
/// must arrive in stream order; each one mutates the bank the next
/// depends on.
pub struct EncodeSession<W: Write, C: KeyImageCodec> {
    config: EncoderConfig,
    codec: C,
    averager: BlockAverager,
    delta: DeltaEncoder,
    bank: AccumulatorBank,
    writer: ContainerWriter<W>,
    stats: SessionStats,
}

impl<W: Write, C: KeyImageCodec> EncodeSession<W, C> {
    /// Validates `config` and writes the container header to `output`.
    pub fn new(config: EncoderConfig, codec: C, output: W) -> Result<Self> {
        config.validate()?;

        let averager = BlockAverager::new(config.block_size)?;
        let header = Header::new(config.width, config.height, config.fps);
        let writer = ContainerWriter::new(output, header)?;

        tracing::info!(
            width = config.width,
            height = config.height,
            fps = config.fps,
            block_size = config.block_size,
            quality = config.quality,
            "Encode session started"
        );

        Ok(Self {
            averager,
            delta: DeltaEncoder::new(config.block_size),
            bank: AccumulatorBank::new(config.width, config.height),
            writer,
            stats: SessionStats::new(config.width, config.height),
            codec,
            config,
        })
    }

    /// Returns the session configuration.
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Returns the encoder-side accumulator state.
    pub fn accumulator(&self) -> &AccumulatorBank {
        &self.bank
    }

    /// Returns running statistics.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Encodes one frame and appends its chunk to the container.
    pub fn encode_frame(&mut self, frame: &Frame) -> Result<FrameStats> {
        if frame.width() != self.config.width || frame.height() != self.config.height {
            return Err(FrameSourceError::UnexpectedDimensions {
                expected: (self.config.width, self.config.height),
                got: (frame.width(), frame.height()),
            }
            .into());
        }
        if !frame.is_valid() {
            return Err(FrameSourceError::ShortRead {
                got: frame.pixels().len(),
                expected: frame.byte_len(),
            }
            .into());
        }

        let grid = self.averager.average(frame)?;
        let key_image = self.codec.compress(&grid, self.config.quality)?;

        // Bias against what the decoder will see, not the original grid
        let decoded = self.codec.decompress(&key_image)?;
        let plane = self.delta.encode(frame, &decoded, &mut self.bank)?;
        let rle = RlePacker::pack(&plane);

        self.writer.write_video_chunk(&key_image, &rle)?;

        let preview = self.delta.render(&decoded, &self.bank, frame.sequence());
        let stats = FrameStats {
            sequence: self.stats.frames,
            key_bytes: key_image.len(),
            rle_bytes: rle.len(),
            ones_ratio: plane.ones_ratio(),
            accumulator_mean: self.bank.mean(),
            psnr: psnr(frame, &preview),
        };
        self.stats.record(&stats);

        tracing::debug!(
            frame = stats.sequence,
            key_bytes = stats.key_bytes,
            rle_bytes = stats.rle_bytes,
            ones_ratio = stats.ones_ratio,
            psnr = stats.psnr,
            "Encoded frame"
        );

        Ok(stats)
    }

    /// Encodes frames from `source` until it is exhausted, `stop` is set,
    /// or `max_frames` (if non-zero) frames have been encoded. `on_frame`
    /// sees each frame's statistics and the running totals.
    ///
    /// Returns the number of frames encoded by this call. On error the
    /// container is left without an end marker.
    pub fn run<S, F>(
        &mut self,
        source: &mut S,
        stop: &AtomicBool,
        max_frames: u64,
        mut on_frame: F,
    ) -> Result<u64>
    where
        S: FrameSource + ?Sized,
        F: FnMut(&FrameStats, &SessionStats),
    {
        let mut encoded = 0;

        while max_frames == 0 || encoded < max_frames {
            if stop.load(Ordering::Relaxed) {
                tracing::info!(frames = encoded, "Stop requested");
                break;
            }
            let Some(frame) = source.next_frame()? else {
                break;
            };
            let stats = self.encode_frame(&frame)?;
            on_frame(&stats, &self.stats);
            encoded += 1;
        }

        Ok(encoded)
    }

    /// Writes the end marker and returns the output and final statistics.
    pub fn finish(self) -> Result<(W, SessionStats)> {
        let mut stats = self.stats;
        let output = self.writer.finish()?;
        stats.finish(true);

        tracing::info!(
            frames = stats.frames,
            payload_bytes = stats.payload_bytes(),
            ratio = stats.compression_ratio(),
            "Encode session finished"
        );
        Ok((output, stats))
    }

    /// Abandons the session without an end marker.
    ///
    /// The output is left truncated so readers reject it.
    pub fn abort(self) -> (W, SessionStats) {
        let mut stats = self.stats;
        stats.finish(false);

        tracing::warn!(frames = stats.frames, "Encode session aborted; output is incomplete");
        (self.writer.into_inner(), stats)
    }
}
