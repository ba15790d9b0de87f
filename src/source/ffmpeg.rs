//! Frame source backed by an external `ffmpeg` process.
//!
//! ffmpeg decodes and rescales the input to raw RGB24 on stdout,
//! which is read through [`RawFrameReader`].

use super::stream::{FrameSource, FrameSourceError, RawFrameReader};
use super::Frame;
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

/// Streams frames decoded by `ffmpeg`.
pub struct FfmpegSource {
    child: Child,
    reader: RawFrameReader<ChildStdout>,
    finished: bool,
}

impl FfmpegSource {
    /// Spawns ffmpeg for `input`, scaled to `width`x`height`.
    pub fn spawn(input: impl AsRef<Path>, width: u32, height: u32) -> Result<Self, FrameSourceError> {
        Self::spawn_with(Command::new("ffmpeg"), input, width, height)
    }

    /// Spawns using a caller-supplied command (for a non-default ffmpeg binary).
    pub fn spawn_with(
        mut command: Command,
        input: impl AsRef<Path>,
        width: u32,
        height: u32,
    ) -> Result<Self, FrameSourceError> {
        let scale = format!("scale={}:{}", width, height);
        command
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(input.as_ref())
            .args(["-vf", &scale, "-pix_fmt", "rgb24", "-f", "rawvideo", "-an", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        tracing::debug!(command = ?command, "Spawning frame decoder");

        let mut child = command
            .spawn()
            .map_err(|e| FrameSourceError::SpawnFailed(e.to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FrameSourceError::SpawnFailed("stdout not captured".into()))?;

        Ok(Self {
            child,
            reader: RawFrameReader::new(stdout, width, height),
            finished: false,
        })
    }

    fn wait(&mut self) -> Result<(), FrameSourceError> {
        self.finished = true;
        let status = self.child.wait()?;
        if !status.success() {
            return Err(FrameSourceError::DecoderFailed(status.to_string()));
        }
        tracing::debug!(frames = self.reader.frames_read(), "Frame decoder exited");
        Ok(())
    }
}

impl FrameSource for FfmpegSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameSourceError> {
        if self.finished {
            return Ok(None);
        }
        match self.reader.next_frame()? {
            Some(frame) => Ok(Some(frame)),
            None => {
                self.wait()?;
                Ok(None)
            }
        }
    }

    fn dimensions(&self) -> (u32, u32) {
        self.reader.dimensions()
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
