//! Crate-wide error type.
//!
//! Every error is fatal for the session: frames depend on the
//! accumulator state left by their predecessors, so nothing is retried
//! or skipped.

use crate::container::FormatError;
use crate::delta::DeltaError;
use crate::keyframe::CodecError;
use crate::source::{ConfigError, FrameSourceError};
use thiserror::Error;

/// Errors surfaced by encode and decode sessions.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("frame source error: {0}")]
    FrameSource(#[from] FrameSourceError),

    #[error("key image codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("delta coding error: {0}")]
    Delta(#[from] DeltaError),

    #[error("format error after {frames_decoded} decoded frames: {source}")]
    Format {
        /// Frames fully reconstructed before the error.
        frames_decoded: u64,
        #[source]
        source: FormatError,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the underlying format error, if this is one.
    pub fn as_format(&self) -> Option<&FormatError> {
        match self {
            Error::Format { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result alias using the crate error.
pub type Result<T> = std::result::Result<T, Error>;
