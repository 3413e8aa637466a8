//! Error types for the logo-cleanup crate.

use std::time::Duration;

/// Errors that can occur while cleaning a logo image.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The image has a zero dimension and cannot be analysed.
    #[error("degenerate input image ({width}x{height})")]
    DegenerateInput {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred during image processing (load, save, encode).
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the external text detector.
///
/// These never escape [`CleanupEngine::clean`](crate::CleanupEngine::clean):
/// the engine logs them and carries on without text hints.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DetectorError {
    /// The detector did not answer within the configured timeout.
    #[error("text detection timed out after {0:?}")]
    Timeout(Duration),

    /// The detector backend is not initialised or was shut down.
    #[error("text detector unavailable: {0}")]
    Unavailable(String),

    /// The detector backend reported an error.
    #[error("text detection failed: {0}")]
    Failed(String),

    /// The worker thread running the detector went away without answering.
    #[error("text detection worker terminated without a result")]
    WorkerLost,
}
