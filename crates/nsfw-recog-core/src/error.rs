//! Error taxonomy for model resolution and detection.
//!
//! Every variant is fatal for the operation that raised it. Nothing in this
//! crate retries or swallows these errors.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error from an external collaborator (HTTP client, inference runtime).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All errors raised by the model cache and the detection adapter.
#[derive(Error, Debug)]
pub enum Error {
    /// An explicitly supplied model path (or its sibling class file) is absent.
    #[error("file does not exist: {}", path.display())]
    MissingFile { path: PathBuf },

    /// The remote source answered with a non-success status.
    #[error("download of {url} failed with status {status}")]
    Download { url: String, status: u16 },

    /// The request never produced a usable response.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },

    /// A resolved artifact has zero length.
    #[error("{} is empty", path.display())]
    EmptyFile { path: PathBuf },

    /// A resolved artifact holds the "Not Found" error body instead of the payload.
    #[error(
        "{} was not downloaded correctly (found an error page instead of the payload); delete it and retry",
        path.display()
    )]
    CorruptDownload { path: PathBuf },

    /// A downloaded artifact does not match its configured SHA-256.
    #[error("checksum mismatch for {}: expected {expected}, got {actual}", path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// The engine emitted a class index the label set cannot name.
    #[error("class index {index} is out of range for {len} labels; the class file does not match the model")]
    LabelIndex { index: usize, len: usize },

    /// Confidence threshold outside `0.0..=1.0`.
    #[error("confidence must be within 0.0..=1.0, got {0}")]
    InvalidConfidence(f32),

    /// The inference engine failed.
    #[error("inference failed: {0}")]
    Inference(#[source] BoxError),

    /// Filesystem failure on a specific path.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Image decode or encode failure.
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
