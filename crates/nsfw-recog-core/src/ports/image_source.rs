//! Inputs for a detection batch.

use std::fmt;

use crate::domain::ImageInfo;

/// A listed input that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadableImage {
    /// Path as the source listed it.
    pub path: String,
    /// Why decoding failed.
    pub reason: String,
}

impl fmt::Display for UnreadableImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

impl std::error::Error for UnreadableImage {}

/// Decoded images in listing order. Failures keep their place in the sequence.
pub type Images<'a> = Box<dyn Iterator<Item = Result<ImageInfo, UnreadableImage>> + Send + 'a>;

/// Lists and decodes the images one run covers.
pub trait ImageSource: Send + Sync {
    fn images(&self) -> Images<'_>;

    /// How many items `images` yields, when that is known without decoding.
    fn count_hint(&self) -> Option<usize>;
}
