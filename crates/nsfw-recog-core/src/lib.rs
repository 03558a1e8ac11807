//! nsfw-recog core - model cache, detection normalization and region redaction
//!
//! This crate owns the domain types, the error taxonomy and the ports that
//! adapters implement. The ONNX runtime and HTTP client live in
//! `nsfw-recog-adapters`.

pub mod cache;
pub mod detector;
pub mod domain;
pub mod error;
pub mod ports;
pub mod redact;

pub use cache::{Artifact, CacheEntry, ModelCache, ResolvedModel};
pub use detector::{DetectionAdapter, DEFAULT_CONFIDENCE};
pub use domain::{BoundingBox, Detection, DetectionReport, ImageDimensions, ImageInfo, LabelSet};
pub use error::{Error, Result};
pub use ports::{
    ImageSource, Images, InferenceEngine, ProgressCallback, ProgressEvent, ProgressSink, RawBatch,
    RawBox, RemoteFetch, ResultOutput, UnreadableImage,
};
