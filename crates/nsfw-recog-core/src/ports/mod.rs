//! Port definitions for hexagonal architecture.
//!
//! These traits define the boundaries between the domain core and external adapters.

mod engine;
mod fetch;
mod image_source;
mod progress;
mod result_output;

pub use engine::{InferenceEngine, RawBatch, RawBox};
pub use fetch::{ProgressCallback, RemoteFetch};
pub use image_source::{ImageSource, Images, UnreadableImage};
pub use progress::{ProgressEvent, ProgressSink};
pub use result_output::ResultOutput;
