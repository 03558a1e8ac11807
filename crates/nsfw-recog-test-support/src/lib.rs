//! Test support utilities for nsfw-recog.
//!
//! Provides mock ports, synthetic images and on-disk model fixtures.
//!
//! # Example
//!
//! ```
//! use nsfw_recog_core::{DetectionAdapter, LabelSet};
//! use nsfw_recog_test_support::{MockEngine, SyntheticImageBuilder};
//!
//! let adapter = DetectionAdapter::new(Box::new(MockEngine::empty()), LabelSet::parse("FACE_F\n"));
//! let image = SyntheticImageBuilder::checkerboard(64, 64);
//! assert!(adapter.detect(&image, 0.25).unwrap().is_empty());
//! ```

mod builders;
mod mocks;

pub use builders::{ModelFixture, SyntheticImageBuilder};
pub use mocks::{
    MockEngine, MockFetcher, MockImageSource, MockProgressSink, MockResultOutput,
};
