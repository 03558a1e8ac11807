//! Core domain types.

mod detection;
mod labels;
mod report;

pub use detection::{BoundingBox, Detection};
pub use labels::LabelSet;
pub use report::{DetectionReport, ImageDimensions, ImageInfo};
