//! Inference engine port.

use image::DynamicImage;

/// One box as emitted by the engine, before label lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawBox {
    /// Class index into the label set.
    pub class_index: usize,
    /// Corners `[x_min, y_min, x_max, y_max]` in source pixel space.
    pub xyxy: [f32; 4],
    /// Engine confidence. Used for filtering only, never reported.
    pub confidence: f32,
}

/// Boxes produced for one input, in engine order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawBatch {
    pub boxes: Vec<RawBox>,
}

impl RawBatch {
    #[must_use]
    pub fn new(boxes: Vec<RawBox>) -> Self {
        Self { boxes }
    }
}

/// Port for the pretrained detection model.
pub trait InferenceEngine: Send + Sync {
    /// Runs detection once and returns zero or more result batches.
    ///
    /// Boxes scoring below `confidence` must already be filtered out.
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or the forward pass fails.
    fn predict(&self, image: &DynamicImage, confidence: f32) -> anyhow::Result<Vec<RawBatch>>;
}
