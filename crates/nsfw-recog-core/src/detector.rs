//! Detection adapter: turns raw engine output into labelled detections.

use std::path::Path;

use image::{DynamicImage, ImageError};
use tracing::{debug, info};

use crate::domain::{BoundingBox, Detection, LabelSet};
use crate::error::{Error, Result};
use crate::ports::{InferenceEngine, RawBatch};
use crate::redact;

/// Confidence threshold used when the caller does not pick one.
pub const DEFAULT_CONFIDENCE: f32 = 0.25;

/// Wraps an inference engine and the label set it was trained with.
pub struct DetectionAdapter {
    engine: Box<dyn InferenceEngine>,
    labels: LabelSet,
}

impl DetectionAdapter {
    #[must_use]
    pub fn new(engine: Box<dyn InferenceEngine>, labels: LabelSet) -> Self {
        Self { engine, labels }
    }

    /// The labels used to name detections.
    #[must_use]
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Runs the engine once and returns its boxes as detections, in engine order.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConfidence`] if `confidence` is outside `0.0..=1.0`
    /// - [`Error::Inference`] if the engine fails
    /// - [`Error::LabelIndex`] if the engine emits an unknown class index
    pub fn detect(&self, image: &DynamicImage, confidence: f32) -> Result<Vec<Detection>> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(Error::InvalidConfidence(confidence));
        }

        let batches = self
            .engine
            .predict(image, confidence)
            .map_err(|e| Error::Inference(e.into()))?;

        let detections = normalize(&batches, &self.labels)?;
        debug!("{} detection(s) at confidence {confidence}", detections.len());
        Ok(detections)
    }

    /// Loads the image at `path` and detects on it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Image`] if the file cannot be decoded, otherwise as [`detect`](Self::detect).
    pub fn detect_path(&self, path: &Path, confidence: f32) -> Result<Vec<Detection>> {
        let image = image::open(path)?;
        self.detect(&image, confidence)
    }

    /// Blurs every detected region of `input` and writes the result to `output`.
    ///
    /// Nothing is written if detection fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Image`] if decoding or encoding fails, otherwise as [`detect`](Self::detect).
    pub fn blur(&self, input: &Path, output: &Path, confidence: f32) -> Result<DynamicImage> {
        let image = image::open(input)?;
        let detections = self.detect(&image, confidence)?;

        let redacted = redact::blur_regions(image, &detections);
        save(&redacted, output)?;
        info!(
            "Blurred {} region(s) of {} into {}",
            detections.len(),
            input.display(),
            output.display()
        );
        Ok(redacted)
    }

    /// Outlines every detected region of `input` and writes the result to `output`.
    ///
    /// # Errors
    ///
    /// As [`blur`](Self::blur).
    pub fn annotate(&self, input: &Path, output: &Path, confidence: f32) -> Result<DynamicImage> {
        let image = image::open(input)?;
        let detections = self.detect(&image, confidence)?;

        let annotated = redact::outline_regions(image, &detections);
        save(&annotated, output)?;
        info!(
            "Outlined {} region(s) of {} into {}",
            detections.len(),
            input.display(),
            output.display()
        );
        Ok(annotated)
    }
}

/// Writes `image`, narrowing to 8 bits per channel when the target format
/// cannot hold its pixel type (16-bit into JPEG, for instance).
fn save(image: &DynamicImage, path: &Path) -> Result<()> {
    match image.save(path) {
        Err(ImageError::Unsupported(e)) => {
            debug!("{}: {e}; writing 8-bit instead", path.display());
            let narrowed = if image.color().has_alpha() {
                DynamicImage::ImageRgba8(image.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(image.to_rgb8())
            };
            match narrowed.save(path) {
                Err(ImageError::Unsupported(_)) if narrowed.color().has_alpha() => {
                    Ok(DynamicImage::ImageRgb8(image.to_rgb8()).save(path)?)
                }
                other => Ok(other?),
            }
        }
        other => Ok(other?),
    }
}

/// Maps raw engine batches to detections, preserving order across and within batches.
///
/// # Errors
///
/// Returns [`Error::LabelIndex`] for a class index the label set cannot name.
pub fn normalize(batches: &[RawBatch], labels: &LabelSet) -> Result<Vec<Detection>> {
    batches
        .iter()
        .flat_map(|batch| &batch.boxes)
        .map(|raw| {
            let name = labels.name(raw.class_index)?;
            Ok(Detection::new(name, BoundingBox::from_xyxy(raw.xyxy)))
        })
        .collect()
}
