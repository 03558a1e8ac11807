//! ONNX Runtime inference engine for YOLOv8-style detection exports.
//!
//! The checkpoint takes a `[1, 3, S, S]` RGB tensor in `[0, 1]` and returns
//! `[1, 4 + classes, candidates]`: centre-format boxes followed by one score
//! per class. Some exports transpose the last two axes; both layouts decode.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use anyhow::{bail, Context, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use nsfw_recog_core::{InferenceEngine, RawBatch, RawBox};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tracing::{debug, info};

/// Gray used to pad the letterboxed input.
const PAD_VALUE: u8 = 114;

/// Tuning for [`OrtEngine`].
#[derive(Debug, Clone)]
pub struct OrtEngineConfig {
    /// Square input side the network expects.
    pub input_size: u32,
    /// Overlap above which a lower-scoring box of the same class is dropped.
    pub iou_threshold: f32,
    /// Upper bound on boxes kept per image.
    pub max_detections: usize,
    /// Threads for intra-op parallelism.
    pub intra_threads: usize,
}

impl Default for OrtEngineConfig {
    fn default() -> Self {
        Self {
            input_size: 640,
            iou_threshold: 0.7,
            max_detections: 300,
            intra_threads: 4,
        }
    }
}

/// Detection engine backed by an ONNX Runtime session.
pub struct OrtEngine {
    session: Mutex<Session>,
    config: OrtEngineConfig,
}

impl OrtEngine {
    /// Loads the checkpoint at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be initialised or the file is
    /// not a loadable ONNX model.
    pub fn load(path: &Path, config: OrtEngineConfig) -> Result<Self> {
        debug!("Loading ONNX model from {}", path.display());

        let session = Session::builder()
            .context("Failed to create ONNX Runtime session builder")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set graph optimization level")?
            .with_intra_threads(config.intra_threads)
            .context("Failed to set intra-op thread count")?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model {}", path.display()))?;

        info!("Loaded model {}", path.display());
        Ok(Self {
            session: Mutex::new(session),
            config,
        })
    }
}

impl InferenceEngine for OrtEngine {
    fn predict(&self, image: &DynamicImage, confidence: f32) -> Result<Vec<RawBatch>> {
        let size = self.config.input_size;
        let letterbox = Letterbox::fit(image.width(), image.height(), size);
        let side = size as usize;

        let input = Tensor::from_array(([1usize, 3, side, side], letterbox.tensor(image)))
            .context("Failed to build input tensor")?;

        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        let outputs = session
            .run(ort::inputs![input])
            .context("Model inference failed")?;
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to read model output")?;

        let candidates = decode(shape, data, confidence)?;
        let kept = nms(candidates, self.config.iou_threshold, self.config.max_detections);
        debug!("{} box(es) after NMS", kept.len());

        let boxes = kept
            .into_iter()
            .map(|b| RawBox {
                xyxy: letterbox.restore(b.xyxy),
                ..b
            })
            .collect();

        Ok(vec![RawBatch::new(boxes)])
    }
}

/// Aspect-preserving resize onto a padded square canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    src_width: u32,
    src_height: u32,
    size: u32,
    scale: f32,
    scaled_width: u32,
    scaled_height: u32,
    pad_left: u32,
    pad_top: u32,
}

impl Letterbox {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn fit(src_width: u32, src_height: u32, size: u32) -> Self {
        let w = src_width.max(1) as f32;
        let h = src_height.max(1) as f32;
        let side = size as f32;
        let scale = (side / w).min(side / h);

        let scaled_width = ((w * scale).round() as u32).clamp(1, size);
        let scaled_height = ((h * scale).round() as u32).clamp(1, size);

        // Odd padding puts the extra pixel on the right/bottom.
        let dw = (size - scaled_width) as f32 / 2.0;
        let dh = (size - scaled_height) as f32 / 2.0;

        Self {
            src_width,
            src_height,
            size,
            scale,
            scaled_width,
            scaled_height,
            pad_left: (dw - 0.1).round().max(0.0) as u32,
            pad_top: (dh - 0.1).round().max(0.0) as u32,
        }
    }

    /// Builds the NCHW input, normalized to `[0, 1]`.
    fn tensor(&self, image: &DynamicImage) -> Vec<f32> {
        let resized = image
            .resize_exact(self.scaled_width, self.scaled_height, FilterType::Triangle)
            .into_rgb8();

        let mut canvas = RgbImage::from_pixel(self.size, self.size, Rgb([PAD_VALUE; 3]));
        imageops::replace(
            &mut canvas,
            &resized,
            i64::from(self.pad_left),
            i64::from(self.pad_top),
        );

        let plane = (self.size as usize) * (self.size as usize);
        let mut data = vec![0f32; 3 * plane];
        for (i, pixel) in canvas.pixels().enumerate() {
            for (c, &v) in pixel.0.iter().enumerate() {
                data[c * plane + i] = f32::from(v) / 255.0;
            }
        }
        data
    }

    /// Maps a box from network input space back to the source image, clipped.
    #[allow(clippy::cast_precision_loss)]
    fn restore(&self, xyxy: [f32; 4]) -> [f32; 4] {
        let left = self.pad_left as f32;
        let top = self.pad_top as f32;
        let max_x = self.src_width as f32;
        let max_y = self.src_height as f32;

        [
            ((xyxy[0] - left) / self.scale).clamp(0.0, max_x),
            ((xyxy[1] - top) / self.scale).clamp(0.0, max_y),
            ((xyxy[2] - left) / self.scale).clamp(0.0, max_x),
            ((xyxy[3] - top) / self.scale).clamp(0.0, max_y),
        ]
    }
}

/// Decodes raw predictions into corner-format boxes scoring at least `confidence`.
fn decode(shape: &[i64], data: &[f32], confidence: f32) -> Result<Vec<RawBox>> {
    let dims: Vec<usize> = shape
        .iter()
        .map(|&d| usize::try_from(d))
        .collect::<std::result::Result<_, _>>()
        .context("Model output has a negative dimension")?;

    let [1, a, b] = dims[..] else {
        bail!("Unexpected model output shape {shape:?}, expected [1, features, candidates]");
    };

    // Features are the short axis: 4 box values plus one score per class.
    let (features, count, channels_first) = if a <= b { (a, b, true) } else { (b, a, false) };
    if features <= 4 {
        bail!("Model output has {features} features per candidate, expected more than 4");
    }
    if data.len() < features * count {
        bail!("Model output holds {} values, expected {}", data.len(), features * count);
    }

    let at = |feature: usize, candidate: usize| -> f32 {
        if channels_first {
            data[feature * count + candidate]
        } else {
            data[candidate * features + feature]
        }
    };

    let mut boxes = Vec::new();
    for i in 0..count {
        let (class_index, score) = (4..features)
            .map(|f| (f - 4, at(f, i)))
            .fold((0, f32::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best });

        if score < confidence {
            continue;
        }

        let (cx, cy, w, h) = (at(0, i), at(1, i), at(2, i), at(3, i));
        boxes.push(RawBox {
            class_index,
            xyxy: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
            confidence: score,
        });
    }

    Ok(boxes)
}

/// Class-aware non-maximum suppression. Output is sorted by confidence, descending.
fn nms(mut boxes: Vec<RawBox>, iou_threshold: f32, max_detections: usize) -> Vec<RawBox> {
    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep = Vec::new();
    while !boxes.is_empty() && keep.len() < max_detections {
        let best = boxes.remove(0);
        boxes.retain(|other| {
            other.class_index != best.class_index || iou(&best.xyxy, &other.xyxy) <= iou_threshold
        });
        keep.push(best);
    }

    keep
}

/// Intersection over Union for two corner-format boxes.
fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);

    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);

    let union = area_a + area_b - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}
