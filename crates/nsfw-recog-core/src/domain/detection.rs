//! Normalized detection records.

use serde::{Deserialize, Serialize};

/// Axis-aligned box `(x_min, y_min, x_max, y_max)` in image pixel space.
///
/// Serializes as a four-element array to keep reports compact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BoundingBox {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl BoundingBox {
    /// Creates a box from its corner coordinates.
    #[must_use]
    pub const fn new(x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Truncates floating-point corners toward zero.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_xyxy(xyxy: [f32; 4]) -> Self {
        Self::new(
            xyxy[0] as i32,
            xyxy[1] as i32,
            xyxy[2] as i32,
            xyxy[3] as i32,
        )
    }

    /// Width in pixels (zero for degenerate boxes).
    #[must_use]
    pub fn width(&self) -> u32 {
        self.x_max.saturating_sub(self.x_min).max(0).unsigned_abs()
    }

    /// Height in pixels (zero for degenerate boxes).
    #[must_use]
    pub fn height(&self) -> u32 {
        self.y_max.saturating_sub(self.y_min).max(0).unsigned_abs()
    }

    /// Intersects the box with a `width` x `height` canvas.
    ///
    /// Returns `(x, y, w, h)` of the visible part, or `None` if nothing of
    /// the box lies on the canvas.
    #[must_use]
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let clamp = |v: i32, max: u32| -> u32 { v.max(0).unsigned_abs().min(max) };

        let x0 = clamp(self.x_min, width);
        let y0 = clamp(self.y_min, height);
        let x1 = clamp(self.x_max, width);
        let y1 = clamp(self.y_max, height);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0, y0, x1 - x0, y1 - y0))
    }
}

impl From<[i32; 4]> for BoundingBox {
    fn from(v: [i32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x_min, b.y_min, b.x_max, b.y_max]
    }
}

/// A single labelled region found by the detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    /// Class name from the label set.
    #[serde(rename = "class")]
    pub class_name: String,
    /// Region in pixel coordinates.
    pub bbox: BoundingBox,
}

impl Detection {
    /// Creates a detection.
    #[must_use]
    pub fn new(class_name: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            class_name: class_name.into(),
            bbox,
        }
    }
}
