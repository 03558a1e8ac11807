//! Synthetic images and on-disk model fixtures for tests.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use nsfw_recog_core::domain::ImageInfo;

/// Builder for creating synthetic test images.
pub struct SyntheticImageBuilder;

impl SyntheticImageBuilder {
    /// High-contrast checkerboard with 8-pixel cells.
    #[must_use]
    pub fn checkerboard(width: u32, height: u32) -> DynamicImage {
        Self::checkerboard_with_cell_size(width, height, 8)
    }

    /// Checkerboard with a custom cell size.
    #[must_use]
    pub fn checkerboard_with_cell_size(width: u32, height: u32, cell_size: u32) -> DynamicImage {
        let cell = cell_size.max(1);
        let img = RgbImage::from_fn(width, height, |x, y| {
            if (x / cell + y / cell) % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    /// One-pixel vertical stripes, the worst case for a blur to leave alone.
    #[must_use]
    pub fn stripes(width: u32, height: u32) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, _| {
            if x % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    /// Deterministic pseudo-random RGB noise.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn noise(width: u32, height: u32, seed: u32) -> DynamicImage {
        let mut state = seed.wrapping_mul(2_654_435_761).max(1);
        let mut next = move || {
            // xorshift32
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        };
        let mut img = RgbImage::new(width, height);
        for p in img.pixels_mut() {
            *p = Rgb([next(), next(), next()]);
        }
        DynamicImage::ImageRgb8(img)
    }

    /// Uniform gray image.
    #[must_use]
    pub fn uniform_gray(width: u32, height: u32, value: u8) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([value])))
    }

    /// Wraps an image as if it had been loaded from `path`.
    #[must_use]
    pub fn info(path: &str, image: DynamicImage) -> ImageInfo {
        ImageInfo::new(path, image)
    }

    /// Saves `image` as `dir/name`, format chosen by extension.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn write(image: &DynamicImage, dir: &Path, name: &str) -> anyhow::Result<PathBuf> {
        let path = dir.join(name);
        image
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// A model directory on disk: a checkpoint and its sibling `classes.txt`.
pub struct ModelFixture {
    pub model_path: PathBuf,
    pub classes_path: PathBuf,
}

impl ModelFixture {
    /// Writes `model.onnx` with placeholder bytes and `classes.txt` with `labels`.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be written.
    pub fn write(dir: &Path, labels: &[&str]) -> anyhow::Result<Self> {
        Self::write_with(dir, b"\x08\x07onnx-placeholder", &labels.join("\n"))
    }

    /// Writes both files with exact contents.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be written.
    pub fn write_with(dir: &Path, model: &[u8], classes: &str) -> anyhow::Result<Self> {
        let model_path = dir.join("model.onnx");
        let classes_path = dir.join("classes.txt");
        fs::write(&model_path, model)
            .with_context(|| format!("Failed to write {}", model_path.display()))?;
        fs::write(&classes_path, classes)
            .with_context(|| format!("Failed to write {}", classes_path.display()))?;
        Ok(Self {
            model_path,
            classes_path,
        })
    }
}
