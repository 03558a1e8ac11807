//! Region-level image edits: Gaussian blur and box outlines.
//!
//! Both operations work on the detections' boxes clamped to the canvas.
//! Boxes that fall entirely outside the image are skipped.

use image::{imageops, ColorType, DynamicImage, ImageBuffer, Pixel, Rgb, Rgba};
use imageproc::definitions::Clamp;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::filter::separable_filter_equal;
use imageproc::rect::Rect;

use crate::domain::{BoundingBox, Detection};

/// Side length of the square blur kernel.
pub const BLUR_KERNEL_SIZE: usize = 17;

/// Standard deviation of the blur kernel.
pub const BLUR_SIGMA: f32 = 30.0;

/// Outline thickness in pixels.
pub const OUTLINE_THICKNESS: u32 = 2;

/// Outline colour (RGB).
pub const OUTLINE_COLOR: [u8; 3] = [0, 0, 255];

/// Normalized 1-D Gaussian kernel of `size` taps centred on the middle tap.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn gaussian_kernel(size: usize, sigma: f32) -> Vec<f32> {
    let center = (size as f32 - 1.0) / 2.0;
    let denom = 2.0 * sigma * sigma;

    let mut kernel: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / denom).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// Blurs every detection's region, in order. Overlapping regions compound.
///
/// The pixel format is preserved, so pixels outside every region come back
/// bit-for-bit unchanged.
#[must_use]
pub fn blur_regions(image: DynamicImage, detections: &[Detection]) -> DynamicImage {
    let kernel = gaussian_kernel(BLUR_KERNEL_SIZE, BLUR_SIGMA);

    match image {
        DynamicImage::ImageLuma8(buf) => DynamicImage::ImageLuma8(blur_all(buf, detections, &kernel)),
        DynamicImage::ImageLumaA8(buf) => {
            DynamicImage::ImageLumaA8(blur_all(buf, detections, &kernel))
        }
        DynamicImage::ImageRgb8(buf) => DynamicImage::ImageRgb8(blur_all(buf, detections, &kernel)),
        DynamicImage::ImageRgba8(buf) => {
            DynamicImage::ImageRgba8(blur_all(buf, detections, &kernel))
        }
        DynamicImage::ImageLuma16(buf) => {
            DynamicImage::ImageLuma16(blur_all(buf, detections, &kernel))
        }
        DynamicImage::ImageLumaA16(buf) => {
            DynamicImage::ImageLumaA16(blur_all(buf, detections, &kernel))
        }
        DynamicImage::ImageRgb16(buf) => {
            DynamicImage::ImageRgb16(blur_all(buf, detections, &kernel))
        }
        DynamicImage::ImageRgba16(buf) => {
            DynamicImage::ImageRgba16(blur_all(buf, detections, &kernel))
        }
        DynamicImage::ImageRgb32F(buf) => {
            DynamicImage::ImageRgb32F(blur_all(buf, detections, &kernel))
        }
        other => DynamicImage::ImageRgba32F(blur_all(other.into_rgba32f(), detections, &kernel)),
    }
}

/// Draws a hollow blue outline around every detection's region.
///
/// Bit depth and alpha are preserved. Grayscale input is promoted to RGB of
/// the same depth, since the outline is coloured.
#[must_use]
pub fn outline_regions(image: DynamicImage, detections: &[Detection]) -> DynamicImage {
    let [r, g, b] = OUTLINE_COLOR;
    let alpha = image.color().has_alpha();

    match image.color() {
        ColorType::L16 | ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16 => {
            let [r, g, b] = [r, g, b].map(|c| u16::from(c) * 257);
            if alpha {
                let color = Rgba([r, g, b, u16::MAX]);
                DynamicImage::ImageRgba16(outline_all(image.into_rgba16(), detections, color))
            } else {
                DynamicImage::ImageRgb16(outline_all(image.into_rgb16(), detections, Rgb([r, g, b])))
            }
        }
        ColorType::Rgb32F | ColorType::Rgba32F => {
            let [r, g, b] = [r, g, b].map(|c| f32::from(c) / 255.0);
            if alpha {
                let color = Rgba([r, g, b, 1.0]);
                DynamicImage::ImageRgba32F(outline_all(image.into_rgba32f(), detections, color))
            } else {
                DynamicImage::ImageRgb32F(outline_all(
                    image.into_rgb32f(),
                    detections,
                    Rgb([r, g, b]),
                ))
            }
        }
        _ if alpha => {
            let color = Rgba([r, g, b, u8::MAX]);
            DynamicImage::ImageRgba8(outline_all(image.into_rgba8(), detections, color))
        }
        _ => DynamicImage::ImageRgb8(outline_all(image.into_rgb8(), detections, Rgb([r, g, b]))),
    }
}

fn blur_all<P>(
    mut buf: ImageBuffer<P, Vec<P::Subpixel>>,
    detections: &[Detection],
    kernel: &[f32],
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + 'static,
    P::Subpixel: Into<f32> + Clamp<f32>,
{
    for d in detections {
        blur_region(&mut buf, d.bbox, kernel);
    }
    buf
}

fn outline_all<P>(
    mut buf: ImageBuffer<P, Vec<P::Subpixel>>,
    detections: &[Detection],
    color: P,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + 'static,
{
    for d in detections {
        outline_region(&mut buf, d.bbox, color);
    }
    buf
}

fn blur_region<P>(buf: &mut ImageBuffer<P, Vec<P::Subpixel>>, bbox: BoundingBox, kernel: &[f32])
where
    P: Pixel + 'static,
    P::Subpixel: Into<f32> + Clamp<f32>,
{
    let (width, height) = buf.dimensions();
    let Some((x, y, w, h)) = bbox.clamp_to(width, height) else {
        return;
    };

    let region = imageops::crop_imm(buf, x, y, w, h).to_image();
    let blurred = separable_filter_equal(&region, kernel);
    imageops::replace(buf, &blurred, i64::from(x), i64::from(y));
}

#[allow(clippy::cast_possible_wrap)]
fn outline_region<P>(buf: &mut ImageBuffer<P, Vec<P::Subpixel>>, bbox: BoundingBox, color: P)
where
    P: Pixel + 'static,
{
    let (width, height) = buf.dimensions();
    let Some((x, y, w, h)) = bbox.clamp_to(width, height) else {
        return;
    };

    // Rings grow inward so the outline never leaves the box.
    for inset in 0..OUTLINE_THICKNESS {
        if w <= 2 * inset || h <= 2 * inset {
            break;
        }
        let rect = Rect::at((x + inset) as i32, (y + inset) as i32)
            .of_size(w - 2 * inset, h - 2 * inset);
        draw_hollow_rect_mut(buf, rect, color);
    }
}
