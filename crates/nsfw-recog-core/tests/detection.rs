//! Detection adapter behaviour against a scripted engine.

#![allow(clippy::unwrap_used)]

use image::{DynamicImage, GenericImageView, RgbImage};
use nsfw_recog_core::{BoundingBox, DetectionAdapter, Error, LabelSet, RawBatch, RawBox};
use nsfw_recog_test_support::{MockEngine, SyntheticImageBuilder};

fn labels() -> LabelSet {
    LabelSet::parse("FACE_F\nBELLY_EXPOSED\nEXPOSED_BREAST_F\n")
}

fn raw(class_index: usize, xyxy: [f32; 4]) -> RawBox {
    RawBox {
        class_index,
        xyxy,
        confidence: 0.8,
    }
}

fn one_box(xyxy: [f32; 4]) -> MockEngine {
    MockEngine::returning(vec![RawBatch::new(vec![raw(2, xyxy)])])
}

/// Mean squared deviation of the red channel over `[x0, x1) x [y0, y1)`.
#[allow(clippy::cast_precision_loss)]
fn variance(img: &RgbImage, x0: u32, y0: u32, x1: u32, y1: u32) -> f64 {
    let values: Vec<f64> = (y0..y1)
        .flat_map(|y| (x0..x1).map(move |x| (x, y)))
        .map(|(x, y)| f64::from(img.get_pixel(x, y)[0]))
        .collect();
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

#[test]
fn empty_engine_output_gives_no_detections() {
    let adapter = DetectionAdapter::new(Box::new(MockEngine::empty()), labels());
    let image = SyntheticImageBuilder::checkerboard(32, 32);
    assert!(adapter.detect(&image, 0.25).unwrap().is_empty());
}

#[test]
fn detect_calls_engine_once_with_threshold() {
    let engine = one_box([1.0, 2.0, 3.0, 4.0]);
    let adapter = DetectionAdapter::new(Box::new(engine.clone()), labels());

    let dets = adapter
        .detect(&SyntheticImageBuilder::checkerboard(8, 8), 0.4)
        .unwrap();

    assert_eq!(engine.call_count(), 1);
    assert_eq!(engine.confidences(), vec![0.4]);
    assert_eq!(dets.len(), 1);
    assert_eq!(dets[0].class_name, "EXPOSED_BREAST_F");
    assert_eq!(dets[0].bbox, BoundingBox::new(1, 2, 3, 4));
}

#[test]
fn detect_is_deterministic() {
    let engine = MockEngine::returning(vec![
        RawBatch::new(vec![raw(0, [1.5, 2.5, 30.7, 40.2]), raw(1, [0.0, 0.0, 5.0, 5.0])]),
        RawBatch::new(vec![raw(2, [3.0, 3.0, 9.0, 9.0])]),
    ]);
    let adapter = DetectionAdapter::new(Box::new(engine), labels());
    let image = SyntheticImageBuilder::noise(64, 64, 3);

    let first = adapter.detect(&image, 0.25).unwrap();
    let second = adapter.detect(&image, 0.25).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[test]
fn out_of_range_class_index_is_fatal() {
    let engine = MockEngine::returning(vec![RawBatch::new(vec![raw(3, [0.0; 4])])]);
    let adapter = DetectionAdapter::new(Box::new(engine), labels());

    let result = adapter.detect(&SyntheticImageBuilder::checkerboard(8, 8), 0.25);
    assert!(matches!(result, Err(Error::LabelIndex { index: 3, len: 3 })));
}

#[test]
fn confidence_outside_unit_range_is_rejected() {
    let engine = MockEngine::empty();
    let adapter = DetectionAdapter::new(Box::new(engine.clone()), labels());
    let image = SyntheticImageBuilder::checkerboard(8, 8);

    assert!(matches!(
        adapter.detect(&image, 1.5),
        Err(Error::InvalidConfidence(_))
    ));
    assert!(matches!(
        adapter.detect(&image, f32::NAN),
        Err(Error::InvalidConfidence(_))
    ));
    assert_eq!(engine.call_count(), 0);
}

#[test]
fn engine_failure_surfaces_as_inference_error() {
    let adapter = DetectionAdapter::new(Box::new(MockEngine::failing("session died")), labels());
    let err = adapter
        .detect(&SyntheticImageBuilder::checkerboard(8, 8), 0.25)
        .unwrap_err();
    assert!(matches!(err, Error::Inference(_)));
    assert!(err.to_string().contains("session died"));
}

#[test]
fn detect_path_loads_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = SyntheticImageBuilder::write(
        &SyntheticImageBuilder::checkerboard(16, 16),
        dir.path(),
        "in.png",
    )
    .unwrap();
    let adapter = DetectionAdapter::new(Box::new(one_box([1.0, 1.0, 4.0, 4.0])), labels());

    assert_eq!(adapter.detect_path(&path, 0.25).unwrap().len(), 1);
}

#[test]
fn blur_changes_only_the_detected_region() {
    let dir = tempfile::tempdir().unwrap();
    let source = SyntheticImageBuilder::stripes(64, 64);
    let input = SyntheticImageBuilder::write(&source, dir.path(), "in.png").unwrap();
    let output = dir.path().join("out.png");
    let adapter = DetectionAdapter::new(Box::new(one_box([10.0, 10.0, 50.0, 50.0])), labels());

    let returned = adapter.blur(&input, &output, 0.25).unwrap();
    let written = image::open(&output).unwrap().to_rgb8();
    assert_eq!(written, returned.to_rgb8());

    let original = source.to_rgb8();
    for (x, y, pixel) in written.enumerate_pixels() {
        let inside = (10..50).contains(&x) && (10..50).contains(&y);
        if !inside {
            assert_eq!(pixel, original.get_pixel(x, y), "({x},{y}) changed");
        }
    }

    let before = variance(&original, 12, 12, 48, 48);
    let after = variance(&written, 12, 12, 48, 48);
    assert!(after < before / 10.0, "variance {before} -> {after}");
}

#[test]
fn blur_without_detections_preserves_pixels() {
    let dir = tempfile::tempdir().unwrap();
    let source = SyntheticImageBuilder::noise(24, 24, 11);
    let input = SyntheticImageBuilder::write(&source, dir.path(), "in.png").unwrap();
    let output = dir.path().join("out.png");
    let adapter = DetectionAdapter::new(Box::new(MockEngine::empty()), labels());

    adapter.blur(&input, &output, 0.25).unwrap();
    assert_eq!(image::open(&output).unwrap().to_rgb8(), source.to_rgb8());
}

#[test]
fn blur_round_trips_16_bit_gray_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = DynamicImage::ImageLuma16(image::ImageBuffer::from_fn(20, 20, |x, y| {
        image::Luma([u16::try_from(x * 2_000 + y * 13).unwrap()])
    }));
    let input = SyntheticImageBuilder::write(&source, dir.path(), "in.png").unwrap();
    let output = dir.path().join("out.png");
    let adapter = DetectionAdapter::new(Box::new(MockEngine::empty()), labels());

    adapter.blur(&input, &output, 0.25).unwrap();

    let written = image::open(&output).unwrap();
    assert_eq!(written.color(), image::ColorType::L16);
    assert_eq!(written.as_luma16(), source.as_luma16());
}

#[test]
fn blur_narrows_16_bit_input_for_jpeg_output() {
    let dir = tempfile::tempdir().unwrap();
    let source = DynamicImage::ImageRgb16(image::ImageBuffer::from_pixel(
        16,
        16,
        image::Rgb([40_000u16, 20_000, 10_000]),
    ));
    let input = SyntheticImageBuilder::write(&source, dir.path(), "in.png").unwrap();
    let output = dir.path().join("out.jpg");
    let adapter = DetectionAdapter::new(Box::new(one_box([2.0, 2.0, 12.0, 12.0])), labels());

    let returned = adapter.blur(&input, &output, 0.25).unwrap();

    assert_eq!(returned.color(), image::ColorType::Rgb16);
    let written = image::open(&output).unwrap();
    assert_eq!(written.color(), image::ColorType::Rgb8);
    assert_eq!((written.width(), written.height()), (16, 16));
}

#[test]
fn blur_writes_nothing_when_detection_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = SyntheticImageBuilder::write(
        &SyntheticImageBuilder::checkerboard(16, 16),
        dir.path(),
        "in.png",
    )
    .unwrap();
    let output = dir.path().join("out.png");
    let adapter = DetectionAdapter::new(Box::new(MockEngine::failing("nope")), labels());

    assert!(adapter.blur(&input, &output, 0.25).is_err());
    assert!(!output.exists());
}

#[test]
fn annotate_outlines_region_in_blue() {
    let dir = tempfile::tempdir().unwrap();
    let source = DynamicImage::ImageRgb8(RgbImage::new(40, 40));
    let input = SyntheticImageBuilder::write(&source, dir.path(), "in.png").unwrap();
    let output = dir.path().join("out.png");
    let adapter = DetectionAdapter::new(Box::new(one_box([5.0, 5.0, 25.0, 25.0])), labels());

    let annotated = adapter.annotate(&input, &output, 0.25).unwrap();

    assert_eq!(annotated.get_pixel(5, 5).0, [0, 0, 255, 255]);
    assert_eq!(annotated.get_pixel(15, 15).0, [0, 0, 0, 255]);
    assert!(output.exists());
}
