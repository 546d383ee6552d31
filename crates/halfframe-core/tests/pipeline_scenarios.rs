//! End-to-end capture scenarios: decode, grade, composite, encode.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use halfframe_core::{CaptureOutcome, Engine, LutStore, PipelineConfig, PipelineError, ProcessingOptions};

/// JPEG round trip slack for flat regions.
const JPEG_EPSILON: i32 = 6;

fn write_solid_png(dir: &Path, name: &str, w: u32, h: u32, rgb: [u8; 3]) -> PathBuf {
    let path = dir.join(name);
    image::RgbaImage::from_pixel(w, h, image::Rgba([rgb[0], rgb[1], rgb[2], 255]))
        .save(&path)
        .expect("write png");
    path
}

fn write_gradient_png(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
    let path = dir.join(name);
    image::RgbaImage::from_fn(w, h, |x, y| {
        image::Rgba([(x * 255 / w) as u8, (y * 255 / h) as u8, 120, 255])
    })
    .save(&path)
    .expect("write png");
    path
}

fn options(film: &str) -> ProcessingOptions {
    ProcessingOptions {
        captured_at: NaiveDate::from_ymd_opt(2024, 3, 9).and_then(|d| d.and_hms_opt(14, 5, 0)),
        ..ProcessingOptions::new(film)
    }
}

fn assert_near(got: [u8; 3], want: [u8; 3], what: &str) {
    for c in 0..3 {
        let diff = (got[c] as i32 - want[c] as i32).abs();
        assert!(diff <= JPEG_EPSILON, "{what} channel {c}: got {got:?}, want {want:?}");
    }
}

#[test]
fn test_landscape_capture_is_cropped_to_half_frame() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = write_solid_png(dir.path(), "wide.png", 4000, 3000, [120, 120, 120]);
    let engine = Engine::new(PipelineConfig::default()).expect("engine");

    let result = engine
        .compositor()
        .process(&source, &options("clean"))
        .expect("process");

    assert_eq!((result.width, result.height), (2000, 3000));
    assert_eq!(image::image_dimensions(&result.path).expect("dims"), (2000, 3000));
    assert_eq!(result.film_id, "clean");
    assert_eq!(result.path.file_name().and_then(|n| n.to_str()), Some("wide_processed.jpg"));
}

#[test]
fn test_polaroid_frame_adds_borders_and_caption_strip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = write_solid_png(dir.path(), "wide.png", 4000, 3000, [40, 90, 160]);
    let engine = Engine::new(PipelineConfig::default()).expect("engine");

    let mut opts = options("kodak_250d");
    opts.add_polaroid_frame = true;
    opts.add_date_stamp = true;
    opts.location = Some("Lisbon".into());
    let result = engine.compositor().process(&source, &opts).expect("process");

    assert_eq!((result.width, result.height), (2160, 3530));
    let out = image::open(&result.path).expect("decode output").to_rgb8();
    let bg = engine.config().polaroid_background.rgb;
    assert_near(out.get_pixel(5, 5).0, bg, "top-left border");
    assert_near(out.get_pixel(2150, 1500).0, bg, "right border");
}

#[test]
fn test_polaroid_frame_suppresses_date_stamp() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = write_solid_png(dir.path(), "wide.png", 1200, 900, [200, 200, 200]);
    let engine = Engine::new(PipelineConfig::default()).expect("engine");
    let compositor = engine.compositor();

    let mut opts = options("clean");
    opts.add_polaroid_frame = true;
    let plain = compositor.process(&source, &opts).expect("process");
    opts.add_date_stamp = true;
    let stamped = compositor.process(&source, &opts).expect("process");

    let a = std::fs::read(&plain.path).expect("read");
    let b = std::fs::read(&stamped.path).expect("read");
    assert!(a == b, "date stamp drawn over a Polaroid frame");
}

#[test]
fn test_date_stamp_only_touches_bottom_right() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = write_solid_png(dir.path(), "wide.png", 1200, 900, [200, 200, 200]);
    let engine = Engine::new(PipelineConfig::default()).expect("engine");
    let compositor = engine.compositor();

    let mut opts = options("clean");
    let plain = compositor.process(&source, &opts).expect("process");
    opts.add_date_stamp = true;
    let stamped = compositor.process(&source, &opts).expect("process");

    let a = image::open(&plain.path).expect("decode").to_rgb8();
    let b = image::open(&stamped.path).expect("decode").to_rgb8();
    let (w, h) = a.dimensions();
    let mut touched = 0;
    for (x, y, px) in b.enumerate_pixels() {
        let before = a.get_pixel(x, y);
        let moved = (0..3).any(|c| (px[c] as i32 - before[c] as i32).abs() > JPEG_EPSILON * 2);
        if moved {
            touched += 1;
            assert!(x >= w / 2 && y >= h / 2, "stamp changed ({x}, {y})");
        }
    }
    assert!(touched > 0, "no date stamp drawn");
}

#[test]
fn test_portrait_capture_keeps_full_width() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = write_gradient_png(dir.path(), "tall.png", 600, 1200);
    let engine = Engine::new(PipelineConfig::default()).expect("engine");

    let result = engine
        .compositor()
        .process(&source, &options("moonrise_kingdom"))
        .expect("process");
    assert_eq!((result.width, result.height), (600, 900));
}

#[test]
fn test_missing_lut_falls_back_to_matrix_and_still_encodes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = write_gradient_png(dir.path(), "a.png", 300, 200);
    let engine = Engine::builder()
        .config(PipelineConfig::default())
        .luts(LutStore::new())
        .build()
        .expect("engine");

    let result = engine
        .compositor()
        .process(&source, &options("kodak_250d"))
        .expect("process");
    assert_eq!(result.film_id, "kodak_250d");
    assert!(result.path.exists());
}

#[test]
fn test_unknown_film_uses_default_stock() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = write_gradient_png(dir.path(), "a.png", 120, 80);
    let engine = Engine::new(PipelineConfig::default()).expect("engine");

    let result = engine
        .compositor()
        .process(&source, &options("no_such_film"))
        .expect("process");
    assert_eq!(result.film_id, engine.registry().default_stock().id);
}

#[test]
fn test_regrade_is_deterministic() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = write_gradient_png(dir.path(), "photo.png", 160, 120);
    let engine = Engine::new(PipelineConfig::default()).expect("engine");
    let compositor = engine.compositor();

    let first = compositor.regrade(&source, "vintage_overlay").expect("regrade");
    let second = compositor.regrade(&source, "vintage_overlay").expect("regrade");

    assert_ne!(first.path, second.path);
    assert_eq!(first.path.file_name().and_then(|n| n.to_str()), Some("photo_vintage_overlay.jpg"));
    let a = image::open(&first.path).expect("decode").to_rgb8();
    let b = image::open(&second.path).expect("decode").to_rgb8();
    assert_eq!(a.dimensions(), (160, 120));
    assert!(a.as_raw() == b.as_raw(), "regrade output differs between runs");
}

#[test]
fn test_fixed_grain_seed_is_reproducible() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = write_solid_png(dir.path(), "grain.png", 400, 600, [128, 128, 128]);
    let config = PipelineConfig {
        grain_seed: Some(42),
        ..PipelineConfig::default()
    };
    let engine = Engine::new(config).expect("engine");
    let compositor = engine.compositor();

    let mut opts = options("ilford_hp5");
    opts.add_grain = true;
    let first = compositor.process(&source, &opts).expect("process");
    let second = compositor.process(&source, &opts).expect("process");

    let a = std::fs::read(&first.path).expect("read");
    let b = std::fs::read(&second.path).expect("read");
    assert_eq!(a, b);

    opts.add_grain = false;
    let clean = compositor.process(&source, &opts).expect("process");
    assert_ne!(std::fs::read(&clean.path).expect("read"), a);
}

#[test]
fn test_source_file_is_left_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = write_gradient_png(dir.path(), "keep.png", 200, 150);
    let before = std::fs::read(&source).expect("read");
    let engine = Engine::new(PipelineConfig::default()).expect("engine");

    let mut opts = options("kodak_gold_200");
    opts.add_grain = true;
    opts.add_date_stamp = true;
    engine.compositor().process(&source, &opts).expect("process");
    engine.compositor().regrade(&source, "clean_raw").expect("regrade");

    assert_eq!(std::fs::read(&source).expect("read"), before);
}

#[test]
fn test_corrupt_capture_keeps_original() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join("broken.jpg");
    std::fs::write(&source, b"not an image").expect("write");
    let engine = Engine::new(PipelineConfig::default()).expect("engine");

    let outcome = engine.compositor().capture(&source, &options("kodak_250d"));
    match outcome {
        CaptureOutcome::Unprocessed { original, reason } => {
            assert_eq!(original, source);
            assert!(matches!(reason, PipelineError::Decode { .. }), "{reason}");
        }
        other => panic!("expected Unprocessed, got {other:?}"),
    }
}

#[test]
fn test_oversized_canvas_is_refused() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = write_solid_png(dir.path(), "big.png", 400, 300, [10, 10, 10]);
    let config = PipelineConfig {
        max_canvas_pixels: 1_000,
        ..PipelineConfig::default()
    };
    let engine = Engine::new(config).expect("engine");

    let err = engine
        .compositor()
        .process(&source, &options("clean"))
        .unwrap_err();
    assert!(matches!(err, PipelineError::SurfaceAllocation { .. }), "{err}");
}
