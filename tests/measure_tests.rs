//! End-to-end measurement tests
//!
//! Images are synthesized into a unique temp directory per test, measured
//! through the public API, and the reported areas and written files are
//! checked.

use image::{GrayImage, Luma};
use rust_area::config::{CanonicalSize, OutputPolicy};
use rust_area::{
    DecodeFailure, ErrorKind, MeasureConfig, MeasureError, Measurer, Workspace, measure,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static TEMP_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

fn temp_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before UNIX epoch")
        .as_nanos();
    let sequence = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("rustarea_{tag}_{nanos}_{sequence}"));
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

fn write_png(dir: &Path, name: &str, image: &GrayImage) -> PathBuf {
    let path = dir.join(name);
    image.save(&path).expect("failed to write test image");
    path
}

fn block_image(width: u32, height: u32, x: (u32, u32), y: (u32, u32)) -> GrayImage {
    GrayImage::from_fn(width, height, |px, py| {
        if (x.0..=x.1).contains(&px) && (y.0..=y.1).contains(&py) {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

fn engine(out: &Path) -> Measurer {
    Measurer::new(MeasureConfig {
        output: OutputPolicy::PerRequest {
            dir: out.to_path_buf(),
        },
        ..MeasureConfig::default()
    })
    .expect("default config is valid")
}

fn small_engine(out: &Path) -> Measurer {
    Measurer::new(MeasureConfig {
        canonical: CanonicalSize {
            width: 320,
            height: 180,
        },
        output: OutputPolicy::PerRequest {
            dir: out.to_path_buf(),
        },
        ..MeasureConfig::default()
    })
    .expect("small config is valid")
}

fn jpeg_count(dir: &Path) -> usize {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "jpg"))
                .count()
        })
        .unwrap_or(0)
}

#[test]
fn solid_white_frame_is_one_full_contour() {
    let dir = temp_dir("white");
    let out = dir.join("processed");
    let input = write_png(&dir, "white.png", &GrayImage::from_pixel(1920, 1080, Luma([255])));

    let m = engine(&out).measure(&input, 128).expect("measures");
    assert_eq!(m.contour_count, 1);
    assert_eq!(m.pixel_area, 1919.0 * 1079.0);
    assert!((m.area_units - 207.0601).abs() < 1e-6);
    assert_eq!(m.bounding_box, Some((0, 0, 1919, 1079)));
    assert!(m.output_path.is_file());

    let written = image::open(&m.output_path).expect("output decodes");
    assert_eq!((written.width(), written.height()), (1920, 1080));
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn known_rectangle_area() {
    let dir = temp_dir("rect");
    let out = dir.join("processed");
    let input = write_png(&dir, "rect.png", &block_image(1920, 1080, (300, 600), (200, 400)));

    let m = engine(&out).measure(&input, 128).expect("measures");
    assert_eq!(m.scale.pixels_per_unit(), 100.0);
    assert_eq!(m.pixel_area, 300.0 * 200.0);
    assert!((m.area_units - 6.0).abs() < 1e-9);
    assert_eq!(m.bounding_box, Some((300, 200, 600, 400)));
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn largest_of_several_objects_wins() {
    let dir = temp_dir("largest");
    let out = dir.join("processed");
    let mut image = block_image(1920, 1080, (100, 150), (100, 150));
    for y in 500..=800 {
        for x in 900..=1300 {
            image.put_pixel(x, y, Luma([200]));
        }
    }
    let input = write_png(&dir, "two.png", &image);

    let m = engine(&out).measure(&input, 128).expect("measures");
    assert_eq!(m.contour_count, 2);
    assert_eq!(m.pixel_area, 400.0 * 300.0);
    assert!((m.area_units - 12.0).abs() < 1e-9);
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn all_black_gives_zero_area_and_still_writes() {
    let dir = temp_dir("black");
    let out = dir.join("processed");
    let input = write_png(&dir, "black.png", &GrayImage::new(1920, 1080));

    let m = engine(&out).measure(&input, 128).expect("measures");
    assert_eq!(m.area_units, 0.0);
    assert_eq!(m.contour_count, 0);
    assert!(m.contour.is_none());
    assert!(m.bounding_box.is_none());
    assert!(m.output_path.is_file());

    // The grid is still drawn: column 0 is a grid line, (50, 50) is not
    let written = image::open(&m.output_path).expect("output decodes").to_luma8();
    let on_grid = written.get_pixel(0, 57)[0];
    let off_grid = written.get_pixel(50, 50)[0];
    assert!(on_grid > off_grid + 20, "grid {on_grid} vs background {off_grid}");
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn invalid_threshold_does_no_io() {
    let dir = temp_dir("threshold");
    let out = dir.join("processed");
    let input = write_png(&dir, "white.png", &GrayImage::from_pixel(32, 32, Luma([255])));
    let measurer = engine(&out);

    for bad in [-1, 256, 300] {
        let err = measurer.measure(&input, bad).unwrap_err();
        assert!(matches!(err, MeasureError::InvalidThreshold(t) if t == bad));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
    assert!(!out.exists());
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn missing_input_is_decode_error_without_output() {
    let dir = temp_dir("missing");
    let out = dir.join("processed");

    let err = engine(&out).measure(dir.join("nope.png"), 128).unwrap_err();
    assert!(matches!(
        err,
        MeasureError::Decode {
            source: DecodeFailure::NotFound,
            ..
        }
    ));
    assert!(!out.exists());

    let err = measure(dir.join("nope.png"), 128).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn undecodable_input_is_decode_error() {
    let dir = temp_dir("garbage");
    let out = dir.join("processed");
    let input = dir.join("notes.png");
    fs::write(&input, b"this is not an image").expect("write");

    let err = engine(&out).measure(&input, 128).unwrap_err();
    assert!(matches!(
        err,
        MeasureError::Decode {
            source: DecodeFailure::Image(_),
            ..
        }
    ));
    assert_eq!(jpeg_count(&out), 0);
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn non_canonical_input_is_stretched() {
    let dir = temp_dir("stretch");
    let out = dir.join("processed");
    // Half resolution, so every dimension doubles on the way in.
    let input = write_png(&dir, "half.png", &block_image(960, 540, (150, 300), (100, 200)));

    let m = engine(&out).measure(&input, 128).expect("measures");
    assert!((m.area_units - 6.05).abs() < 0.2, "area {}", m.area_units);
    let written = image::open(&m.output_path).expect("output decodes");
    assert_eq!((written.width(), written.height()), (1920, 1080));
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn higher_threshold_never_grows_the_area() {
    let dir = temp_dir("sweep");
    let out = dir.join("processed");
    let radial = GrayImage::from_fn(320, 180, |x, y| {
        let dx = x as f64 - 160.0;
        let dy = y as f64 - 90.0;
        let d = (dx * dx + dy * dy).sqrt();
        Luma([(255.0 - d * 2.5).clamp(0.0, 255.0) as u8])
    });
    let input = write_png(&dir, "radial.png", &radial);

    let areas = small_engine(&out)
        .sweep(&input, (0..=255).step_by(15))
        .expect("sweeps");
    assert_eq!(areas.len(), 18);
    assert!(areas.windows(2).all(|w| w[0].0 < w[1].0 && w[0].1 >= w[1].1));
    assert!(areas[0].1 > areas[areas.len() - 1].1);
    assert!(!out.exists());
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn concurrent_measurements_get_distinct_outputs() {
    let dir = temp_dir("concurrent");
    let out = dir.join("processed");
    let input = write_png(&dir, "block.png", &block_image(320, 180, (10, 110), (10, 60)));
    let measurer = small_engine(&out);

    let paths: Vec<PathBuf> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| measurer.measure(&input, 128).expect("measures").output_path))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("thread panicked"))
            .collect()
    });

    let mut unique = paths.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 4);
    assert_eq!(jpeg_count(&out), 4);
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn fixed_output_is_overwritten() {
    let dir = temp_dir("fixed");
    let target = dir.join("processed").join("combined.jpg");
    let measurer = Measurer::new(MeasureConfig {
        canonical: CanonicalSize {
            width: 320,
            height: 180,
        },
        output: OutputPolicy::Fixed {
            path: target.clone(),
        },
        ..MeasureConfig::default()
    })
    .expect("valid config");
    let input = write_png(&dir, "block.png", &block_image(320, 180, (10, 110), (10, 60)));

    let first = measurer.measure(&input, 128).expect("measures");
    let second = measurer.measure(&input, 64).expect("measures");
    assert_eq!(first.output_path, target);
    assert_eq!(second.output_path, target);
    assert_eq!(jpeg_count(&dir.join("processed")), 1);
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn mask_dump_is_written_when_enabled() {
    let dir = temp_dir("dump");
    let out = dir.join("processed");
    let measurer = Measurer::new(MeasureConfig {
        canonical: CanonicalSize {
            width: 320,
            height: 180,
        },
        output: OutputPolicy::PerRequest { dir: out.clone() },
        dump_mask: true,
        ..MeasureConfig::default()
    })
    .expect("valid config");
    let input = write_png(&dir, "block.png", &block_image(320, 180, (10, 110), (10, 60)));

    let m = measurer.measure(&input, 128).expect("measures");
    let mask = image::open(m.output_path.with_extension("mask.png"))
        .expect("mask decodes")
        .to_luma8();
    assert_eq!(mask.get_pixel(50, 30)[0], 255);
    assert_eq!(mask.get_pixel(200, 150)[0], 0);
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn report_serializes_without_contour_points() {
    let dir = temp_dir("json");
    let out = dir.join("processed");
    let input = write_png(&dir, "block.png", &block_image(320, 180, (10, 110), (10, 60)));

    let m = small_engine(&out).measure(&input, 128).expect("measures");
    let value = serde_json::to_value(&m).expect("serializes");
    assert_eq!(value["threshold"], 128);
    assert_eq!(value["contour_count"], 1);
    assert!(value["area_units"].as_f64().is_some());
    assert!(value.get("contour").is_none());
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn workspace_upload_then_rethreshold() {
    let dir = temp_dir("workspace");
    let source = write_png(
        &dir,
        "leaf photo.png",
        &block_image(1920, 1080, (300, 600), (200, 400)),
    );
    let workspace = Workspace::open(dir.join("ws"), MeasureConfig::default()).expect("opens");

    let name = workspace.ingest(&source).expect("ingests");
    assert_eq!(name, "leaf_photo.png");
    assert!(workspace.uploads_dir().join(&name).is_file());

    let first = workspace.measure_upload(&name, 128).expect("measures");
    let second = workspace.measure_upload(&name, 250).expect("re-measures");
    assert!((first.area_units - 6.0).abs() < 1e-9);
    assert!((second.area_units - 6.0).abs() < 1e-9);
    assert_ne!(first.output_path, second.output_path);
    assert!(second.output_path.starts_with(workspace.processed_dir()));
    assert!(!first.output_path.exists());
    assert!(second.output_path.is_file());
    assert_eq!(jpeg_count(workspace.processed_dir()), 1);

    let err = workspace.measure_upload("../leaf_photo.png", 128).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    let err = workspace.measure_upload("absent.png", 128).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn repeated_rethreshold_keeps_only_latest_output() {
    let dir = temp_dir("rethreshold");
    let small = MeasureConfig {
        canonical: CanonicalSize {
            width: 320,
            height: 180,
        },
        ..MeasureConfig::default()
    };
    let workspace = Workspace::open(dir.join("ws"), small).expect("opens");
    let other = write_png(&dir, "other.png", &block_image(320, 180, (5, 50), (5, 50)));
    let other_name = workspace.ingest(&other).expect("ingests");
    let kept = workspace.measure_upload(&other_name, 128).expect("measures");

    let source = write_png(&dir, "leaf.png", &block_image(320, 180, (10, 110), (10, 60)));
    let name = workspace.ingest(&source).expect("ingests");
    let mut latest = None;
    for threshold in [40, 60, 80, 100, 120, 140, 160, 180] {
        latest = Some(workspace.measure_upload(&name, threshold).expect("measures"));
    }

    let latest = latest.expect("measured at least once");
    assert_eq!(latest.threshold, 180);
    assert!(latest.output_path.is_file());
    assert!(kept.output_path.is_file());
    assert_eq!(jpeg_count(workspace.processed_dir()), 2);
    let _ = fs::remove_dir_all(dir);
}
