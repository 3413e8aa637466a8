use std::sync::Arc;
use std::thread;
use std::time::Duration;

use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use logo_cleanup::geometry::min_safe_height;
use logo_cleanup::suppress::{Edge, HintSource};
use logo_cleanup::{
    CleanOptions, CleanupEngine, DetectorError, DetectorOptions, DetectorOutcome, Error,
    RawTextRecord, SafeZone, SegmentationMode, Strategy, TextDetector, TextRegionDetector,
};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

fn fill(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    for yy in y..y + h {
        for xx in x..x + w {
            img.put_pixel(xx, yy, color);
        }
    }
}

/// White 512x512 canvas with a 300x80 black logo block.
fn logo_canvas() -> RgbImage {
    let mut img = RgbImage::from_pixel(512, 512, WHITE);
    fill(&mut img, 106, 216, 300, 80, BLACK);
    img
}

fn assert_zone_invariants(zone: &SafeZone, w: u32, h: u32) {
    assert!(zone.x() < zone.x2() && zone.x2() <= w, "bad x-extent: {zone:?}");
    assert!(zone.y() < zone.y2() && zone.y2() <= h, "bad y-extent: {zone:?}");
    assert!(
        zone.y2() - zone.y() >= min_safe_height(h),
        "zone shorter than minimum: {zone:?}"
    );
}

struct FixedDetector(Vec<RawTextRecord>);

impl TextDetector for FixedDetector {
    fn recognize(
        &self,
        _image: &RgbImage,
        _mode: SegmentationMode,
    ) -> Result<Vec<RawTextRecord>, DetectorError> {
        Ok(self.0.clone())
    }
}

struct SlowDetector(Duration);

impl TextDetector for SlowDetector {
    fn recognize(
        &self,
        _image: &RgbImage,
        _mode: SegmentationMode,
    ) -> Result<Vec<RawTextRecord>, DetectorError> {
        thread::sleep(self.0);
        Ok(Vec::new())
    }
}

struct BrokenDetector;

impl TextDetector for BrokenDetector {
    fn recognize(
        &self,
        _image: &RgbImage,
        _mode: SegmentationMode,
    ) -> Result<Vec<RawTextRecord>, DetectorError> {
        Err(DetectorError::Unavailable("no language data".into()))
    }
}

#[test]
fn centered_logo_is_kept_and_surroundings_untouched() {
    let engine = CleanupEngine::new();
    let img = logo_canvas();

    let analysis = engine.detect_safe_zone(&img, &[]).unwrap();
    let zone = analysis.safe_zone;
    assert!(!analysis.used_center_fallback);
    assert_zone_invariants(&zone, 512, 512);

    assert!(zone.x() <= 106 && zone.x2() >= 406, "logo cut horizontally: {zone:?}");
    assert!(zone.y() <= 216 && zone.y2() >= 296, "logo cut vertically: {zone:?}");
    assert!(zone.x() >= 60 && zone.x2() <= 452, "zone too loose: {zone:?}");
    assert!(zone.y() >= 150 && zone.y2() <= 360, "zone too loose: {zone:?}");
}

#[test]
fn hard_repaint_on_clean_canvas_is_identity() {
    let engine = CleanupEngine::new();
    let img = logo_canvas();
    let opts = CleanOptions {
        strategy: Strategy::hard(),
    };

    let out = engine
        .clean(&DynamicImage::ImageRgb8(img.clone()), &opts)
        .unwrap();
    assert_eq!(out.dimensions(), (512, 512));
    assert_eq!(out, img);
}

#[test]
fn feathered_keeps_logo_dark_and_border_white() {
    let engine = CleanupEngine::new();
    let out = engine
        .clean(
            &DynamicImage::ImageRgb8(logo_canvas()),
            &CleanOptions::default(),
        )
        .unwrap();

    assert_eq!(out.dimensions(), (512, 512));
    assert!(out.get_pixel(256, 256)[0] < 16);
    assert_eq!(*out.get_pixel(0, 0), WHITE);
    assert_eq!(*out.get_pixel(511, 511), WHITE);
    assert_eq!(*out.get_pixel(256, 480), WHITE);
}

#[test]
fn watermark_caption_below_logo_is_cut() {
    // logo sits low enough that its padded zone would swallow the caption
    let mut img = RgbImage::from_pixel(512, 512, WHITE);
    fill(&mut img, 106, 250, 300, 200, BLACK);
    fill(&mut img, 50, 470, 400, 30, BLACK);

    let detector = TextRegionDetector::new(Arc::new(FixedDetector(vec![RawTextRecord {
        x0: 50.0,
        y0: 470.0,
        x1: 450.0,
        y1: 500.0,
        confidence: Some(90.0),
        text: Some("WATERMARK.AI".into()),
    }])));
    let engine = CleanupEngine::with_detector(detector);
    let opts = CleanOptions {
        strategy: Strategy::hard(),
    };

    let (out, report) = engine
        .clean_with_report(&DynamicImage::ImageRgb8(img), &opts)
        .unwrap();

    assert!(matches!(report.detector, DetectorOutcome::Detected(1)));
    assert_eq!(report.text_boxes.len(), 1);
    assert_eq!(report.text_boxes[0].text, "WATERMARK.AI");

    let analysis = &report.analysis;
    assert!(analysis
        .hints
        .iter()
        .any(|h| h.source == HintSource::WideCaptionText && h.cut_at == 470 - 6));
    assert!(
        analysis
            .applied_hints
            .iter()
            .any(|h| h.edge == Edge::Bottom && h.cut_at == 470 - 6),
        "caption hint not applied: {:?}",
        analysis.applied_hints
    );

    let zone = analysis.safe_zone;
    assert_zone_invariants(&zone, 512, 512);
    assert_eq!(zone.y2(), 470 - 6, "{zone:?}");

    assert_eq!(*out.get_pixel(250, 485), WHITE);
    assert_eq!(*out.get_pixel(256, 449), BLACK);
    assert_eq!(*out.get_pixel(256, 256), BLACK);
}

#[test]
fn tall_logo_survives_caption_and_strip_passes() {
    // spans rows above 30% and below 60% of the height
    let mut img = RgbImage::from_pixel(512, 512, WHITE);
    fill(&mut img, 106, 106, 300, 300, BLACK);
    let opts = CleanOptions {
        strategy: Strategy::hard(),
    };

    let (out, report) = CleanupEngine::new()
        .clean_with_report(&DynamicImage::ImageRgb8(img.clone()), &opts)
        .unwrap();

    let zone = report.analysis.safe_zone;
    assert!(zone.y() <= 106 && zone.y2() >= 406, "{zone:?}");
    assert!(report.analysis.applied_hints.is_empty());
    assert_eq!(out, img);
}

#[test]
fn wordmark_wider_than_icon_is_kept() {
    let mut img = RgbImage::from_pixel(512, 512, WHITE);
    fill(&mut img, 196, 120, 120, 120, BLACK);
    for i in 0..12 {
        fill(&mut img, 80 + i * 30, 300, 20, 40, BLACK);
    }
    let opts = CleanOptions {
        strategy: Strategy::hard(),
    };

    let (out, report) = CleanupEngine::new()
        .clean_with_report(&DynamicImage::ImageRgb8(img.clone()), &opts)
        .unwrap();

    let zone = report.analysis.safe_zone;
    assert!(zone.x() <= 80 && zone.x2() >= 430, "{zone:?}");
    assert!(zone.y() <= 120 && zone.y2() >= 340, "{zone:?}");
    assert_eq!(out, img);
}

#[test]
fn detector_timeout_degrades_to_pixel_only() {
    let detector = TextRegionDetector::with_options(
        Arc::new(SlowDetector(Duration::from_millis(500))),
        DetectorOptions {
            timeout: Duration::from_millis(20),
            ..DetectorOptions::default()
        },
    );
    let engine = CleanupEngine::with_detector(detector);

    let (out, report) = engine
        .clean_with_report(
            &DynamicImage::ImageRgb8(logo_canvas()),
            &CleanOptions::default(),
        )
        .unwrap();

    assert_eq!(out.dimensions(), (512, 512));
    assert!(matches!(
        report.detector,
        DetectorOutcome::Failed(DetectorError::Timeout(_))
    ));
    assert!(report.text_boxes.is_empty());
    assert!(!report.analysis.used_center_fallback);
}

#[test]
fn detector_error_is_not_surfaced() {
    let engine = CleanupEngine::with_detector(TextRegionDetector::new(Arc::new(BrokenDetector)));
    let (_, report) = engine
        .clean_with_report(
            &DynamicImage::ImageRgb8(logo_canvas()),
            &CleanOptions::default(),
        )
        .unwrap();
    assert!(matches!(
        report.detector,
        DetectorOutcome::Failed(DetectorError::Unavailable(_))
    ));
}

#[test]
fn largest_component_wins_over_speck() {
    let mut img = RgbImage::from_pixel(512, 512, WHITE);
    // 100x50 = 5000 px logo, 10x5 = 50 px speck
    fill(&mut img, 206, 200, 100, 50, BLACK);
    fill(&mut img, 150, 150, 10, 5, BLACK);

    let analysis = CleanupEngine::new().detect_safe_zone(&img, &[]).unwrap();
    let candidate = analysis.candidate.expect("logo component");
    assert!(candidate.area >= 5000);
    assert!(candidate.bbox.x <= 206 && candidate.bbox.x2 >= 306);
    assert!(candidate.bbox.y <= 200 && candidate.bbox.y2 >= 250);
    assert!(candidate.bbox.x > 160, "speck merged in: {:?}", candidate.bbox);
}

#[test]
fn blank_image_falls_back_to_center() {
    let engine = CleanupEngine::new();
    let img = RgbImage::from_pixel(300, 200, WHITE);
    let (out, report) = engine
        .clean_with_report(&DynamicImage::ImageRgb8(img.clone()), &CleanOptions::default())
        .unwrap();

    assert!(report.analysis.used_center_fallback);
    assert!(report.analysis.candidate.is_none());
    assert_zone_invariants(&report.analysis.safe_zone, 300, 200);
    assert_eq!(out, img);
}

#[test]
fn transparent_input_is_flattened_to_opaque_rgb() {
    let mut img = RgbaImage::from_pixel(128, 96, Rgba([0, 0, 0, 0]));
    for y in 30..60 {
        for x in 40..90 {
            img.put_pixel(x, y, Rgba([20, 40, 200, 255]));
        }
    }

    let out = CleanupEngine::new()
        .clean(&DynamicImage::ImageRgba8(img), &CleanOptions::default())
        .unwrap();
    assert_eq!(out.dimensions(), (128, 96));
    // transparent pixels become white, not black
    assert_eq!(*out.get_pixel(0, 0), WHITE);
}

#[test]
fn degenerate_input_is_rejected() {
    let engine = CleanupEngine::new();
    let err = engine
        .clean(&DynamicImage::new_rgb8(0, 10), &CleanOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::DegenerateInput { width: 0, height: 10 }));
}

#[test]
fn tiny_images_still_get_a_valid_zone() {
    let engine = CleanupEngine::new();
    for (w, h) in [(1, 1), (3, 40), (40, 3), (47, 47)] {
        let img = RgbImage::from_pixel(w, h, Rgb([90, 90, 90]));
        let analysis = engine.detect_safe_zone(&img, &[]).unwrap();
        assert_zone_invariants(&analysis.safe_zone, w, h);
    }
}

#[test]
fn process_file_writes_cleaned_png() {
    let dir = std::env::temp_dir().join(format!("logo-cleanup-it-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let input = dir.join("logo.png");
    logo_canvas().save(&input).unwrap();
    let output = logo_cleanup::default_output_path(&input);

    let result = CleanupEngine::new().process_file(&input, &output, &CleanOptions::default());
    assert!(result.success, "{}", result.message);
    assert!(result.safe_zone.is_some());

    let written = image::open(&output).unwrap();
    assert_eq!((written.width(), written.height()), (512, 512));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn process_file_reports_missing_input() {
    let result = CleanupEngine::new().process_file(
        std::path::Path::new("/nonexistent/logo.png"),
        std::path::Path::new("/nonexistent/out.png"),
        &CleanOptions::default(),
    );
    assert!(!result.success);
    assert!(result.message.starts_with("Failed to load"));
}

#[test]
fn process_file_notes_detector_failure_in_message() {
    let dir = std::env::temp_dir().join(format!("logo-cleanup-msg-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let input = dir.join("logo.png");
    logo_canvas().save(&input).unwrap();

    let engine = CleanupEngine::with_detector(TextRegionDetector::new(Arc::new(BrokenDetector)));
    let result = engine.process_file(&input, &dir.join("out.png"), &CleanOptions::default());
    assert!(result.success, "{}", result.message);
    assert!(result.message.starts_with("Kept "), "{}", result.message);
    assert!(
        result.message.ends_with(", text detector unavailable: no language data"),
        "{}",
        result.message
    );

    let _ = std::fs::remove_dir_all(&dir);
}
