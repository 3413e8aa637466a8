//! Core logo cleanup engine.

use std::fmt::Write as _;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbImage};
use tracing::{debug, warn};

use crate::binarize::{self, PROFILE_THRESHOLD};
use crate::components::{self, Component};
use crate::composite::{self, Strategy};
use crate::error::{DetectorError, Error, Result};
use crate::geometry::{Rect, SafeZone};
use crate::profile::{self, RowProfile, PROFILE_BAND};
use crate::safe_zone::{self, ZoneEvidence};
use crate::suppress::{self, BoundaryHint, SuppressionContext};
use crate::text::{TextBox, TextRegionDetector};

/// Options controlling cleanup behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CleanOptions {
    /// How the area outside the safe zone is removed.
    pub strategy: Strategy,
}

/// What happened to the text detector call.
#[derive(Debug, Clone)]
pub enum DetectorOutcome {
    /// No detector is attached to the engine.
    NotConfigured,
    /// The detector answered with this many merged boxes.
    Detected(usize),
    /// The detector failed or timed out; the pipeline ran without text hints.
    Failed(DetectorError),
}

/// Pixel- and text-derived evidence behind one safe zone.
#[derive(Debug, Clone)]
pub struct SafeZoneAnalysis {
    /// The final safe zone.
    pub safe_zone: SafeZone,
    /// The chosen logo component, if any qualified.
    pub candidate: Option<Component>,
    /// Whether no component qualified and the centre third was used instead.
    pub used_center_fallback: bool,
    /// Candidate plus companion components; suppression hints never cut into it.
    pub artwork: Option<Rect>,
    /// Baseline vertical window from the row profile.
    pub profile_window: (u32, u32),
    /// Text lines fused into the zone.
    pub text_lines: Vec<TextBox>,
    /// Every boundary hint the suppression passes proposed.
    pub hints: Vec<BoundaryHint>,
    /// Hints that moved an edge.
    pub applied_hints: Vec<BoundaryHint>,
}

/// Diagnostics for one [`CleanupEngine::clean_with_report`] call.
#[derive(Debug, Clone)]
pub struct CleanReport {
    /// Safe-zone analysis.
    pub analysis: SafeZoneAnalysis,
    /// Text detector outcome.
    pub detector: DetectorOutcome,
    /// Text boxes handed to the analysis.
    pub text_boxes: Vec<TextBox>,
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// Whether processing succeeded.
    pub success: bool,
    /// The safe zone that was kept, on success.
    pub safe_zone: Option<SafeZone>,
    /// Whether the centre-third fallback was used.
    pub used_center_fallback: bool,
    /// Human-readable status message.
    pub message: String,
}

impl ProcessResult {
    fn failed(path: &Path, message: String) -> Self {
        Self {
            path: path.to_path_buf(),
            success: false,
            safe_zone: None,
            used_center_fallback: false,
            message,
        }
    }
}

/// The cleanup engine.
///
/// Holds the optional text detector; everything else is computed per image,
/// so one engine can be shared across threads and reused for many images.
#[derive(Debug, Clone, Default)]
pub struct CleanupEngine {
    detector: Option<TextRegionDetector>,
}

impl CleanupEngine {
    /// An engine that relies on pixel statistics only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine that also consults a text detector.
    #[must_use]
    pub fn with_detector(detector: TextRegionDetector) -> Self {
        Self {
            detector: Some(detector),
        }
    }

    /// The attached detector, if any.
    #[must_use]
    pub fn detector(&self) -> Option<&TextRegionDetector> {
        self.detector.as_ref()
    }

    /// Run the text detector, degrading to no boxes on any failure.
    #[must_use]
    pub fn detect_text(&self, image: &RgbImage) -> (Vec<TextBox>, DetectorOutcome) {
        let Some(detector) = &self.detector else {
            return (Vec::new(), DetectorOutcome::NotConfigured);
        };
        match detector.detect(image) {
            Ok(boxes) => {
                let n = boxes.len();
                (boxes, DetectorOutcome::Detected(n))
            }
            Err(e) => {
                warn!(error = %e, "text detection unavailable, continuing without text hints");
                (Vec::new(), DetectorOutcome::Failed(e))
            }
        }
    }

    /// Locate the safe zone in an opaque RGB image given its text boxes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegenerateInput`] if the image has a zero dimension.
    pub fn detect_safe_zone(&self, image: &RgbImage, text_boxes: &[TextBox]) -> Result<SafeZoneAnalysis> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(Error::DegenerateInput {
                width: w,
                height: h,
            });
        }

        let grey = binarize::to_grey(image);

        let component_mask = binarize::component_mask(&grey);
        let components = components::label_components(&component_mask);
        let candidate = components::select_logo_candidate(&components, w, h);
        debug!(
            components = components.len(),
            candidate = ?candidate.map(|c| c.bbox),
            "components labelled"
        );

        let profile_mask = binarize::binarize(&grey, PROFILE_THRESHOLD);
        let profile = RowProfile::compute_band(&profile_mask, PROFILE_BAND)
            .smoothed(profile::smoothing_window(h));
        let window = profile::best_window(&profile.scores(), h);
        debug!(?window, "profile window");

        let ctx = SuppressionContext {
            rgb: image,
            grey: &grey,
            profile_mask: &profile_mask,
            text_boxes,
        };
        let hints = suppress::collect_hints(&ctx);

        let assembly = safe_zone::assemble(&ZoneEvidence {
            width: w,
            height: h,
            candidate,
            components: &components,
            text_boxes,
            window,
            hints: &hints,
            growth_mask: &component_mask,
        });

        Ok(SafeZoneAnalysis {
            safe_zone: assembly.zone,
            candidate: candidate.cloned(),
            used_center_fallback: assembly.used_center_fallback,
            artwork: assembly.artwork,
            profile_window: window,
            text_lines: assembly.text_lines,
            hints,
            applied_hints: assembly.applied_hints,
        })
    }

    /// Clean an image and return diagnostics alongside the result.
    ///
    /// Any alpha channel is composited over white first; the output is opaque
    /// RGB with the input's dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegenerateInput`] if the image has a zero dimension.
    /// Text detector failures are never returned.
    pub fn clean_with_report(
        &self,
        image: &DynamicImage,
        opts: &CleanOptions,
    ) -> Result<(RgbImage, CleanReport)> {
        if image.width() == 0 || image.height() == 0 {
            return Err(Error::DegenerateInput {
                width: image.width(),
                height: image.height(),
            });
        }

        let rgb = binarize::flatten_to_rgb(image);
        let (text_boxes, detector) = self.detect_text(&rgb);
        let analysis = self.detect_safe_zone(&rgb, &text_boxes)?;
        let cleaned = composite::composite(&rgb, &analysis.safe_zone, &opts.strategy);

        Ok((
            cleaned,
            CleanReport {
                analysis,
                detector,
                text_boxes,
            },
        ))
    }

    /// Clean an image, removing everything outside the detected safe zone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegenerateInput`] if the image has a zero dimension.
    pub fn clean(&self, image: &DynamicImage, opts: &CleanOptions) -> Result<RgbImage> {
        self.clean_with_report(image, opts).map(|(img, _)| img)
    }

    /// Process a single image file: load, clean, save.
    #[must_use]
    pub fn process_file(&self, input: &Path, output: &Path, opts: &CleanOptions) -> ProcessResult {
        let dyn_img = match image::open(input) {
            Ok(img) => img,
            Err(e) => return ProcessResult::failed(input, format!("Failed to load: {e}")),
        };

        let (cleaned, report) = match self.clean_with_report(&dyn_img, opts) {
            Ok(out) => out,
            Err(e) => return ProcessResult::failed(input, format!("Failed to clean: {e}")),
        };

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    return ProcessResult::failed(
                        input,
                        format!("Failed to create output directory: {e}"),
                    );
                }
            }
        }

        if let Err(e) = save_image(&cleaned, output) {
            return ProcessResult::failed(input, format!("Failed to save: {e}"));
        }

        let zone = report.analysis.safe_zone;
        let mut message = format!(
            "Kept {}x{} at ({}, {})",
            zone.x2() - zone.x(),
            zone.y2() - zone.y(),
            zone.x(),
            zone.y()
        );
        if report.analysis.used_center_fallback {
            message.push_str(", no logo component found");
        }
        if let DetectorOutcome::Failed(e) = &report.detector {
            // writing into a String cannot fail
            let _ = write!(message, ", {e}");
        }

        ProcessResult {
            path: input.to_path_buf(),
            success: true,
            safe_zone: Some(zone),
            used_center_fallback: report.analysis.used_center_fallback,
            message,
        }
    }

    /// Process all supported images in a directory.
    ///
    /// Uses parallel iteration when the `cli` feature is enabled (via rayon).
    /// Returns a [`ProcessResult`] for each image found.
    #[must_use]
    pub fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        opts: &CleanOptions,
    ) -> Vec<ProcessResult> {
        let entries: Vec<PathBuf> = match std::fs::read_dir(input_dir) {
            Ok(rd) => rd
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                .map(|e| e.path())
                .filter(|p| is_supported_image(p))
                .collect(),
            Err(e) => {
                return vec![ProcessResult::failed(
                    input_dir,
                    format!("Failed to read directory: {e}"),
                )];
            }
        };

        if !output_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(output_dir) {
                return vec![ProcessResult::failed(
                    output_dir,
                    format!("Failed to create output directory: {e}"),
                )];
            }
        }

        let run = |input_path: &PathBuf| match input_path.file_name() {
            Some(filename) => self.process_file(input_path, &output_dir.join(filename), opts),
            None => ProcessResult::failed(input_path, "Path has no file name".to_string()),
        };

        #[cfg(feature = "cli")]
        {
            use rayon::prelude::*;
            entries.par_iter().map(run).collect()
        }

        #[cfg(not(feature = "cli"))]
        {
            entries.iter().map(run).collect()
        }
    }
}

/// Extensions the engine reads and writes, with the format each one maps to.
const OUTPUT_FORMATS: [(&str, ImageFormat); 5] = [
    ("png", ImageFormat::Png),
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("webp", ImageFormat::WebP),
    ("bmp", ImageFormat::Bmp),
];

/// JPEG output is written at full quality so cleanup adds no new artifacts.
const JPEG_QUALITY: u8 = 100;

/// Format for a path, judged by its extension (case-insensitive).
fn output_format(path: &Path) -> Option<ImageFormat> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    OUTPUT_FORMATS
        .iter()
        .find(|(name, _)| *name == ext)
        .map(|&(_, format)| format)
}

/// Check if a file has an extension the engine can read and write.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    output_format(path).is_some()
}

/// Save a cleaned image, picking the encoder from the file extension.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] for extensions outside the supported
/// set, and [`Error::Io`] or [`Error::Image`] if writing fails.
pub fn save_image(img: &RgbImage, path: &Path) -> Result<()> {
    let format = output_format(path)
        .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))?;

    if format == ImageFormat::Jpeg {
        let writer = BufWriter::new(File::create(path)?);
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(writer, JPEG_QUALITY);
        img.write_with_encoder(encoder)?;
    } else {
        img.save_with_format(path, format)?;
    }
    debug!(path = %path.display(), ?format, "cleaned image saved");
    Ok(())
}

/// Output path next to the input, with `_clean` appended to the stem.
///
/// Inputs without an extension get a `.png` output.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let ext = input
        .extension()
        .map_or_else(|| "png".into(), |e| e.to_string_lossy());
    input.with_file_name(format!("{stem}_clean.{ext}"))
}
