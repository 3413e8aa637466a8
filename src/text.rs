//! Text region detection adapter and line-level box merging.
//!
//! The OCR engine itself is an external collaborator behind [`TextDetector`].
//! This module validates its loosely-typed output, runs the two segmentation
//! passes under a hard timeout, and clusters word/line fragments into
//! line-level [`TextBox`]es.

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use image::{imageops, RgbImage};
use tracing::debug;

use crate::error::DetectorError;
use crate::geometry::Rect;

/// Default hard timeout for one detection (both passes).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3500);
/// Default maximum width handed to the detector.
pub const DEFAULT_MAX_WIDTH: u32 = 1024;
/// Merge tolerance used when combining the two detector passes.
pub const PASS_MERGE_TOLERANCE: u32 = 4;

/// A text region in full-resolution pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub w: u32,
    /// Height in pixels.
    pub h: u32,
    /// Recognition confidence in `[0, 1]`.
    pub confidence: f32,
    /// Recognised text, trimmed.
    pub text: String,
}

impl TextBox {
    /// Convenience constructor.
    #[must_use]
    pub fn new(x: u32, y: u32, w: u32, h: u32, confidence: f32, text: impl Into<String>) -> Self {
        Self {
            x,
            y,
            w,
            h,
            confidence,
            text: text.into(),
        }
    }

    /// The box as a half-open rectangle.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::from_xywh(self.x, self.y, self.w, self.h)
    }

    /// Bottom edge (exclusive).
    #[must_use]
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }

    /// Scale coordinates by `factor`, rounding to the nearest pixel.
    #[must_use]
    pub fn scaled(&self, factor: f32) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let s = |v: u32| (v as f32 * factor).round().max(0.0) as u32;
        Self {
            x: s(self.x),
            y: s(self.y),
            w: s(self.w),
            h: s(self.h),
            confidence: self.confidence,
            text: self.text.clone(),
        }
    }
}

/// One word or line record as an OCR backend reports it.
///
/// Backends disagree on confidence scale (0–1 or 0–100) and may omit fields;
/// [`RawTextRecord::normalize`] turns a record into a [`TextBox`] or rejects it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTextRecord {
    /// Left edge.
    pub x0: f32,
    /// Top edge.
    pub y0: f32,
    /// Right edge.
    pub x1: f32,
    /// Bottom edge.
    pub y1: f32,
    /// Confidence on either a 0–1 or a 0–100 scale.
    pub confidence: Option<f32>,
    /// Recognised text, if any.
    pub text: Option<String>,
}

impl RawTextRecord {
    /// Validate and convert into a [`TextBox`].
    ///
    /// Returns `None` for non-finite coordinates or boxes with no area.
    #[must_use]
    pub fn normalize(&self) -> Option<TextBox> {
        let coords = [self.x0, self.y0, self.x1, self.y1];
        if coords.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let (x0, x1) = (self.x0.min(self.x1).max(0.0), self.x0.max(self.x1).max(0.0));
        let (y0, y1) = (self.y0.min(self.y1).max(0.0), self.y0.max(self.y1).max(0.0));
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (x, y, w, h) = (
            x0.round() as u32,
            y0.round() as u32,
            (x1 - x0).round() as u32,
            (y1 - y0).round() as u32,
        );
        if w == 0 || h == 0 {
            return None;
        }

        let confidence = match self.confidence {
            Some(c) if c.is_finite() && c > 1.0 => (c / 100.0).clamp(0.0, 1.0),
            Some(c) if c.is_finite() => c.max(0.0),
            _ => 0.0,
        };
        let text = self.text.as_deref().unwrap_or_default().trim().to_string();

        Some(TextBox {
            x,
            y,
            w,
            h,
            confidence,
            text,
        })
    }
}

/// Page segmentation assumption for one detector pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentationMode {
    /// Treat the image as one uniform block of text (dense captions).
    SingleBlock,
    /// Find as much scattered text as possible (watermark fragments).
    SparseText,
}

/// An external OCR engine.
///
/// Implementations are owned by the caller, shared through an [`Arc`], and
/// must tolerate being called from a worker thread. A call that is abandoned
/// on timeout still runs to completion; its result is discarded.
pub trait TextDetector: Send + Sync {
    /// Recognise words and lines in `image` under the given segmentation mode.
    ///
    /// # Errors
    ///
    /// Returns a [`DetectorError`] when the backend cannot produce a result.
    fn recognize(
        &self,
        image: &RgbImage,
        mode: SegmentationMode,
    ) -> Result<Vec<RawTextRecord>, DetectorError>;
}

/// Options for [`TextRegionDetector`].
#[derive(Debug, Clone)]
pub struct DetectorOptions {
    /// Hard limit for both passes together.
    pub timeout: Duration,
    /// Images wider than this are downsampled before detection.
    pub max_width: u32,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_width: DEFAULT_MAX_WIDTH,
        }
    }
}

/// Runs a [`TextDetector`] in dual-pass mode under a timeout.
#[derive(Clone)]
pub struct TextRegionDetector {
    backend: Arc<dyn TextDetector>,
    options: DetectorOptions,
}

impl std::fmt::Debug for TextRegionDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRegionDetector")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl TextRegionDetector {
    /// Wrap a backend with default options.
    #[must_use]
    pub fn new(backend: Arc<dyn TextDetector>) -> Self {
        Self::with_options(backend, DetectorOptions::default())
    }

    /// Wrap a backend with explicit options.
    #[must_use]
    pub fn with_options(backend: Arc<dyn TextDetector>, options: DetectorOptions) -> Self {
        Self { backend, options }
    }

    /// The configured options.
    #[must_use]
    pub fn options(&self) -> &DetectorOptions {
        &self.options
    }

    /// Detect text boxes in `image`, returned in full-resolution coordinates.
    ///
    /// Both segmentation passes run on a worker thread over a copy downsampled
    /// to at most `max_width`; their results are merged with a 4px tolerance
    /// and scaled back up.
    ///
    /// # Errors
    ///
    /// Returns [`DetectorError::Timeout`] if the passes do not finish in time,
    /// or the backend's own error.
    pub fn detect(&self, image: &RgbImage) -> Result<Vec<TextBox>, DetectorError> {
        let (small, scale) = downsample_for_detection(image, self.options.max_width);

        let (tx, rx) = mpsc::channel();
        let backend = Arc::clone(&self.backend);
        thread::Builder::new()
            .name("text-detector".into())
            .spawn(move || {
                // the receiver may be gone after a timeout
                let _ = tx.send(run_passes(backend.as_ref(), &small));
            })
            .map_err(|e| DetectorError::Unavailable(e.to_string()))?;

        let boxes = match rx.recv_timeout(self.options.timeout) {
            Ok(result) => result?,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                return Err(DetectorError::Timeout(self.options.timeout))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => return Err(DetectorError::WorkerLost),
        };

        debug!(count = boxes.len(), scale, "text detection finished");
        Ok(boxes.iter().map(|b| b.scaled(scale)).collect())
    }
}

fn run_passes(backend: &dyn TextDetector, image: &RgbImage) -> Result<Vec<TextBox>, DetectorError> {
    let mut all = Vec::new();
    for mode in [SegmentationMode::SingleBlock, SegmentationMode::SparseText] {
        let records = backend.recognize(image, mode)?;
        all.extend(records.iter().filter_map(RawTextRecord::normalize));
    }
    Ok(merge_boxes(&all, PASS_MERGE_TOLERANCE))
}

/// Downsample to at most `max_width`, returning the image and the factor that
/// maps its coordinates back to the original.
#[must_use]
pub fn downsample_for_detection(image: &RgbImage, max_width: u32) -> (RgbImage, f32) {
    let width = image.width();
    if max_width == 0 || width <= max_width {
        return (image.clone(), 1.0);
    }
    let target_h = u64::from(image.height()) * u64::from(max_width) / u64::from(width);
    let target_h = u32::try_from(target_h).unwrap_or(u32::MAX).max(1);
    let small = imageops::resize(image, max_width, target_h, imageops::FilterType::Triangle);
    #[allow(clippy::cast_precision_loss)]
    let scale = width as f32 / max_width as f32;
    (small, scale)
}

/// Cluster boxes whose tolerance-expanded rectangles overlap.
///
/// Each output box is the union of one cluster, with the maximum confidence
/// and the members' distinct non-empty texts joined by spaces in input order. Clusters
/// are recomputed until stable, so merging an already merged set is a no-op
/// and the output rectangles do not depend on input order.
#[must_use]
pub fn merge_boxes(boxes: &[TextBox], tol: u32) -> Vec<TextBox> {
    let mut current = boxes.to_vec();
    loop {
        let merged = merge_pass(&current, tol);
        if merged.len() == current.len() {
            return merged;
        }
        current = merged;
    }
}

fn merge_pass(boxes: &[TextBox], tol: u32) -> Vec<TextBox> {
    let rects: Vec<Rect> = boxes.iter().map(TextBox::rect).collect();
    let mut used = vec![false; boxes.len()];
    let mut out = Vec::new();

    for start in 0..boxes.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let mut members = vec![start];
        let mut stack = vec![start];
        while let Some(cur) = stack.pop() {
            for j in 0..boxes.len() {
                if !used[j] && rects[cur].overlaps_with_tolerance(&rects[j], tol) {
                    used[j] = true;
                    members.push(j);
                    stack.push(j);
                }
            }
        }
        members.sort_unstable();

        let mut bounds = rects[members[0]];
        let mut confidence = boxes[members[0]].confidence;
        let mut texts: Vec<&str> = Vec::new();
        for &m in &members {
            bounds = bounds.union(&rects[m]);
            confidence = confidence.max(boxes[m].confidence);
            let text = boxes[m].text.as_str();
            if !text.is_empty() && !texts.contains(&text) {
                texts.push(text);
            }
        }

        out.push(TextBox {
            x: bounds.x,
            y: bounds.y,
            w: bounds.width(),
            h: bounds.height(),
            confidence,
            text: texts.join(" "),
        });
    }

    out
}
