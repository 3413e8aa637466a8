//! Caption and watermark band detection near the top and bottom edges.
//!
//! Each pass looks at the image independently and proposes where the safe
//! zone should stop on one edge. Passes never modify the zone themselves;
//! the assembler decides which hints it can honour.

use image::{imageops, GrayImage, Rgb, RgbImage};
use tracing::debug;

use crate::binarize::{binarize, luma, InkMask};
use crate::profile::{band_columns, RowProfile, PROFILE_BAND};
use crate::text::{merge_boxes, TextBox};

/// Gap left between a detected band and the safe zone, as a fraction of height.
const MARGIN_FRACTION: f32 = 0.012;

/// Which edge of the safe zone a hint constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    /// The zone must start at or below `cut_at`.
    Top,
    /// The zone must end at or above `cut_at`.
    Bottom,
}

/// The pass that produced a hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HintSource {
    /// Thick caption band from ink density and transitions.
    CaptionBand,
    /// Faint anti-aliased text in the central strip.
    ThinStrip,
    /// Colored micro-watermark found through difference-of-Gaussians energy.
    EdgeEnergy,
    /// Wide detector-reported caption line near the bottom.
    WideCaptionText,
    /// Small detector-reported watermark in a bottom corner.
    CornerWatermarkText,
}

/// A proposed boundary for one edge of the safe zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryHint {
    /// Constrained edge.
    pub edge: Edge,
    /// Row the edge should be moved to (`y` for top, exclusive `y2` for bottom).
    pub cut_at: u32,
    /// Pass that produced the hint.
    pub source: HintSource,
}

/// Shared inputs for every suppression pass.
#[derive(Debug, Clone, Copy)]
pub struct SuppressionContext<'a> {
    /// Opaque RGB image.
    pub rgb: &'a RgbImage,
    /// Greyscale version of `rgb`.
    pub grey: &'a GrayImage,
    /// Unblurred profile mask.
    pub profile_mask: &'a InkMask,
    /// Full-resolution text boxes (may be empty).
    pub text_boxes: &'a [TextBox],
}

impl SuppressionContext<'_> {
    fn width(&self) -> u32 {
        self.grey.width()
    }

    fn height(&self) -> u32 {
        self.grey.height()
    }

    fn margin(&self) -> u32 {
        frac_floor(self.height(), MARGIN_FRACTION)
    }
}

/// One suppression pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressionPass {
    /// Longest run of caption-like rows scanning in from either edge.
    CaptionBands,
    /// First run of faintly inked rows from the bottom of the central strip.
    ThinStrip,
    /// First run of edge-energy rows from the bottom of the central strip.
    EdgeEnergy,
    /// Wide text lines near the bottom reported by the detector.
    WideCaptionText,
    /// Narrow text blocks in the bottom corners reported by the detector.
    CornerWatermarkText,
}

impl SuppressionPass {
    /// All passes in the order they are evaluated.
    pub const ALL: [SuppressionPass; 5] = [
        SuppressionPass::CaptionBands,
        SuppressionPass::WideCaptionText,
        SuppressionPass::CornerWatermarkText,
        SuppressionPass::ThinStrip,
        SuppressionPass::EdgeEnergy,
    ];

    /// Run the pass.
    #[must_use]
    pub fn hints(self, ctx: &SuppressionContext<'_>) -> Vec<BoundaryHint> {
        match self {
            SuppressionPass::CaptionBands => caption_bands(ctx),
            SuppressionPass::ThinStrip => thin_strip(ctx).into_iter().collect(),
            SuppressionPass::EdgeEnergy => edge_energy(ctx).into_iter().collect(),
            SuppressionPass::WideCaptionText => wide_caption_text(ctx).into_iter().collect(),
            SuppressionPass::CornerWatermarkText => {
                corner_watermark_text(ctx).into_iter().collect()
            }
        }
    }
}

/// Run every pass and collect their hints in pass order.
#[must_use]
pub fn collect_hints(ctx: &SuppressionContext<'_>) -> Vec<BoundaryHint> {
    let hints: Vec<BoundaryHint> = SuppressionPass::ALL
        .iter()
        .flat_map(|pass| pass.hints(ctx))
        .collect();
    debug!(count = hints.len(), "suppression hints collected");
    hints
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn frac_floor(dim: u32, frac: f32) -> u32 {
    (dim as f32 * frac).floor() as u32
}

/// Longest run of marked rows scanning from `len - 1` down to `stop` inclusive.
/// Returns `(run_length, top_row)`.
fn longest_run_from_bottom(marks: &[bool], stop: usize) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;
    let mut run = 0usize;
    let mut run_top = 0usize;
    for y in (stop..marks.len()).rev() {
        if marks[y] {
            run += 1;
            run_top = y;
        } else if run > 0 {
            if best.is_none_or(|(len, _)| run > len) {
                best = Some((run, run_top));
            }
            run = 0;
        }
    }
    if run > 0 && best.is_none_or(|(len, _)| run > len) {
        best = Some((run, run_top));
    }
    best
}

/// Longest run of marked rows scanning from 0 up to `stop` inclusive.
/// Returns `(run_length, bottom_row)`.
fn longest_run_from_top(marks: &[bool], stop: usize) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;
    let mut run = 0usize;
    let mut run_bottom = 0usize;
    let end = (stop + 1).min(marks.len());
    for (y, &marked) in marks[..end].iter().enumerate() {
        if marked {
            run += 1;
            run_bottom = y;
        } else if run > 0 {
            if best.is_none_or(|(len, _)| run > len) {
                best = Some((run, run_bottom));
            }
            run = 0;
        }
    }
    if run > 0 && best.is_none_or(|(len, _)| run > len) {
        best = Some((run, run_bottom));
    }
    best
}

/// First run of at least `min_run` marked rows scanning from the bottom up to
/// `stop` inclusive. Returns the top row of that run.
fn first_run_from_bottom(marks: &[bool], stop: usize, min_run: usize) -> Option<usize> {
    let mut run = 0usize;
    let mut run_top = 0usize;
    for y in (stop..marks.len()).rev() {
        if marks[y] {
            run += 1;
            run_top = y;
        } else if run >= min_run {
            break;
        } else {
            run = 0;
        }
    }
    (run >= min_run && run > 0).then_some(run_top)
}

fn bottom_cut(top_row: usize, margin: u32, source: HintSource) -> Option<BoundaryHint> {
    let top_row = u32::try_from(top_row).ok()?;
    (top_row > 0).then(|| BoundaryHint {
        edge: Edge::Bottom,
        cut_at: top_row.saturating_sub(margin),
        source,
    })
}

fn caption_bands(ctx: &SuppressionContext<'_>) -> Vec<BoundaryHint> {
    const DENSE: f32 = 0.16;
    const SPARSE_DENSITY: f32 = 0.02;
    const SPARSE_TRANSITION: f32 = 0.10;

    let h = ctx.height();
    let profile = RowProfile::compute_band(ctx.profile_mask, PROFILE_BAND);
    let marks: Vec<bool> = profile
        .density
        .iter()
        .zip(&profile.transition)
        .map(|(&d, &t)| d >= DENSE || (d >= SPARSE_DENSITY && t >= SPARSE_TRANSITION))
        .collect();

    let min_run = frac_floor(h, 0.04).max(8) as usize;
    let margin = ctx.margin();
    let mut hints = Vec::new();

    if let Some((len, top)) = longest_run_from_bottom(&marks, frac_floor(h, 0.70) as usize) {
        if len >= min_run {
            hints.extend(bottom_cut(top, margin, HintSource::CaptionBand));
        }
    }
    if let Some((len, bottom)) = longest_run_from_top(&marks, frac_floor(h, 0.30) as usize) {
        if len >= min_run && bottom > 0 {
            #[allow(clippy::cast_possible_truncation)]
            hints.push(BoundaryHint {
                edge: Edge::Top,
                cut_at: (bottom as u32 + 1 + margin).min(h),
                source: HintSource::CaptionBand,
            });
        }
    }
    hints
}

fn thin_strip(ctx: &SuppressionContext<'_>) -> Option<BoundaryHint> {
    const THRESHOLD: u8 = 240;
    const DENSITY: f32 = 0.004;
    const TRANSITION: f32 = 0.020;

    let h = ctx.height();
    let mask = binarize(ctx.grey, THRESHOLD);
    let profile = RowProfile::compute_band(&mask, (0.30, 0.70));
    let marks: Vec<bool> = profile
        .density
        .iter()
        .zip(&profile.transition)
        .map(|(&d, &t)| d >= DENSITY || t >= TRANSITION)
        .collect();

    let min_run = frac_floor(h, 0.006).max(5) as usize;
    let top = first_run_from_bottom(&marks, frac_floor(h, 0.60) as usize, min_run)?;
    bottom_cut(top, ctx.margin(), HintSource::ThinStrip)
}

fn edge_energy(ctx: &SuppressionContext<'_>) -> Option<BoundaryHint> {
    const BLUR_SIGMA: f32 = 5.0;
    const ENERGY: f32 = 0.010;

    let (w, h) = (ctx.width(), ctx.height());
    let stop = frac_floor(h, 0.62);
    let (x0, x1) = band_columns(w, (0.35, 0.65));
    if x1 <= x0 || stop >= h {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let band_w = (x1 - x0) as f32;

    let blurred = imageops::blur(ctx.rgb, BLUR_SIGMA);
    let mut marks = vec![false; h as usize];
    for y in stop..h {
        let mut sum = 0u64;
        for x in x0..x1 {
            let a = ctx.rgb.get_pixel(x, y);
            let b = blurred.get_pixel(x, y);
            let diff = Rgb([a[0].abs_diff(b[0]), a[1].abs_diff(b[1]), a[2].abs_diff(b[2])]);
            sum += u64::from(luma(diff));
        }
        #[allow(clippy::cast_precision_loss)]
        let energy = sum as f32 / (255.0 * band_w);
        marks[y as usize] = energy >= ENERGY;
    }

    let min_run = frac_floor(h, 0.005).max(4) as usize;
    let top = first_run_from_bottom(&marks, stop as usize, min_run)?;
    bottom_cut(top, ctx.margin(), HintSource::EdgeEnergy)
}

fn wide_caption_text(ctx: &SuppressionContext<'_>) -> Option<BoundaryHint> {
    let (w, h) = (ctx.width(), ctx.height());
    let (min_h, max_h) = (frac_floor(h, 0.012).max(6), frac_floor(h, 0.06));
    let min_w = frac_floor(w, 0.25);
    let y_min = frac_floor(h, 0.75);

    let candidates: Vec<TextBox> = ctx
        .text_boxes
        .iter()
        .filter(|b| b.h >= min_h && b.h <= max_h && b.w >= min_w && b.bottom() >= y_min)
        .cloned()
        .collect();
    let lines = merge_boxes(&candidates, round_frac(w, 0.01));
    let top = lines.iter().map(|b| b.y).min()?;
    bottom_cut(top as usize, ctx.margin(), HintSource::WideCaptionText)
}

fn corner_watermark_text(ctx: &SuppressionContext<'_>) -> Option<BoundaryHint> {
    let (w, h) = (ctx.width(), ctx.height());
    let (min_h, max_h) = (frac_floor(h, 0.008).max(5), frac_floor(h, 0.06));
    let (min_w, max_w) = (frac_floor(w, 0.06), frac_floor(w, 0.30));
    let y_min = frac_floor(h, 0.70);
    #[allow(clippy::cast_precision_loss)]
    let edge = (w as f32 * 0.30).floor();
    #[allow(clippy::cast_precision_loss)]
    let wf = w as f32;

    let candidates: Vec<TextBox> = ctx
        .text_boxes
        .iter()
        .filter(|b| {
            #[allow(clippy::cast_precision_loss)]
            let cx = b.x as f32 + b.w as f32 / 2.0;
            let at_edge = cx < edge || cx > wf - edge;
            at_edge
                && b.h >= min_h
                && b.h <= max_h
                && b.w >= min_w
                && b.w <= max_w
                && b.bottom() >= y_min
        })
        .cloned()
        .collect();
    let groups = merge_boxes(&candidates, round_frac(w, 0.01));
    let top = groups.iter().map(|b| b.y).min()?;
    bottom_cut(top as usize, ctx.margin(), HintSource::CornerWatermarkText)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn round_frac(dim: u32, frac: f32) -> u32 {
    (dim as f32 * frac).round() as u32
}
