//! Per-row ink statistics and the baseline vertical window search.
//!
//! Logo artwork tends to combine moderate ink coverage with many stroke
//! edges, while flat backgrounds and solid bars score low on at least one of
//! the two. The product of smoothed density and smoothed transition rate is
//! used as a per-row score and the best-scoring contiguous window becomes the
//! baseline vertical extent of the safe zone.

use crate::binarize::InkMask;

/// Central band (fractions of width) the profile is sampled over.
pub const PROFILE_BAND: (f32, f32) = (0.18, 0.82);

/// Rows eligible for the window search (fractions of height).
const WINDOW_RANGE: (f32, f32) = (0.12, 0.92);
/// Minimum window length: `max(28, 8% of H)`.
const MIN_WINDOW_FRACTION: f32 = 0.08;
const MIN_WINDOW_PX: u32 = 28;
/// Maximum window length as a fraction of height.
const MAX_WINDOW_FRACTION: f32 = 0.55;
/// Rows scoring below this fraction of the window peak are trimmed off the ends.
const TRIM_FRACTION: f32 = 0.02;
/// Window reported when the profile carries no signal at all.
const DEFAULT_WINDOW: (f32, f32) = (0.35, 0.65);

/// Row statistics over a horizontal band of an [`InkMask`].
#[derive(Debug, Clone, PartialEq)]
pub struct RowProfile {
    /// Fraction of ink cells in each row.
    pub density: Vec<f32>,
    /// Fraction of adjacent cell pairs whose ink state differs, per row.
    pub transition: Vec<f32>,
}

impl RowProfile {
    /// Sample every row of `mask` over columns `[x0, x1)`.
    #[must_use]
    pub fn compute(mask: &InkMask, x0: u32, x1: u32) -> Self {
        let x1 = x1.min(mask.width());
        let x0 = x0.min(x1);
        #[allow(clippy::cast_precision_loss)]
        let band_w = (x1 - x0).max(1) as f32;

        let mut density = Vec::with_capacity(mask.height() as usize);
        let mut transition = Vec::with_capacity(mask.height() as usize);

        for y in 0..mask.height() {
            let row = &mask.row(y)[x0 as usize..x1 as usize];
            let dark = row.iter().filter(|&&c| c).count();
            let changes = row.windows(2).filter(|pair| pair[0] != pair[1]).count();
            #[allow(clippy::cast_precision_loss)]
            {
                density.push(dark as f32 / band_w);
                transition.push(changes as f32 / band_w);
            }
        }

        Self {
            density,
            transition,
        }
    }

    /// Sample over the fractional band `[band.0 * W, band.1 * W)`.
    #[must_use]
    pub fn compute_band(mask: &InkMask, band: (f32, f32)) -> Self {
        let (x0, x1) = band_columns(mask.width(), band);
        Self::compute(mask, x0, x1)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.density.len()
    }

    /// Whether the profile has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.density.is_empty()
    }

    /// Both series smoothed with a causal moving average of `window` rows.
    #[must_use]
    pub fn smoothed(&self, window: usize) -> Self {
        Self {
            density: moving_average(&self.density, window),
            transition: moving_average(&self.transition, window),
        }
    }

    /// Per-row composite score `density * transition`.
    #[must_use]
    pub fn scores(&self) -> Vec<f32> {
        self.density
            .iter()
            .zip(&self.transition)
            .map(|(d, t)| d * t)
            .collect()
    }
}

/// Convert a fractional band into a column range `[floor(a*W), ceil(b*W))`.
#[must_use]
pub fn band_columns(width: u32, band: (f32, f32)) -> (u32, u32) {
    #[allow(clippy::cast_precision_loss)]
    let wf = width as f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (x0, x1) = (
        (wf * band.0).floor() as u32,
        ((wf * band.1).ceil() as u32).min(width),
    );
    (x0.min(x1), x1)
}

/// Smoothing window for an image of the given height: `max(3, 2% of H)`.
#[must_use]
pub fn smoothing_window(height: u32) -> usize {
    (height as usize / 50).max(3)
}

/// Causal moving average: each output averages the current value and up to
/// `window - 1` preceding values.
#[must_use]
pub fn moving_average(values: &[f32], window: usize) -> Vec<f32> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut acc = 0.0_f64;
    for (i, &v) in values.iter().enumerate() {
        acc += f64::from(v);
        if i >= window {
            acc -= f64::from(values[i - window]);
        }
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        out.push((acc / window.min(i + 1) as f64).max(0.0) as f32);
    }
    out
}

/// Find the contiguous row window `[y0, y1)` maximising the summed score.
///
/// Windows start no earlier than 12% of the height, end no later than 92%,
/// and span between `max(28, 8%)` and 55% of the height. Ties go to the
/// earliest, then shortest, window. The winner is tightened by dropping
/// near-zero rows off both ends as long as the minimum length allows.
#[must_use]
pub fn best_window(scores: &[f32], height: u32) -> (u32, u32) {
    #[allow(clippy::cast_precision_loss)]
    let hf = height as f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let default = (
        (hf * DEFAULT_WINDOW.0).floor() as u32,
        ((hf * DEFAULT_WINDOW.1).ceil() as u32).min(height),
    );

    let n = scores.len().min(height as usize);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (lo, hi) = (
        (hf * WINDOW_RANGE.0).floor() as usize,
        ((hf * WINDOW_RANGE.1).ceil() as usize).min(n),
    );
    if hi <= lo {
        return default;
    }
    let span = hi - lo;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let min_len = ((MIN_WINDOW_PX as usize).max((hf * MIN_WINDOW_FRACTION).floor() as usize))
        .min(span)
        .max(1);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let max_len = ((hf * MAX_WINDOW_FRACTION).floor() as usize)
        .max(min_len)
        .min(span);

    let mut prefix = vec![0.0_f64; n + 1];
    for (i, &s) in scores[..n].iter().enumerate() {
        prefix[i + 1] = prefix[i] + f64::from(s);
    }

    let mut best: Option<(usize, usize, f64)> = None;
    for y0 in lo..=(hi - min_len) {
        let y1_max = (y0 + max_len).min(hi);
        for y1 in (y0 + min_len)..=y1_max {
            let sum = prefix[y1] - prefix[y0];
            if best.is_none_or(|(_, _, b)| sum > b) {
                best = Some((y0, y1, sum));
            }
        }
    }

    let Some((mut y0, mut y1, sum)) = best else {
        return default;
    };
    let peak = scores[y0..y1].iter().copied().fold(0.0_f32, f32::max);
    if sum <= 0.0 || peak <= 0.0 {
        return default;
    }

    let floor = peak * TRIM_FRACTION;
    while y1 - y0 > min_len && scores[y0] < floor {
        y0 += 1;
    }
    while y1 - y0 > min_len && scores[y1 - 1] < floor {
        y1 -= 1;
    }

    #[allow(clippy::cast_possible_truncation)]
    (y0 as u32, y1 as u32)
}
