//! 8-connected component labelling over an [`InkMask`] and logo candidate selection.

use crate::binarize::InkMask;
use crate::geometry::Rect;

/// Minimum component area as a fraction of the image area.
const MIN_AREA_FRACTION: f32 = 0.01;
/// Horizontal window (fractions of width) the candidate centroid must fall in.
const CENTER_X_RANGE: (f32, f32) = (0.17, 0.83);
/// Vertical window (fractions of height) the candidate centroid must fall in.
const CENTER_Y_RANGE: (f32, f32) = (0.15, 0.70);

/// A maximal 8-connected set of ink cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// Bounding box (half-open).
    pub bbox: Rect,
    /// Number of ink cells.
    pub area: usize,
    /// Mean position of the cells.
    pub centroid: (f32, f32),
}

/// Label every 8-connected component in the mask.
///
/// Uses an explicit stack, so arbitrarily large blobs do not recurse.
/// Components are returned in raster order of their first cell.
#[must_use]
pub fn label_components(mask: &InkMask) -> Vec<Component> {
    let (w, h) = (mask.width(), mask.height());
    let cells = mask.cells();
    let mut visited = vec![false; cells.len()];
    let mut stack: Vec<(u32, u32)> = Vec::new();
    let mut components = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let idx = mask.index(x, y);
            if !cells[idx] || visited[idx] {
                continue;
            }
            visited[idx] = true;
            stack.push((x, y));

            let (mut min_x, mut min_y, mut max_x, mut max_y) = (x, y, x, y);
            let mut area = 0usize;
            let (mut sum_x, mut sum_y) = (0u64, 0u64);

            while let Some((cx, cy)) = stack.pop() {
                area += 1;
                sum_x += u64::from(cx);
                sum_y += u64::from(cy);
                min_x = min_x.min(cx);
                min_y = min_y.min(cy);
                max_x = max_x.max(cx);
                max_y = max_y.max(cy);

                for ny in cy.saturating_sub(1)..=(cy + 1).min(h - 1) {
                    for nx in cx.saturating_sub(1)..=(cx + 1).min(w - 1) {
                        let n = mask.index(nx, ny);
                        if cells[n] && !visited[n] {
                            visited[n] = true;
                            stack.push((nx, ny));
                        }
                    }
                }
            }

            #[allow(clippy::cast_precision_loss)]
            let centroid = (sum_x as f32 / area as f32, sum_y as f32 / area as f32);
            components.push(Component {
                bbox: Rect::new(min_x, min_y, max_x + 1, max_y + 1),
                area,
                centroid,
            });
        }
    }

    components
}

/// Pick the logo candidate: the largest component whose centroid lies in the
/// central region and whose area is at least 1% of the image.
///
/// Returns `None` when nothing qualifies; the caller falls back to the
/// geometric centre third.
#[must_use]
pub fn select_logo_candidate(components: &[Component], width: u32, height: u32) -> Option<&Component> {
    #[allow(clippy::cast_precision_loss)]
    let (wf, hf) = (width as f32, height as f32);
    let min_area = wf * hf * MIN_AREA_FRACTION;

    let mut best: Option<&Component> = None;
    for comp in components {
        let (cx, cy) = comp.centroid;
        let central = cx >= wf * CENTER_X_RANGE.0
            && cx <= wf * CENTER_X_RANGE.1
            && cy >= hf * CENTER_Y_RANGE.0
            && cy <= hf * CENTER_Y_RANGE.1;
        #[allow(clippy::cast_precision_loss)]
        let big_enough = comp.area as f32 >= min_area;
        if !central || !big_enough {
            continue;
        }
        if best.is_none_or(|b| comp.area > b.area) {
            best = Some(comp);
        }
    }
    best
}

/// The geometric centre third of the image.
#[must_use]
pub fn center_third(width: u32, height: u32) -> Rect {
    Rect::new(width / 3, height / 3, width * 2 / 3, height * 2 / 3)
}
