//! Fusing component, text and profile evidence into one [`SafeZone`].

use tracing::{debug, warn};

use crate::binarize::InkMask;
use crate::components::{center_third, Component};
use crate::geometry::{min_safe_height, Rect, SafeZone};
use crate::suppress::{BoundaryHint, Edge};
use crate::text::{merge_boxes, TextBox};

/// Padding added on each side, as a fraction of the matching dimension.
const PAD_FRACTION: f32 = 0.04;
/// Strip density above which the growth pass keeps extending an edge.
const GROW_DENSITY: f32 = 0.02;
/// Maximum growth per edge, as a fraction of the matching dimension.
const GROW_MAX_FRACTION: f32 = 0.10;
/// Growth step, as a fraction of the matching dimension (at least 2px).
const GROW_STEP_FRACTION: f32 = 0.01;
/// Smallest component, as a fraction of the image area, fused as part of the artwork.
const COMPANION_AREA_FRACTION: f32 = 0.002;

/// Everything the assembler fuses.
#[derive(Debug, Clone, Copy)]
pub struct ZoneEvidence<'a> {
    /// Image width.
    pub width: u32,
    /// Image height.
    pub height: u32,
    /// Logo candidate, if any component qualified.
    pub candidate: Option<&'a Component>,
    /// Every labelled component; those inside the artwork rows join the candidate.
    pub components: &'a [Component],
    /// Full-resolution text boxes.
    pub text_boxes: &'a [TextBox],
    /// Baseline vertical window `[y0, y1)` from the row profile.
    pub window: (u32, u32),
    /// Boundary hints in pass order.
    pub hints: &'a [BoundaryHint],
    /// Mask used to measure ink density while growing.
    pub growth_mask: &'a InkMask,
}

/// Result of assembly, with enough detail for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    /// Final zone.
    pub zone: SafeZone,
    /// Whether the centre-third fallback replaced the logo candidate.
    pub used_center_fallback: bool,
    /// Text lines that were fused into the base box.
    pub text_lines: Vec<TextBox>,
    /// Hints that actually moved an edge.
    pub applied_hints: Vec<BoundaryHint>,
    /// Candidate plus companion components; no hint may cut into it.
    pub artwork: Option<Rect>,
}

/// Text lines plausible as a brand name or slogan.
///
/// Height between `max(10, 3%)` and 16% of the image, width at least 35%,
/// and away from the extreme top and bottom margins.
#[must_use]
pub fn qualifying_text_lines(boxes: &[TextBox], width: u32, height: u32) -> Vec<TextBox> {
    let min_h = frac(height, 0.03).max(10);
    let max_h = frac(height, 0.16);
    let min_w = frac(width, 0.35);
    let top_limit = frac(height, 0.10);
    let bottom_limit = frac(height, 0.95);

    let lines: Vec<TextBox> = boxes
        .iter()
        .filter(|b| {
            b.h >= min_h
                && b.h <= max_h
                && b.w >= min_w
                && b.y >= top_limit
                && b.bottom() <= bottom_limit
        })
        .cloned()
        .collect();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let tol = (width as f32 * 0.01).round() as u32;
    merge_boxes(&lines, tol)
}

/// Assemble the safe zone. Never fails: every path ends in a valid zone.
#[must_use]
pub fn assemble(evidence: &ZoneEvidence<'_>) -> Assembly {
    let (w, h) = (evidence.width, evidence.height);
    if w == 0 || h == 0 {
        return Assembly {
            zone: SafeZone::full(w, h),
            used_center_fallback: true,
            text_lines: Vec::new(),
            applied_hints: Vec::new(),
            artwork: None,
        };
    }

    let used_center_fallback = evidence.candidate.is_none();
    let candidate = match evidence.candidate {
        Some(c) => c.bbox,
        None => {
            warn!(width = w, height = h, "no qualifying logo component, using centre third");
            center_third(w, h)
        }
    };

    let text_lines = qualifying_text_lines(evidence.text_boxes, w, h);
    let mut base = text_lines
        .iter()
        .fold(candidate, |acc, line| acc.union(&line.rect()));
    let (win_y0, win_y1) = evidence.window;
    if win_y1 > win_y0 {
        base.y = base.y.min(win_y0);
        base.y2 = base.y2.max(win_y1);
    }

    let companions = companion_components(evidence.components, base, w, h);
    let artwork = evidence.candidate.map(|c| {
        companions
            .iter()
            .fold(c.bbox, |acc, comp| acc.union(&comp.bbox))
    });
    base = companions
        .iter()
        .fold(base, |acc, comp| acc.union(&comp.bbox));
    debug!(
        ?base,
        lines = text_lines.len(),
        companions = companions.len(),
        "base box fused"
    );

    let padded = pad(base, w, h);
    let grown = grow(padded, evidence.growth_mask);
    let (limited, applied_hints) = apply_hints(grown, evidence.hints, h, artwork);
    let zone = SafeZone::fit(limited, w, h);
    debug!(?zone, applied = applied_hints.len(), "safe zone assembled");

    Assembly {
        zone,
        used_center_fallback,
        text_lines,
        applied_hints,
        artwork,
    }
}

/// Components lying entirely within the rows of `base` and large enough to be
/// artwork (wordmark glyphs, a second icon) rather than specks.
fn companion_components<'c>(
    components: &'c [Component],
    base: Rect,
    width: u32,
    height: u32,
) -> Vec<&'c Component> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let min_area = ((f64::from(width) * f64::from(height) * f64::from(COMPANION_AREA_FRACTION))
        .floor() as usize)
        .max(1);
    components
        .iter()
        .filter(|c| c.area >= min_area && c.bbox.y >= base.y && c.bbox.y2 <= base.y2)
        .collect()
}

fn pad(rect: Rect, width: u32, height: u32) -> Rect {
    let px = frac(width, PAD_FRACTION);
    let py = frac(height, PAD_FRACTION);
    Rect {
        x: rect.x.saturating_sub(px),
        y: rect.y.saturating_sub(py),
        x2: rect.x2.saturating_add(px),
        y2: rect.y2.saturating_add(py),
    }
    .clamp_to(width, height)
}

/// Push each edge outward while the strip just beyond it still carries ink.
fn grow(rect: Rect, mask: &InkMask) -> Rect {
    let (w, h) = (mask.width(), mask.height());
    let step_x = frac(w, GROW_STEP_FRACTION).max(2);
    let step_y = frac(h, GROW_STEP_FRACTION).max(2);
    let max_x = frac(w, GROW_MAX_FRACTION);
    let max_y = frac(h, GROW_MAX_FRACTION);
    let mut r = rect.clamp_to(w, h);

    let mut grown = 0;
    while grown < max_y && r.y > 0 {
        let next = r.y.saturating_sub(step_y);
        if mask.density(r.x, next, r.x2, r.y) < GROW_DENSITY {
            break;
        }
        grown += r.y - next;
        r.y = next;
    }

    grown = 0;
    while grown < max_y && r.y2 < h {
        let next = (r.y2 + step_y).min(h);
        if mask.density(r.x, r.y2, r.x2, next) < GROW_DENSITY {
            break;
        }
        grown += next - r.y2;
        r.y2 = next;
    }

    grown = 0;
    while grown < max_x && r.x > 0 {
        let next = r.x.saturating_sub(step_x);
        if mask.density(next, r.y, r.x, r.y2) < GROW_DENSITY {
            break;
        }
        grown += r.x - next;
        r.x = next;
    }

    grown = 0;
    while grown < max_x && r.x2 < w {
        let next = (r.x2 + step_x).min(w);
        if mask.density(r.x2, r.y, next, r.y2) < GROW_DENSITY {
            break;
        }
        grown += next - r.x2;
        r.x2 = next;
    }

    r
}

/// Apply the strictest hint per edge that still leaves the minimum safe height.
///
/// Bottom hints are tried from the lowest cut up, top hints from the highest
/// cut down; the first one that fits wins. Hints that would cut into
/// `protected` are ignored.
#[must_use]
pub fn apply_hints(
    rect: Rect,
    hints: &[BoundaryHint],
    height: u32,
    protected: Option<Rect>,
) -> (Rect, Vec<BoundaryHint>) {
    let min_h = min_safe_height(height);
    let mut r = rect;
    let mut applied = Vec::new();

    let mut bottoms: Vec<&BoundaryHint> = hints.iter().filter(|h| h.edge == Edge::Bottom).collect();
    bottoms.sort_by_key(|h| h.cut_at);
    if let Some(hint) = bottoms
        .into_iter()
        .find(|h| {
            h.cut_at < r.y2
                && h.cut_at > r.y.saturating_add(min_h)
                && protected.is_none_or(|p| h.cut_at >= p.y2)
        })
    {
        r.y2 = hint.cut_at;
        applied.push(*hint);
    }

    let mut tops: Vec<&BoundaryHint> = hints.iter().filter(|h| h.edge == Edge::Top).collect();
    tops.sort_by_key(|h| std::cmp::Reverse(h.cut_at));
    if let Some(hint) = tops
        .into_iter()
        .find(|h| {
            h.cut_at > r.y
                && h.cut_at.saturating_add(min_h) < r.y2
                && protected.is_none_or(|p| h.cut_at <= p.y)
        })
    {
        r.y = hint.cut_at;
        applied.push(*hint);
    }

    (r, applied)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn frac(dim: u32, f: f32) -> u32 {
    (dim as f32 * f).floor() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suppress::HintSource;

    fn empty_mask(w: u32, h: u32) -> InkMask {
        InkMask::from_cells(w, h, vec![false; (w * h) as usize])
    }

    fn component(rect: Rect) -> Component {
        #[allow(clippy::cast_precision_loss)]
        Component {
            bbox: rect,
            area: (rect.width() * rect.height()) as usize,
            centroid: (
                (rect.x + rect.x2) as f32 / 2.0,
                (rect.y + rect.y2) as f32 / 2.0,
            ),
        }
    }

    fn hint(edge: Edge, cut_at: u32) -> BoundaryHint {
        BoundaryHint {
            edge,
            cut_at,
            source: HintSource::CaptionBand,
        }
    }

    #[test]
    fn candidate_is_padded() {
        let mask = empty_mask(500, 500);
        let comp = component(Rect::new(150, 200, 350, 300));
        let evidence = ZoneEvidence {
            width: 500,
            height: 500,
            candidate: Some(&comp),
            text_boxes: &[],
            window: (200, 300),
            hints: &[],
            components: &[],
            growth_mask: &mask,
        };
        let out = assemble(&evidence);
        assert!(!out.used_center_fallback);
        assert_eq!(out.zone.rect(), Rect::new(130, 180, 370, 320));
    }

    #[test]
    fn missing_candidate_falls_back_to_center() {
        let mask = empty_mask(300, 300);
        let evidence = ZoneEvidence {
            width: 300,
            height: 300,
            candidate: None,
            text_boxes: &[],
            window: (105, 195),
            hints: &[],
            components: &[],
            growth_mask: &mask,
        };
        let out = assemble(&evidence);
        assert!(out.used_center_fallback);
        let zone = out.zone;
        assert!(zone.rect().contains_rect(&center_third(300, 300)));
        assert!(zone.y2() - zone.y() >= min_safe_height(300));
    }

    #[test]
    fn brand_text_line_extends_the_zone() {
        let mask = empty_mask(500, 500);
        let comp = component(Rect::new(200, 150, 300, 250));
        let boxes = [TextBox::new(100, 280, 300, 40, 0.9, "ACME")];
        let evidence = ZoneEvidence {
            width: 500,
            height: 500,
            candidate: Some(&comp),
            text_boxes: &boxes,
            window: (150, 250),
            hints: &[],
            components: &[],
            growth_mask: &mask,
        };
        let out = assemble(&evidence);
        assert_eq!(out.text_lines.len(), 1);
        assert!(out.zone.x() <= 100);
        assert!(out.zone.y2() >= 320);
    }

    #[test]
    fn growth_follows_ink_past_the_padding() {
        let mut cells = vec![false; 400 * 400];
        // artwork continues below the base box up to row 260
        for y in 100..260 {
            for x in 150..250 {
                cells[y * 400 + x] = true;
            }
        }
        let mask = InkMask::from_cells(400, 400, cells);
        let grown = grow(Rect::new(140, 90, 260, 220), &mask);
        assert!(grown.y2 >= 260);
        assert!(grown.y2 <= 220 + 40 + 4);
        assert_eq!(grown.y, 90);
    }

    #[test]
    fn growth_is_bounded() {
        let mask = InkMask::from_cells(200, 200, vec![true; 200 * 200]);
        let grown = grow(Rect::new(80, 80, 120, 120), &mask);
        assert!(80 - grown.y <= 20 + 2);
        assert!(grown.x2 - 120 <= 20 + 2);
    }

    #[test]
    fn companion_glyphs_widen_the_zone() {
        let mask = empty_mask(512, 512);
        let icon = component(Rect::new(196, 120, 316, 240));
        let mut comps = vec![icon.clone()];
        for i in 0..12 {
            comps.push(component(Rect::from_xywh(80 + i * 30, 300, 20, 40)));
        }
        // speck in the same rows stays out
        comps.push(component(Rect::new(10, 200, 15, 210)));
        let evidence = ZoneEvidence {
            width: 512,
            height: 512,
            candidate: Some(&icon),
            components: &comps,
            text_boxes: &[],
            window: (120, 349),
            hints: &[],
            growth_mask: &mask,
        };
        let out = assemble(&evidence);
        assert!(out.zone.x() <= 80 && out.zone.x() > 15, "{:?}", out.zone);
        assert!(out.zone.x2() >= 430, "{:?}", out.zone);
        assert_eq!(out.artwork, Some(Rect::new(80, 120, 430, 340)));
    }

    #[test]
    fn hints_never_cut_into_artwork() {
        let artwork = Some(Rect::new(100, 100, 400, 400));
        let (r, applied) = apply_hints(
            Rect::new(80, 80, 420, 430),
            &[hint(Edge::Bottom, 300), hint(Edge::Top, 160)],
            512,
            artwork,
        );
        assert_eq!(r, Rect::new(80, 80, 420, 430));
        assert!(applied.is_empty());

        let (r, applied) = apply_hints(
            Rect::new(80, 80, 420, 430),
            &[hint(Edge::Bottom, 300), hint(Edge::Bottom, 410)],
            512,
            artwork,
        );
        assert_eq!(r.y2, 410);
        assert_eq!(applied[0].cut_at, 410);
    }

    #[test]
    fn bottom_hint_clips_zone() {
        let (r, applied) = apply_hints(
            Rect::new(0, 100, 500, 480),
            &[hint(Edge::Bottom, 440)],
            500,
            None,
        );
        assert_eq!(r.y2, 440);
        assert_eq!(applied.len(), 1);
    }

    #[test]
    fn hint_that_would_violate_min_height_is_skipped() {
        let (r, applied) = apply_hints(
            Rect::new(0, 300, 500, 480),
            &[hint(Edge::Bottom, 350), hint(Edge::Bottom, 420)],
            500,
            None,
        );
        assert_eq!(r.y2, 420);
        assert_eq!(applied[0].cut_at, 420);
    }

    #[test]
    fn top_hint_moves_top_edge() {
        let (r, applied) = apply_hints(Rect::new(0, 10, 500, 400), &[hint(Edge::Top, 60)], 500, None);
        assert_eq!(r.y, 60);
        assert_eq!(applied.len(), 1);
    }

    #[test]
    fn assembly_respects_invariant_for_tiny_images() {
        let mask = empty_mask(20, 10);
        let evidence = ZoneEvidence {
            width: 20,
            height: 10,
            candidate: None,
            text_boxes: &[],
            window: (3, 7),
            hints: &[],
            components: &[],
            growth_mask: &mask,
        };
        let zone = assemble(&evidence).zone;
        assert_eq!((zone.y(), zone.y2()), (0, 10));
        assert!(zone.x2() <= 20);
    }
}
