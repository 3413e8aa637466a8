//! Rectangles and the safe-zone invariant.

/// Axis-aligned rectangle with half-open extents `[x, x2) × [y, y2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge (inclusive).
    pub x: u32,
    /// Top edge (inclusive).
    pub y: u32,
    /// Right edge (exclusive).
    pub x2: u32,
    /// Bottom edge (exclusive).
    pub y2: u32,
}

impl Rect {
    /// Build a rectangle from two corners, normalising their order.
    #[must_use]
    pub fn new(x: u32, y: u32, x2: u32, y2: u32) -> Self {
        Self {
            x: x.min(x2),
            y: y.min(y2),
            x2: x.max(x2),
            y2: y.max(y2),
        }
    }

    /// Build a rectangle from an origin and a size.
    #[must_use]
    pub fn from_xywh(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self::new(x, y, x.saturating_add(w), y.saturating_add(h))
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.x2 - self.x
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.y2 - self.y
    }

    /// Whether the rectangle covers no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x2 <= self.x || self.y2 <= self.y
    }

    /// Smallest rectangle containing both.
    #[must_use]
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x: self.x.min(other.x),
            y: self.y.min(other.y),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }

    /// Whether `other` lies entirely inside this rectangle.
    #[must_use]
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x && other.y >= self.y && other.x2 <= self.x2 && other.y2 <= self.y2
    }

    /// Whether the two rectangles overlap once each is grown by `tol` on every side.
    ///
    /// Touching edges count as overlapping.
    #[must_use]
    pub fn overlaps_with_tolerance(&self, other: &Rect, tol: u32) -> bool {
        let tol = i64::from(tol);
        let (ax, ay, ax2, ay2) = (
            i64::from(self.x) - tol,
            i64::from(self.y) - tol,
            i64::from(self.x2) + tol,
            i64::from(self.y2) + tol,
        );
        let (bx, by, bx2, by2) = (
            i64::from(other.x) - tol,
            i64::from(other.y) - tol,
            i64::from(other.x2) + tol,
            i64::from(other.y2) + tol,
        );
        let separated_x = bx2 < ax || ax2 < bx;
        let separated_y = by2 < ay || ay2 < by;
        !(separated_x || separated_y)
    }

    /// Clip to `[0, width) × [0, height)`.
    #[must_use]
    pub fn clamp_to(&self, width: u32, height: u32) -> Rect {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Rect {
            x,
            y,
            x2: self.x2.clamp(x, width),
            y2: self.y2.clamp(y, height),
        }
    }
}

/// Minimum height of any safe zone for an image of the given height.
///
/// 20% of the height with a 48px floor, capped at the image height so tiny
/// images still admit a valid zone.
#[must_use]
pub fn min_safe_height(height: u32) -> u32 {
    (height / 5).max(48).min(height)
}

/// The rectangle preserved by the compositor.
///
/// Always satisfies `0 ≤ x ≤ x2 ≤ W`, `0 ≤ y ≤ y2 ≤ H` and
/// `y2 - y ≥ min_safe_height(H)` for the image it was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafeZone {
    rect: Rect,
}

impl SafeZone {
    /// Clamp an arbitrary rectangle into a valid safe zone for a `width × height` image.
    #[must_use]
    pub fn fit(rect: Rect, width: u32, height: u32) -> Self {
        let min_h = min_safe_height(height);
        let mut r = rect.clamp_to(width, height);

        r.y = r.y.min(height - min_h);
        r.y2 = r.y2.clamp(r.y + min_h, height);

        if r.x2 <= r.x && width > 0 {
            // collapsed horizontally, keep at least one column
            r.x = r.x.min(width - 1);
            r.x2 = r.x + 1;
        }

        Self { rect: r }
    }

    /// A zone covering the whole image.
    #[must_use]
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            rect: Rect::new(0, 0, width, height),
        }
    }

    /// The underlying rectangle.
    #[must_use]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Left edge.
    #[must_use]
    pub fn x(&self) -> u32 {
        self.rect.x
    }

    /// Top edge.
    #[must_use]
    pub fn y(&self) -> u32 {
        self.rect.y
    }

    /// Right edge (exclusive).
    #[must_use]
    pub fn x2(&self) -> u32 {
        self.rect.x2
    }

    /// Bottom edge (exclusive).
    #[must_use]
    pub fn y2(&self) -> u32 {
        self.rect.y2
    }

    /// Whether the pixel `(px, py)` lies inside the zone.
    #[must_use]
    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.rect.x && px < self.rect.x2 && py >= self.rect.y && py < self.rect.y2
    }
}
