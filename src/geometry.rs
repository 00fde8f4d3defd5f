//! Rectangle math, easing and interpolation.
//!
//! Everything here is pure and deterministic; the layout engines are built on
//! top of these helpers and their tests assert exact values.

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;

use serde::{Deserialize, Serialize};

/// Page or slide dimensions in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for Size {
    /// 16:9 slide at 72 dpi.
    fn default() -> Self {
        Self { width: 960.0, height: 540.0 }
    }
}

/// Axis-aligned rectangle with a top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    /// Build a rectangle of the given size centered on `(cx, cy)`.
    #[must_use]
    pub fn from_center(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self { left: cx - width / 2.0, top: cy - height / 2.0, width, height }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    #[must_use]
    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Shrink by per-edge insets. Width and height never go negative.
    #[must_use]
    pub fn inset(&self, left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left: self.left + left,
            top: self.top + top,
            width: (self.width - left - right).max(0.0),
            height: (self.height - top - bottom).max(0.0),
        }
    }

    /// Translate by `(dx, dy)`.
    #[must_use]
    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self { left: self.left + dx, top: self.top + dy, ..*self }
    }

    /// True when the interiors overlap. Touching edges do not count.
    #[must_use]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right() && other.left < self.right() && self.top < other.bottom() && other.top < self.bottom()
    }

    /// True when `other` lies entirely inside `self`.
    #[must_use]
    pub fn contains(&self, other: &Rect) -> bool {
        other.left >= self.left && other.top >= self.top && other.right() <= self.right() && other.bottom() <= self.bottom()
    }

    /// Shift (never resize) so the rectangle lies inside `bounds` where it fits.
    #[must_use]
    pub fn shifted_inside(&self, bounds: &Rect) -> Self {
        let mut left = self.left;
        let mut top = self.top;
        if self.right() > bounds.right() {
            left = bounds.right() - self.width;
        }
        if left < bounds.left {
            left = bounds.left;
        }
        if self.bottom() > bounds.bottom() {
            top = bounds.bottom() - self.height;
        }
        if top < bounds.top {
            top = bounds.top;
        }
        Self { left, top, ..*self }
    }

    /// Smallest rectangle covering every input. `None` for an empty slice.
    #[must_use]
    pub fn union_all(rects: &[Rect]) -> Option<Rect> {
        let first = rects.first()?;
        let (mut l, mut t, mut r, mut b) = (first.left, first.top, first.right(), first.bottom());
        for rect in &rects[1..] {
            l = l.min(rect.left);
            t = t.min(rect.top);
            r = r.max(rect.right());
            b = b.max(rect.bottom());
        }
        Some(Rect::new(l, t, r - l, b - t))
    }
}

/// Clamp that tolerates `NaN` (returns `min`) and never panics on bad bounds.
#[must_use]
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.max(min).min(max)
}

/// `1 - (1 - t)^3` with `t` clamped to `[0, 1]`.
#[must_use]
pub fn ease_out_cubic(t: f64) -> f64 {
    let t = clamp(t, 0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Linear interpolation: `from + (to - from) * t`.
#[must_use]
pub fn interpolate(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}
