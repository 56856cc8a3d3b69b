//! Geometric primitives.
//!
//! Layout bounds are fractional and live in "root ratio space": the root
//! of a split tree spans `0..width_factor` by `0..height_factor`, where the
//! factors are the container's pixel size. Pixel rectangles are derived from
//! bounds by rounding each edge independently, so adjacent children never
//! overlap or leave a gap after rounding.

use serde::{Deserialize, Serialize};

/// A point in root ratio space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    /// Create a new size.
    #[inline]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Return a copy where negative or NaN dimensions are replaced by `0.0`.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            width: non_negative(self.width),
            height: non_negative(self.height),
        }
    }

    /// Check if either dimension is zero.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Fractional rectangle used for layout bounds and hit testing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    /// Left edge (inclusive).
    pub x: f64,
    /// Top edge (inclusive).
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Create new bounds.
    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create bounds anchored at the origin with the given size.
    #[inline]
    pub const fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    /// Right edge (exclusive).
    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[inline]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Check if the bounds have zero area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Check if a point is inside the bounds.
    ///
    /// Both the leading and trailing edges count as inside. Points on a
    /// shared edge between siblings therefore hit both; callers resolve that
    /// by visiting the first child before the second.
    #[inline]
    pub fn contains(&self, point: Point) -> bool {
        !self.is_empty()
            && point.x >= self.x
            && point.x <= self.right()
            && point.y >= self.y
            && point.y <= self.bottom()
    }

    /// Position of `point` relative to these bounds, as fractions of the
    /// width and height. Zero-extent axes report `0.5`.
    pub fn relative(&self, point: Point) -> Point {
        let rx = if self.width > 0.0 {
            (point.x - self.x) / self.width
        } else {
            0.5
        };
        let ry = if self.height > 0.0 {
            (point.y - self.y) / self.height
        } else {
            0.5
        };
        Point::new(rx, ry)
    }

    /// Round each edge to the nearest integer pixel.
    ///
    /// Rounding edges (rather than origin and extent) guarantees that two
    /// bounds sharing an edge produce pixel rectangles sharing that edge.
    pub fn to_pixels(&self) -> PixelRect {
        let left = round_px(self.x);
        let top = round_px(self.y);
        let right = round_px(self.right()).max(left);
        let bottom = round_px(self.bottom()).max(top);
        PixelRect::new(left, top, right - left, bottom - top)
    }
}

/// Integer rectangle in container pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    /// Create a new pixel rectangle.
    #[inline]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge (exclusive).
    #[inline]
    pub const fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub const fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// Area in pixels.
    #[inline]
    pub const fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &PixelRect) -> PixelRect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        PixelRect::new(x, y, right - x, bottom - y)
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_nan() || value < 0.0 {
        0.0
    } else {
        value
    }
}

fn round_px(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    // `as` saturates for out-of-range floats.
    value.round() as i32
}

#[cfg(test)]
mod tests {
    use super::{Bounds, PixelRect, Point, Size};

    #[test]
    fn bounds_contains_both_edges() {
        let bounds = Bounds::new(10.0, 20.0, 30.0, 40.0);
        assert!(bounds.contains(Point::new(10.0, 20.0)));
        assert!(bounds.contains(Point::new(40.0, 60.0)));
        assert!(!bounds.contains(Point::new(40.5, 20.0)));
        assert!(!bounds.contains(Point::new(10.0, 60.5)));
    }

    #[test]
    fn empty_bounds_contain_nothing() {
        let bounds = Bounds::new(5.0, 5.0, 0.0, 10.0);
        assert!(!bounds.contains(Point::new(5.0, 5.0)));
    }

    #[test]
    fn pixel_rounding_rounds_edges_not_extents() {
        let left = Bounds::new(0.0, 0.0, 100.4, 10.0);
        let right = Bounds::new(100.4, 0.0, 100.2, 10.0);
        let left_px = left.to_pixels();
        let right_px = right.to_pixels();
        assert_eq!(left_px, PixelRect::new(0, 0, 100, 10));
        assert_eq!(left_px.right(), right_px.x);
        assert_eq!(right_px.right(), 201);
    }

    #[test]
    fn relative_position_handles_zero_extent() {
        let bounds = Bounds::new(0.0, 0.0, 0.0, 200.0);
        let rel = bounds.relative(Point::new(0.0, 50.0));
        assert_eq!(rel, Point::new(0.5, 0.25));
    }

    #[test]
    fn size_clamped_replaces_negative_and_nan() {
        let size = Size::new(-4.0, f64::NAN).clamped();
        assert_eq!(size, Size::new(0.0, 0.0));
        assert!(size.is_empty());
    }

    #[test]
    fn pixel_union_covers_both() {
        let a = PixelRect::new(0, 0, 10, 10);
        let b = PixelRect::new(5, 5, 10, 10);
        assert_eq!(a.union(&b), PixelRect::new(0, 0, 15, 15));
        assert_eq!(a.area(), 100);
    }
}
