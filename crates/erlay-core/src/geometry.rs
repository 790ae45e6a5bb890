//! Geometric primitives for diagram layout and positioning.
//!
//! # Overview
//!
//! - [`Point`] - A 2D coordinate in diagram space
//! - [`Size`] - Width and height dimensions
//! - [`Bounds`] - A rectangular bounding box defined by minimum and maximum coordinates
//!
//! # Coordinate System
//!
//! Erlay uses a coordinate system consistent with SVG:
//!
//! ```text
//!   (0,0) ────────► +X   (layers grow rightward)
//!     │
//!     │
//!     ▼
//!    +Y                  (entities stack downward within a layer)
//! ```

/// A 2D point representing a position in diagram coordinate space.
///
/// # Examples
///
/// ```
/// # use erlay_core::geometry::{Point, Size};
/// let corner = Point::new(10.0, 20.0);
///
/// let bounds = corner.to_bounds(Size::new(100.0, 40.0));
/// assert_eq!(bounds.min_point(), corner);
/// assert_eq!(bounds.center(), Point::new(60.0, 40.0));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    x: f32,
    y: f32,
}

impl Point {
    /// Creates a new point with the specified coordinates
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns the x-coordinate of the point
    pub fn x(self) -> f32 {
        self.x
    }

    /// Returns the y-coordinate of the point
    pub fn y(self) -> f32 {
        self.y
    }

    /// Converts this point, taken as a top-left corner, into bounds of the given size
    pub fn to_bounds(self, size: Size) -> Bounds {
        Bounds {
            min_x: self.x,
            min_y: self.y,
            max_x: self.x + size.width(),
            max_y: self.y + size.height(),
        }
    }
}

/// Width and height of a box.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    width: f32,
    height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Returns the width
    pub fn width(self) -> f32 {
        self.width
    }

    /// Returns the height
    pub fn height(self) -> f32 {
        self.height
    }
}

/// An axis-aligned rectangle.
///
/// # Examples
///
/// ```
/// # use erlay_core::geometry::{Point, Size};
/// let a = Point::new(0.0, 0.0).to_bounds(Size::new(10.0, 10.0));
/// let b = Point::new(20.0, 5.0).to_bounds(Size::new(10.0, 10.0));
///
/// let merged = a.merge(&b);
/// assert_eq!(merged.width(), 30.0);
/// assert_eq!(merged.height(), 15.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
}

impl Bounds {
    pub fn min_x(self) -> f32 {
        self.min_x
    }

    pub fn min_y(self) -> f32 {
        self.min_y
    }

    pub fn max_y(self) -> f32 {
        self.max_y
    }

    pub fn width(self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(self) -> f32 {
        self.max_y - self.min_y
    }

    /// Returns the top-left corner
    pub fn min_point(self) -> Point {
        Point::new(self.min_x, self.min_y)
    }

    /// Returns the center point
    pub fn center(self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Returns the smallest bounds containing both `self` and `other`
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Returns `true` if the interiors of the two bounds intersect.
    ///
    /// Touching edges do not count as an overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;

    #[test]
    fn test_bounds_from_top_left() {
        let bounds = Point::new(10.0, 20.0).to_bounds(Size::new(100.0, 50.0));

        assert_approx_eq!(f32, bounds.min_x(), 10.0);
        assert_approx_eq!(f32, bounds.min_y(), 20.0);
        assert_approx_eq!(f32, bounds.width(), 100.0);
        assert_approx_eq!(f32, bounds.max_y(), 70.0);
        assert_eq!(bounds.center(), Point::new(60.0, 45.0));
        assert_eq!(bounds.min_point(), Point::new(10.0, 20.0));
    }

    #[test]
    fn test_bounds_overlap() {
        let a = Point::new(0.0, 0.0).to_bounds(Size::new(10.0, 10.0));
        let touching = Point::new(0.0, 10.0).to_bounds(Size::new(10.0, 10.0));
        let inside = Point::new(5.0, 5.0).to_bounds(Size::new(1.0, 1.0));

        assert!(!a.overlaps(&touching));
        assert!(a.overlaps(&inside));
        assert!(inside.overlaps(&a));
    }
}
