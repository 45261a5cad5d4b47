//! Document-space primitives.
//!
//! All coordinates are in document space: the fixed frame of a page rendered at
//! the reference width, origin at the top-left, y growing downward. One unit is
//! one pixel of the reference render.

use serde::{Deserialize, Serialize};

/// A point in document space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    /// Angle of the vector from `origin` to this point, in radians.
    pub fn angle_from(&self, origin: &Point) -> f64 {
        (self.y - origin.y).atan2(self.x - origin.x)
    }
}

/// Axis-aligned rectangle with non-negative extents.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Build from two arbitrary corners.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let min_x = a.x.min(b.x);
        let min_y = a.y.min(b.y);
        Self { x: min_x, y: min_y, width: (a.x - b.x).abs(), height: (a.y - b.y).abs() }
    }

    /// Smallest rectangle enclosing all points. `None` for an empty slice.
    pub fn enclosing(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for point in &points[1..] {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Containment test with the rectangle grown by `tolerance` on every side.
    pub fn contains(&self, point: &Point, tolerance: f64) -> bool {
        point.x >= self.x - tolerance
            && point.x <= self.max_x() + tolerance
            && point.y >= self.y - tolerance
            && point.y <= self.max_y() + tolerance
    }
}

/// Whether `point` lies within `tolerance` of the segment `start`..`end`.
pub fn point_near_segment(point: &Point, start: &Point, end: &Point, tolerance: f64) -> bool {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length_sq = dx * dx + dy * dy;

    if length_sq < 1e-9 {
        return point.distance_to(start) <= tolerance;
    }

    let t = (((point.x - start.x) * dx + (point.y - start.y) * dy) / length_sq).clamp(0.0, 1.0);
    let closest = Point::new(start.x + t * dx, start.y + t * dy);
    point.distance_to(&closest) <= tolerance
}

/// Wrap an angle into `[0, 2π)`.
pub fn wrap_angle(radians: f64) -> f64 {
    let tau = std::f64::consts::TAU;
    let wrapped = radians % tau;
    if wrapped < 0.0 {
        wrapped + tau
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn rect_from_corners_normalizes() {
        let rect = Rect::from_corners(Point::new(150.0, 100.0), Point::new(50.0, 50.0));
        assert_eq!(rect, Rect::new(50.0, 50.0, 100.0, 50.0));
    }

    #[test]
    fn enclosing_rect_spans_all_points() {
        let points = [Point::new(10.0, 40.0), Point::new(-5.0, 12.0), Point::new(30.0, 0.0)];
        let rect = Rect::enclosing(&points).unwrap();
        assert_eq!(rect, Rect::new(-5.0, 0.0, 35.0, 40.0));
        assert!(Rect::enclosing(&[]).is_none());
    }

    #[test]
    fn tolerance_grows_containment() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(!rect.contains(&Point::new(15.0, 5.0), 0.0));
        assert!(rect.contains(&Point::new(15.0, 5.0), 10.0));
    }

    #[test]
    fn segment_proximity() {
        let start = Point::new(0.0, 0.0);
        let end = Point::new(100.0, 0.0);
        assert!(point_near_segment(&Point::new(50.0, 3.0), &start, &end, 5.0));
        assert!(!point_near_segment(&Point::new(50.0, 8.0), &start, &end, 5.0));
        assert!(!point_near_segment(&Point::new(110.0, 0.0), &start, &end, 5.0));
    }

    #[test]
    fn wrap_angle_stays_in_range() {
        let tau = std::f64::consts::TAU;
        assert!((wrap_angle(-0.5) - (tau - 0.5)).abs() < 1e-12);
        assert!((wrap_angle(tau + 0.25) - 0.25).abs() < 1e-12);
    }
}
