//! Transform engine
//!
//! Pure geometric operations on annotations. Every function returns a new
//! annotation and leaves its input untouched; callers diff against the original
//! to decide what to persist.

use crate::annotation::{Annotation, Frame, Meta, Segment, Shape, TextBlock};
use crate::geometry::Point;

/// Translate all geometry by `(dx, dy)`.
pub fn translate(annotation: &Annotation, dx: f64, dy: f64) -> Annotation {
    annotation.with_shape(translate_shape(annotation.shape(), dx, dy))
}

fn translate_shape(shape: &Shape, dx: f64, dy: f64) -> Shape {
    let shift_frame = |f: &Frame| Frame::new(f.x + dx, f.y + dy, f.width, f.height);
    let shift_segment = |s: &Segment| Segment::new(s.start.offset(dx, dy), s.end.offset(dx, dy));
    let shift_points = |points: &[Point]| points.iter().map(|p| p.offset(dx, dy)).collect::<Vec<_>>();

    match shape {
        Shape::Rectangle(f) => Shape::Rectangle(shift_frame(f)),
        Shape::Circle(f) => Shape::Circle(shift_frame(f)),
        Shape::Ellipse(f) => Shape::Ellipse(shift_frame(f)),
        Shape::Line(s) => Shape::Line(shift_segment(s)),
        Shape::Arrow(s) => Shape::Arrow(shift_segment(s)),
        Shape::MeasureDistance(s) => Shape::MeasureDistance(shift_segment(s)),
        Shape::Text(text) => {
            Shape::Text(TextBlock { origin: text.origin.offset(dx, dy), ..text.clone() })
        }
        Shape::Pencil { points } => Shape::Pencil { points: shift_points(points) },
        Shape::Polygon { points } => Shape::Polygon { points: shift_points(points) },
        Shape::Polyline { points } => Shape::Polyline { points: shift_points(points) },
        Shape::MeasureAngle { points } => {
            Shape::MeasureAngle { points: points.map(|p| p.offset(dx, dy)) }
        }
    }
}

/// Replace the extents, keeping the anchor fixed.
///
/// Frames and segments take the new extents directly (signed values are allowed
/// mid-drag). Point-list shapes are scaled about the top-left of their bounding
/// box; a degenerate axis is left as is. Text has no extents and is unchanged.
pub fn resize(annotation: &Annotation, width: f64, height: f64) -> Annotation {
    let shape = match annotation.shape() {
        Shape::Rectangle(f) => Shape::Rectangle(Frame::new(f.x, f.y, width, height)),
        Shape::Circle(f) => Shape::Circle(Frame::new(f.x, f.y, width, height)),
        Shape::Ellipse(f) => Shape::Ellipse(Frame::new(f.x, f.y, width, height)),
        Shape::Line(s) => Shape::Line(resize_segment(s, width, height)),
        Shape::Arrow(s) => Shape::Arrow(resize_segment(s, width, height)),
        Shape::MeasureDistance(s) => Shape::MeasureDistance(resize_segment(s, width, height)),
        Shape::Text(_) => return annotation.clone(),
        Shape::Pencil { points } => Shape::Pencil { points: scale_points(points, width, height) },
        Shape::Polygon { points } => Shape::Polygon { points: scale_points(points, width, height) },
        Shape::Polyline { points } => {
            Shape::Polyline { points: scale_points(points, width, height) }
        }
        Shape::MeasureAngle { points } => {
            let scaled = scale_points(points, width, height);
            Shape::MeasureAngle { points: [scaled[0], scaled[1], scaled[2]] }
        }
    };
    annotation.with_shape(shape)
}

fn resize_segment(segment: &Segment, width: f64, height: f64) -> Segment {
    Segment::new(segment.start, segment.start.offset(width, height))
}

fn scale_points(points: &[Point], width: f64, height: f64) -> Vec<Point> {
    let Some(bounds) = crate::geometry::Rect::enclosing(points) else {
        return Vec::new();
    };
    let factor = |extent: f64, target: f64| if extent.abs() < 1e-9 { 1.0 } else { target / extent };
    let fx = factor(bounds.width, width);
    let fy = factor(bounds.height, height);
    points
        .iter()
        .map(|p| Point::new(bounds.x + (p.x - bounds.x) * fx, bounds.y + (p.y - bounds.y) * fy))
        .collect()
}

/// Horizontal flip.
///
/// Frames apply `x' = x + width, width' = -width` followed by normalization, which
/// covers the same area. Segments swap the x coordinates of their endpoints,
/// reversing horizontal direction in place. Point lists are reflected about the
/// vertical axis through their bounding-box center. Text is unchanged.
pub fn mirror(annotation: &Annotation) -> Annotation {
    let flip_frame = |f: &Frame| Frame::new(f.x + f.width, f.y, -f.width, f.height).normalized();
    let flip_segment = |s: &Segment| {
        Segment::new(Point::new(s.end.x, s.start.y), Point::new(s.start.x, s.end.y))
    };
    let axis = annotation.bounding_box().center().x;
    let reflect = |p: &Point| Point::new(2.0 * axis - p.x, p.y);

    let shape = match annotation.shape() {
        Shape::Rectangle(f) => Shape::Rectangle(flip_frame(f)),
        Shape::Circle(f) => Shape::Circle(flip_frame(f)),
        Shape::Ellipse(f) => Shape::Ellipse(flip_frame(f)),
        Shape::Line(s) => Shape::Line(flip_segment(s)),
        Shape::Arrow(s) => Shape::Arrow(flip_segment(s)),
        Shape::MeasureDistance(s) => Shape::MeasureDistance(flip_segment(s)),
        Shape::Text(_) => return annotation.clone(),
        Shape::Pencil { points } => Shape::Pencil { points: points.iter().map(reflect).collect() },
        Shape::Polygon { points } => Shape::Polygon { points: points.iter().map(reflect).collect() },
        Shape::Polyline { points } => {
            Shape::Polyline { points: points.iter().map(reflect).collect() }
        }
        Shape::MeasureAngle { points } => Shape::MeasureAngle { points: points.map(|p| reflect(&p)) },
    };
    annotation.with_shape(shape)
}

/// Accumulate `delta` radians into the rotation metadata. Text is never rotated.
pub fn rotate(annotation: &Annotation, delta: f64) -> Annotation {
    set_rotation(annotation, annotation.meta().rotation + delta)
}

/// Replace the rotation metadata. Text is never rotated.
pub fn set_rotation(annotation: &Annotation, radians: f64) -> Annotation {
    if matches!(annotation.shape(), Shape::Text(_)) {
        return annotation.clone();
    }
    annotation.with_meta(Meta { rotation: radians })
}

/// Unsaved copy offset by `offset` on both axes.
pub fn duplicate(annotation: &Annotation, offset: f64) -> Annotation {
    translate(&annotation.detached(), offset, offset)
}

/// The `count - 1` additional copies of an array, copy `i` offset by `(i*dx, i*dy)`.
///
/// The original is not included. A count below 2 yields nothing.
pub fn array(annotation: &Annotation, count: u32, dx: f64, dy: f64) -> Vec<Annotation> {
    let base = annotation.detached();
    (1..count.max(1))
        .map(|i| {
            let step = f64::from(i);
            translate(&base.detached(), dx * step, dy * step)
        })
        .collect()
}

/// Rotation handle drag.
///
/// Stores the pointer angle minus the current rotation at drag start, so later
/// pointer positions produce a rotation that tracks the cursor without jumping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationDrag {
    center: Point,
    baseline: f64,
}

impl RotationDrag {
    pub fn begin(annotation: &Annotation, pointer: Point) -> Self {
        let center = annotation.bounding_box().center();
        let baseline = pointer.angle_from(&center) - annotation.meta().rotation;
        Self { center, baseline }
    }

    pub fn center(&self) -> Point {
        self.center
    }

    /// Absolute rotation for the current pointer position.
    pub fn rotation_at(&self, pointer: Point) -> f64 {
        pointer.angle_from(&self.center) - self.baseline
    }
}
