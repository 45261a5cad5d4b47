//! Selection handles
//!
//! Small control points drawn around the selected annotation. Rectangles get
//! eight resize handles; every non-text annotation gets a rotation handle above
//! the top edge of its bounding box.

use crate::annotation::{Annotation, Shape};
use crate::geometry::Point;

/// Type of selection handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
    /// Above the bounding-box center
    Rotate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionHandle {
    pub kind: HandleKind,
    /// Center of the handle in document space
    pub position: Point,
}

impl SelectionHandle {
    /// Check if a point hits this handle
    pub fn hit_test(&self, point: &Point, radius: f64) -> bool {
        point.distance_to(&self.position) <= radius
    }
}

/// Position of the rotation handle, `offset` units above the bounding box.
///
/// `None` for text, which cannot rotate.
pub fn rotation_handle(annotation: &Annotation, offset: f64) -> Option<Point> {
    if matches!(annotation.shape(), Shape::Text(_)) {
        return None;
    }
    let bounds = annotation.bounding_box();
    Some(Point::new(bounds.center().x, bounds.y - offset))
}

/// Generate handles for the selected annotation.
pub fn selection_handles(annotation: &Annotation, rotation_offset: f64) -> Vec<SelectionHandle> {
    let mut handles = Vec::new();

    if let Shape::Rectangle(_) = annotation.shape() {
        let b = annotation.bounding_box();
        let (cx, cy) = (b.center().x, b.center().y);
        let corners = [
            (HandleKind::TopLeft, b.x, b.y),
            (HandleKind::Top, cx, b.y),
            (HandleKind::TopRight, b.max_x(), b.y),
            (HandleKind::Right, b.max_x(), cy),
            (HandleKind::BottomRight, b.max_x(), b.max_y()),
            (HandleKind::Bottom, cx, b.max_y()),
            (HandleKind::BottomLeft, b.x, b.max_y()),
            (HandleKind::Left, b.x, cy),
        ];
        handles.extend(
            corners
                .into_iter()
                .map(|(kind, x, y)| SelectionHandle { kind, position: Point::new(x, y) }),
        );
    }

    if let Some(position) = rotation_handle(annotation, rotation_offset) {
        handles.push(SelectionHandle { kind: HandleKind::Rotate, position });
    }

    handles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Frame, Owner, Segment, Style, TextBlock};

    fn annotate(shape: Shape) -> Annotation {
        Annotation::new(Owner::new(1, 1), 1, shape, Style::default())
    }

    #[test]
    fn rectangle_has_eight_handles_plus_rotation() {
        let rect = annotate(Shape::Rectangle(Frame::new(0.0, 40.0, 100.0, 50.0)));
        let handles = selection_handles(&rect, 30.0);
        assert_eq!(handles.len(), 9);
        let rotate = handles.iter().find(|h| h.kind == HandleKind::Rotate).unwrap();
        assert_eq!(rotate.position, Point::new(50.0, 10.0));
    }

    #[test]
    fn line_only_gets_rotation_handle() {
        let line = annotate(Shape::Line(Segment::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0))));
        let handles = selection_handles(&line, 30.0);
        assert_eq!(handles.len(), 1);
        assert!(handles[0].hit_test(&Point::new(5.0, -25.0), 10.0));
    }

    #[test]
    fn text_has_no_rotation_handle() {
        let text = annotate(Shape::Text(TextBlock {
            origin: Point::new(0.0, 0.0),
            content: "a".into(),
            font_size: 16.0,
        }));
        assert!(rotation_handle(&text, 30.0).is_none());
        assert!(selection_handles(&text, 30.0).is_empty());
    }
}
