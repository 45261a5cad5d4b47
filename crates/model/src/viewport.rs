//! Screen ↔ document coordinate mapping.

use crate::geometry::Point;
use serde::{Deserialize, Serialize};

/// On-screen zoom and pan applied on top of document space.
///
/// `screen = document * scale + pan`, so `document = (screen - pan) / scale`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub scale: f64,
    pub pan: Point,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self { scale: 1.0, pan: Point::default() }
    }
}

impl ViewTransform {
    pub fn new(scale: f64, pan: Point) -> Self {
        Self { scale, pan }
    }

    pub fn to_document(&self, screen: Point) -> Point {
        Point::new((screen.x - self.pan.x) / self.scale, (screen.y - self.pan.y) / self.scale)
    }

    pub fn to_screen(&self, document: Point) -> Point {
        Point::new(document.x * self.scale + self.pan.x, document.y * self.scale + self.pan.y)
    }

    /// Step the zoom by `delta`, clamped to `[min, max]`.
    pub fn zoomed(&self, delta: f64, min: f64, max: f64) -> Self {
        Self { scale: (self.scale + delta).clamp(min, max), ..*self }
    }

    pub fn panned_to(&self, pan: Point) -> Self {
        Self { pan, ..*self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_document_round_trip() {
        let view = ViewTransform::new(2.0, Point::new(10.0, 10.0));
        for (sx, sy) in [(0.0, 0.0), (110.0, 60.0), (-37.5, 999.25)] {
            let doc = view.to_document(Point::new(sx, sy));
            assert!((doc.x - (sx - 10.0) / 2.0).abs() < 1e-12);
            assert!((doc.y - (sy - 10.0) / 2.0).abs() < 1e-12);
            let back = view.to_screen(doc);
            assert!((back.x - sx).abs() < 1e-9 && (back.y - sy).abs() < 1e-9);
        }
    }

    #[test]
    fn zoom_is_clamped() {
        let view = ViewTransform::default();
        assert_eq!(view.zoomed(10.0, 0.25, 4.0).scale, 4.0);
        assert_eq!(view.zoomed(-10.0, 0.25, 4.0).scale, 0.25);
        assert_eq!(view.zoomed(0.25, 0.25, 4.0).scale, 1.25);
    }
}
