//! Annotation data model
//!
//! An annotation is a closed tagged union over shape kinds plus shared style and
//! transform metadata. Every per-kind behaviour (bounds, hit-testing, transforms,
//! painting) is a `match` over [`Shape`], so adding a kind is a compile error
//! everywhere it is not handled.

use crate::color::Color;
use crate::geometry::{point_near_segment, Point, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// In-memory identity of an annotation.
///
/// Stable for the lifetime of the editing session, including for annotations
/// whose remote save failed and therefore have no [`AnnotationId`].
pub type LocalKey = uuid::Uuid;

/// Identifier assigned by the persistence layer on first save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(pub i64);

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub i64);

/// Ownership keys. Opaque to the engine, carried through to persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
    pub project_id: ProjectId,
    pub file_id: FileId,
}

impl Owner {
    pub fn new(project_id: i64, file_id: i64) -> Self {
        Self { project_id: ProjectId(project_id), file_id: FileId(file_id) }
    }
}

/// Annotation type tag, as written to the `type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnnotationKind {
    Rectangle,
    Circle,
    Ellipse,
    Line,
    Arrow,
    Text,
    Pencil,
    Polygon,
    Polyline,
    MeasureDistance,
    MeasureAngle,
}

impl AnnotationKind {
    pub const ALL: [AnnotationKind; 11] = [
        AnnotationKind::Rectangle,
        AnnotationKind::Circle,
        AnnotationKind::Ellipse,
        AnnotationKind::Line,
        AnnotationKind::Arrow,
        AnnotationKind::Text,
        AnnotationKind::Pencil,
        AnnotationKind::Polygon,
        AnnotationKind::Polyline,
        AnnotationKind::MeasureDistance,
        AnnotationKind::MeasureAngle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationKind::Rectangle => "rectangle",
            AnnotationKind::Circle => "circle",
            AnnotationKind::Ellipse => "ellipse",
            AnnotationKind::Line => "line",
            AnnotationKind::Arrow => "arrow",
            AnnotationKind::Text => "text",
            AnnotationKind::Pencil => "pencil",
            AnnotationKind::Polygon => "polygon",
            AnnotationKind::Polyline => "polyline",
            AnnotationKind::MeasureDistance => "measure-distance",
            AnnotationKind::MeasureAngle => "measure-angle",
        }
    }

    /// Kinds whose geometry is a point list.
    pub fn uses_points(&self) -> bool {
        matches!(
            self,
            AnnotationKind::Pencil
                | AnnotationKind::Polygon
                | AnnotationKind::Polyline
                | AnnotationKind::MeasureAngle
        )
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown annotation type '{0}'")]
pub struct UnknownKind(pub String);

impl FromStr for AnnotationKind {
    type Err = UnknownKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        AnnotationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| UnknownKind(value.to_owned()))
    }
}

/// Anchor plus signed extents.
///
/// Negative extents are a valid transient state while dragging; [`Frame::normalized`]
/// moves the anchor so both extents are non-negative and the covered area is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Frame {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Frame spanning from `start` to `end`, extents signed by drag direction.
    pub fn spanning(start: Point, end: Point) -> Self {
        Self::new(start.x, start.y, end.x - start.x, end.y - start.y)
    }

    pub fn normalized(&self) -> Frame {
        let mut out = *self;
        if out.width < 0.0 {
            out.x += out.width;
            out.width = -out.width;
        }
        if out.height < 0.0 {
            out.y += out.height;
            out.height = -out.height;
        }
        out
    }

    pub fn is_normalized(&self) -> bool {
        self.width >= 0.0 && self.height >= 0.0
    }

    pub fn bounds(&self) -> Rect {
        let n = self.normalized();
        Rect::new(n.x, n.y, n.width, n.height)
    }
}

/// Directed segment for lines, arrows and distance measurements.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }
}

/// Free text anchored at its baseline origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub origin: Point,
    pub content: String,
    pub font_size: f64,
}

impl TextBlock {
    /// Estimated box around the glyphs.
    ///
    /// Exact metrics need a rendering context, so width is derived from the
    /// character count (8 units per character at 16pt; 4 characters for empty text).
    pub fn estimated_box(&self) -> Rect {
        let chars = match self.content.chars().count() {
            0 => 4,
            n => n,
        } as f64;
        let em = self.font_size / 16.0;
        let char_width = 8.0 * em;
        let ascent = 20.0 * em;
        Rect::new(self.origin.x - 5.0, self.origin.y - ascent, chars * char_width + 10.0, ascent + 5.0)
    }
}

/// Geometry of an annotation, one variant per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Shape {
    Rectangle(Frame),
    Circle(Frame),
    Ellipse(Frame),
    Line(Segment),
    Arrow(Segment),
    MeasureDistance(Segment),
    Text(TextBlock),
    Pencil { points: Vec<Point> },
    Polygon { points: Vec<Point> },
    Polyline { points: Vec<Point> },
    MeasureAngle { points: [Point; 3] },
}

impl Shape {
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Shape::Rectangle(_) => AnnotationKind::Rectangle,
            Shape::Circle(_) => AnnotationKind::Circle,
            Shape::Ellipse(_) => AnnotationKind::Ellipse,
            Shape::Line(_) => AnnotationKind::Line,
            Shape::Arrow(_) => AnnotationKind::Arrow,
            Shape::MeasureDistance(_) => AnnotationKind::MeasureDistance,
            Shape::Text(_) => AnnotationKind::Text,
            Shape::Pencil { .. } => AnnotationKind::Pencil,
            Shape::Polygon { .. } => AnnotationKind::Polygon,
            Shape::Polyline { .. } => AnnotationKind::Polyline,
            Shape::MeasureAngle { .. } => AnnotationKind::MeasureAngle,
        }
    }

    /// Build the drag-created shape of `kind` spanning `start`..`end`.
    ///
    /// Returns `None` for kinds that are not created by a single drag.
    pub fn dragged(kind: AnnotationKind, start: Point, end: Point) -> Option<Shape> {
        let frame = Frame::spanning(start, end);
        let segment = Segment::new(start, end);
        match kind {
            AnnotationKind::Rectangle => Some(Shape::Rectangle(frame)),
            AnnotationKind::Circle => Some(Shape::Circle(frame)),
            AnnotationKind::Ellipse => Some(Shape::Ellipse(frame)),
            AnnotationKind::Line => Some(Shape::Line(segment)),
            AnnotationKind::Arrow => Some(Shape::Arrow(segment)),
            AnnotationKind::MeasureDistance => Some(Shape::MeasureDistance(segment)),
            _ => None,
        }
    }

    /// Document-space anchor: top-left for frames, first point otherwise.
    pub fn anchor(&self) -> Point {
        match self {
            Shape::Rectangle(frame) | Shape::Circle(frame) | Shape::Ellipse(frame) => {
                Point::new(frame.x, frame.y)
            }
            Shape::Line(segment) | Shape::Arrow(segment) | Shape::MeasureDistance(segment) => {
                segment.start
            }
            Shape::Text(text) => text.origin,
            Shape::Pencil { points } | Shape::Polygon { points } | Shape::Polyline { points } => {
                points.first().copied().unwrap_or_default()
            }
            Shape::MeasureAngle { points } => points[0],
        }
    }

    /// Signed extents relative to the anchor.
    ///
    /// Point-list shapes report the size of their bounding box; text has none.
    pub fn extent(&self) -> (f64, f64) {
        match self {
            Shape::Rectangle(frame) | Shape::Circle(frame) | Shape::Ellipse(frame) => {
                (frame.width, frame.height)
            }
            Shape::Line(segment) | Shape::Arrow(segment) | Shape::MeasureDistance(segment) => {
                (segment.end.x - segment.start.x, segment.end.y - segment.start.y)
            }
            Shape::Text(_) => (0.0, 0.0),
            Shape::Pencil { .. }
            | Shape::Polygon { .. }
            | Shape::Polyline { .. }
            | Shape::MeasureAngle { .. } => {
                let bounds = self.bounding_box();
                (bounds.width, bounds.height)
            }
        }
    }

    /// The point list of point-based shapes.
    pub fn points(&self) -> Option<&[Point]> {
        match self {
            Shape::Pencil { points } | Shape::Polygon { points } | Shape::Polyline { points } => {
                Some(points)
            }
            Shape::MeasureAngle { points } => Some(points),
            _ => None,
        }
    }

    /// Axis-aligned bounding box, ignoring rotation.
    pub fn bounding_box(&self) -> Rect {
        match self {
            Shape::Rectangle(frame) | Shape::Ellipse(frame) => frame.bounds(),
            Shape::Circle(frame) => {
                let center = frame.bounds().center();
                let radius = circle_radius(frame);
                Rect::new(center.x - radius, center.y - radius, radius * 2.0, radius * 2.0)
            }
            Shape::Line(segment) | Shape::Arrow(segment) | Shape::MeasureDistance(segment) => {
                Rect::from_corners(segment.start, segment.end)
            }
            Shape::Text(text) => text.estimated_box(),
            Shape::Pencil { points } | Shape::Polygon { points } | Shape::Polyline { points } => {
                Rect::enclosing(points).unwrap_or_default()
            }
            Shape::MeasureAngle { points } => Rect::enclosing(points).unwrap_or_default(),
        }
    }

    /// Same shape with non-negative frame extents and unchanged covered area.
    ///
    /// Segments keep their direction; only frames carry signed extents.
    pub fn normalized(&self) -> Shape {
        match self {
            Shape::Rectangle(frame) => Shape::Rectangle(frame.normalized()),
            Shape::Circle(frame) => Shape::Circle(frame.normalized()),
            Shape::Ellipse(frame) => Shape::Ellipse(frame.normalized()),
            other => other.clone(),
        }
    }

    /// Precise hit test against the drawn outline.
    pub fn contains_point(&self, point: &Point, tolerance: f64) -> bool {
        match self {
            Shape::Rectangle(frame) => frame.bounds().contains(point, tolerance),
            Shape::Circle(frame) => {
                let center = frame.bounds().center();
                (point.distance_to(&center) - circle_radius(frame)).abs() <= tolerance
            }
            Shape::Ellipse(frame) => {
                let bounds = frame.bounds();
                let center = bounds.center();
                let radius_x = bounds.width / 2.0;
                let radius_y = bounds.height / 2.0;
                if radius_x < 1e-9 || radius_y < 1e-9 {
                    return bounds.contains(point, tolerance);
                }
                let dx = (point.x - center.x) / radius_x;
                let dy = (point.y - center.y) / radius_y;
                let dist = (dx * dx + dy * dy).sqrt();
                (dist - 1.0).abs() * radius_x.max(radius_y) <= tolerance
            }
            Shape::Line(segment) | Shape::Arrow(segment) | Shape::MeasureDistance(segment) => {
                point_near_segment(point, &segment.start, &segment.end, tolerance)
            }
            Shape::Text(text) => text.estimated_box().contains(point, 0.0),
            Shape::Pencil { points } | Shape::Polyline { points } => {
                near_path(point, points, false, tolerance)
            }
            Shape::Polygon { points } => near_path(point, points, true, tolerance),
            Shape::MeasureAngle { points } => near_path(point, points, false, tolerance),
        }
    }
}

fn near_path(point: &Point, points: &[Point], closed: bool, tolerance: f64) -> bool {
    match points {
        [] => false,
        [only] => point.distance_to(only) <= tolerance,
        _ => {
            let open = points.windows(2).any(|pair| point_near_segment(point, &pair[0], &pair[1], tolerance));
            let closing = closed
                && point_near_segment(point, &points[points.len() - 1], &points[0], tolerance);
            open || closing
        }
    }
}

/// Circle radius for a frame: half of the frame diagonal.
pub fn circle_radius(frame: &Frame) -> f64 {
    (frame.width * frame.width + frame.height * frame.height).sqrt() / 2.0
}

/// Which annotations respond to pointer hit-testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HitPolicy {
    /// Rectangles, lines and arrows by expanded bounding box; text by estimated box.
    /// Freehand, polygonal, circular and measurement shapes are not selectable.
    #[default]
    Reference,
    /// Every kind, tested against its drawn outline with rotation taken into account.
    AllShapes,
}

/// Stroke styling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub color: Color,
    pub line_width: f64,
}

impl Style {
    pub const DEFAULT_LINE_WIDTH: f64 = 2.0;

    pub fn new(color: Color, line_width: f64) -> Self {
        Self { color, line_width }
    }
}

impl Default for Style {
    fn default() -> Self {
        Self { color: Color::RED, line_width: Self::DEFAULT_LINE_WIDTH }
    }
}

/// Transform metadata applied at render time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Meta {
    /// Radians, about the bounding-box center.
    #[serde(default)]
    pub rotation: f64,
}

/// A single markup on one page of one file.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    key: LocalKey,
    id: Option<AnnotationId>,
    owner: Owner,
    /// 1-based page number
    page: u32,
    shape: Shape,
    style: Style,
    meta: Meta,
}

impl Annotation {
    /// Create an unsaved annotation with a fresh local key.
    pub fn new(owner: Owner, page: u32, shape: Shape, style: Style) -> Self {
        Self {
            key: LocalKey::new_v4(),
            id: None,
            owner,
            page: page.max(1),
            shape,
            style,
            meta: Meta::default(),
        }
    }

    /// Rebuild a persisted annotation.
    pub fn with_id(
        id: AnnotationId,
        owner: Owner,
        page: u32,
        shape: Shape,
        style: Style,
        meta: Meta,
    ) -> Self {
        Self { id: Some(id), meta, ..Self::new(owner, page, shape, style) }
    }

    pub fn key(&self) -> LocalKey {
        self.key
    }

    pub fn id(&self) -> Option<AnnotationId> {
        self.id
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn kind(&self) -> AnnotationKind {
        self.shape.kind()
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Effective rotation in radians. Text never rotates.
    pub fn rotation(&self) -> f64 {
        match self.shape {
            Shape::Text(_) => 0.0,
            _ => self.meta.rotation,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Record the identifier assigned by the persistence layer.
    pub fn assign_id(&mut self, id: AnnotationId) {
        self.id = Some(id);
    }

    /// Copy with the same local key and id but new geometry.
    pub fn with_shape(&self, shape: Shape) -> Self {
        Self { shape, ..self.clone() }
    }

    pub fn with_style(&self, style: Style) -> Self {
        Self { style, ..self.clone() }
    }

    pub fn with_meta(&self, meta: Meta) -> Self {
        Self { meta, ..self.clone() }
    }

    /// Copy with the same local key and id on another page.
    pub fn on_page(&self, page: u32) -> Self {
        Self { page: page.max(1), ..self.clone() }
    }

    /// Unsaved copy with a fresh local key and no remote id.
    pub fn detached(&self) -> Self {
        Self { key: LocalKey::new_v4(), id: None, ..self.clone() }
    }

    pub fn bounding_box(&self) -> Rect {
        self.shape.bounding_box()
    }

    /// Same annotation with non-negative extents (see [`Shape::normalized`]).
    pub fn normalized(&self) -> Self {
        self.with_shape(self.shape.normalized())
    }

    /// Hit test in document space under the given policy.
    pub fn hit_test(&self, point: &Point, tolerance: f64, policy: HitPolicy) -> bool {
        match policy {
            HitPolicy::Reference => match &self.shape {
                Shape::Rectangle(_) | Shape::Line(_) | Shape::Arrow(_) => {
                    self.shape.bounding_box().contains(point, tolerance)
                }
                Shape::Text(text) => text.estimated_box().contains(point, 0.0),
                _ => false,
            },
            HitPolicy::AllShapes => {
                let rotation = self.rotation();
                let probe = if rotation.abs() > f64::EPSILON {
                    rotate_about(point, &self.bounding_box().center(), -rotation)
                } else {
                    *point
                };
                self.shape.contains_point(&probe, tolerance)
            }
        }
    }
}

/// Rotate `point` about `center` by `radians` (positive is clockwise on screen).
pub fn rotate_about(point: &Point, center: &Point, radians: f64) -> Point {
    let (sin, cos) = radians.sin_cos();
    let dx = point.x - center.x;
    let dy = point.y - center.y;
    Point::new(center.x + dx * cos - dy * sin, center.y + dx * sin + dy * cos)
}
