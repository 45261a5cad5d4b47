//! Annotation ⇄ record encoding.
//!
//! Point lists and transform metadata have no column in the remote schema, so
//! for every kind except `text` they are written into the `text` field as JSON:
//!
//! ```json
//! {"points":[{"x":1.0,"y":2.0}],"meta":{"rotation":0.5,"line_width":2.0}}
//! ```
//!
//! Text records keep their content as plain text. Only a text whose font size
//! differs from [`DEFAULT_FONT_SIZE`] is wrapped as
//! `{"content":"…","meta":{"font_size":20.0}}`.
//!
//! Decoding also accepts what older clients wrote: a bare point array, a
//! `{"meta":…}` object, or free text. Anything that is not JSON is kept as
//! literal text and never fails the load.

use markup_model::annotation::{TextBlock, UnknownKind};
use markup_model::color::ParseColorError;
use markup_model::{
    Annotation, AnnotationKind, Color, Frame, Meta, Owner, Point, Segment, Shape, Style,
};
use serde::{Deserialize, Serialize};

use crate::record::AnnotationRecord;

/// Font size of text records that carry none.
pub const DEFAULT_FONT_SIZE: f64 = 16.0;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error(transparent)]
    UnknownKind(#[from] UnknownKind),
    #[error(transparent)]
    Color(#[from] ParseColorError),
    #[error("{kind} record has no point list")]
    MissingPoints { kind: AnnotationKind },
    #[error("measure-angle record needs exactly 3 points, found {found}")]
    AngleArity { found: usize },
    #[error("cannot encode payload: {0}")]
    Payload(#[from] serde_json::Error),
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct EncodedMeta {
    #[serde(default)]
    rotation: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    line_width: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    flip_x: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    flip_y: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    font_size: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct EncodedPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    points: Option<Vec<Point>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    meta: Option<EncodedMeta>,
}

/// What the `text` field turned out to hold.
#[derive(Debug, Clone, PartialEq)]
enum TextField {
    Structured(EncodedPayload),
    Literal(String),
}

fn parse_text_field(text: &str) -> TextField {
    let literal = || TextField::Literal(text.to_owned());
    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
        return literal();
    };

    let parsed = if value.is_array() {
        serde_json::from_value::<Vec<Point>>(value)
            .map(|points| EncodedPayload { points: Some(points), ..EncodedPayload::default() })
    } else if value.get("points").is_some() || value.get("meta").is_some() {
        serde_json::from_value::<EncodedPayload>(value)
    } else {
        return literal();
    };

    parsed.map(TextField::Structured).unwrap_or_else(|_| literal())
}

/// Encode an annotation for create/update. Extents are always normalized.
pub fn encode(annotation: &Annotation) -> Result<AnnotationRecord, CodecError> {
    let owner = annotation.owner();
    let style = annotation.style();
    let mut meta = EncodedMeta {
        rotation: annotation.rotation(),
        line_width: Some(style.line_width),
        ..EncodedMeta::default()
    };

    let (x, y, width, height, points) = match annotation.shape() {
        Shape::Rectangle(frame) | Shape::Circle(frame) | Shape::Ellipse(frame) => {
            let n = frame.normalized();
            (n.x, n.y, n.width, n.height, None)
        }
        Shape::Line(segment) | Shape::Arrow(segment) | Shape::MeasureDistance(segment) => {
            meta.flip_x = segment.end.x < segment.start.x;
            meta.flip_y = segment.end.y < segment.start.y;
            let bounds = annotation.bounding_box();
            (bounds.x, bounds.y, bounds.width, bounds.height, None)
        }
        Shape::Text(text) => (text.origin.x, text.origin.y, 0.0, 0.0, None),
        Shape::Pencil { .. }
        | Shape::Polygon { .. }
        | Shape::Polyline { .. }
        | Shape::MeasureAngle { .. } => {
            let bounds = annotation.bounding_box();
            let points = annotation.shape().points().map(<[Point]>::to_vec);
            (bounds.x, bounds.y, bounds.width, bounds.height, points)
        }
    };

    let text = match annotation.shape() {
        Shape::Text(text) if text.font_size == DEFAULT_FONT_SIZE => text.content.clone(),
        Shape::Text(text) => {
            let meta = EncodedMeta { font_size: Some(text.font_size), ..EncodedMeta::default() };
            let payload = EncodedPayload {
                content: Some(text.content.clone()),
                meta: Some(meta),
                ..EncodedPayload::default()
            };
            serde_json::to_string(&payload)?
        }
        _ => {
            let payload = EncodedPayload { points, meta: Some(meta), ..EncodedPayload::default() };
            serde_json::to_string(&payload)?
        }
    };

    Ok(AnnotationRecord {
        id: annotation.id(),
        project_id: owner.project_id.0,
        file_id: owner.file_id.0,
        kind: annotation.kind().as_str().to_owned(),
        x,
        y,
        width: Some(width),
        height: Some(height),
        text: Some(text),
        color: style.color.to_string(),
        page: annotation.page(),
    })
}

/// Rebuild an annotation from a stored record.
pub fn decode(record: &AnnotationRecord) -> Result<Annotation, CodecError> {
    let kind: AnnotationKind = record.kind.parse()?;
    let color: Color = record.color.parse()?;
    let owner = Owner::new(record.project_id, record.file_id);
    let width = record.width.unwrap_or(0.0);
    let height = record.height.unwrap_or(0.0);
    let raw_text = record.text.as_deref().unwrap_or("");

    let payload = match parse_text_field(raw_text) {
        TextField::Structured(payload) if kind != AnnotationKind::Text || payload.content.is_some() => {
            payload
        }
        _ => EncodedPayload::default(),
    };
    let meta = payload.meta.clone().unwrap_or_default();

    let frame = || Frame::new(record.x, record.y, width, height).normalized();
    let segment = || {
        let (x0, x1) = if meta.flip_x { (record.x + width, record.x) } else { (record.x, record.x + width) };
        let (y0, y1) = if meta.flip_y { (record.y + height, record.y) } else { (record.y, record.y + height) };
        Segment::new(Point::new(x0, y0), Point::new(x1, y1))
    };
    let points = || payload.points.clone().ok_or(CodecError::MissingPoints { kind });

    let shape = match kind {
        AnnotationKind::Rectangle => Shape::Rectangle(frame()),
        AnnotationKind::Circle => Shape::Circle(frame()),
        AnnotationKind::Ellipse => Shape::Ellipse(frame()),
        AnnotationKind::Line => Shape::Line(segment()),
        AnnotationKind::Arrow => Shape::Arrow(segment()),
        AnnotationKind::MeasureDistance => Shape::MeasureDistance(segment()),
        AnnotationKind::Text => Shape::Text(TextBlock {
            origin: Point::new(record.x, record.y),
            content: payload.content.clone().unwrap_or_else(|| raw_text.to_owned()),
            font_size: meta.font_size.unwrap_or(DEFAULT_FONT_SIZE),
        }),
        AnnotationKind::Pencil => Shape::Pencil { points: points()? },
        AnnotationKind::Polygon => Shape::Polygon { points: points()? },
        AnnotationKind::Polyline => Shape::Polyline { points: points()? },
        AnnotationKind::MeasureAngle => {
            let points = points()?;
            match <[Point; 3]>::try_from(points.as_slice()) {
                Ok(points) => Shape::MeasureAngle { points },
                Err(_) => return Err(CodecError::AngleArity { found: points.len() }),
            }
        }
    };

    let style = Style::new(color, meta.line_width.unwrap_or(Style::DEFAULT_LINE_WIDTH));
    let meta = Meta { rotation: meta.rotation };
    let annotation = match record.id {
        Some(id) => Annotation::with_id(id, owner, record.page, shape, style, meta),
        None => Annotation::new(owner, record.page, shape, style).with_meta(meta),
    };
    Ok(annotation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use markup_model::AnnotationId;

    fn owner() -> Owner {
        Owner::new(1, 4)
    }

    fn record(kind: &str, x: f64, y: f64, w: f64, h: f64, text: &str) -> AnnotationRecord {
        AnnotationRecord {
            id: Some(AnnotationId(7)),
            project_id: 1,
            file_id: 4,
            kind: kind.into(),
            x,
            y,
            width: Some(w),
            height: Some(h),
            text: Some(text.into()),
            color: "#00FF00".into(),
            page: 2,
        }
    }

    #[test]
    fn negative_extents_are_normalized_on_encode() {
        let annotation = Annotation::new(
            owner(),
            1,
            Shape::Rectangle(Frame::new(150.0, 100.0, -100.0, -50.0)),
            Style::default(),
        );
        let encoded = encode(&annotation).unwrap();
        assert_eq!((encoded.x, encoded.y), (50.0, 50.0));
        assert_eq!((encoded.width, encoded.height), (Some(100.0), Some(50.0)));
    }

    #[test]
    fn segment_direction_survives_round_trip() {
        let arrow = Annotation::new(
            owner(),
            1,
            Shape::Arrow(Segment::new(Point::new(100.0, 80.0), Point::new(20.0, 10.0))),
            Style::new(Color::BLUE, 3.0),
        );
        let encoded = encode(&arrow).unwrap();
        assert!(encoded.width.unwrap() >= 0.0 && encoded.height.unwrap() >= 0.0);

        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.shape(), arrow.shape());
        assert_eq!(decoded.style(), arrow.style());
    }

    #[test]
    fn points_and_rotation_travel_in_text() {
        let polygon = Annotation::new(
            owner(),
            3,
            Shape::Polygon {
                points: vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(5.0, 8.0)],
            },
            Style::default(),
        )
        .with_meta(Meta { rotation: 0.75 });

        let encoded = encode(&polygon).unwrap();
        assert_eq!(encoded.width, Some(10.0));
        let text: serde_json::Value = serde_json::from_str(encoded.text.as_deref().unwrap()).unwrap();
        assert_eq!(text["meta"]["rotation"], 0.75);
        assert_eq!(text["points"].as_array().unwrap().len(), 3);

        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.shape(), polygon.shape());
        assert_eq!(decoded.meta().rotation, 0.75);
        assert_eq!(decoded.page(), 3);
    }

    #[test]
    fn text_is_stored_literally() {
        let note = Annotation::new(
            owner(),
            2,
            Shape::Text(TextBlock {
                origin: Point::new(20.0, 20.0),
                content: "{not json".into(),
                font_size: DEFAULT_FONT_SIZE,
            }),
            Style::default(),
        );
        let encoded = encode(&note).unwrap();
        assert_eq!(encoded.text.as_deref(), Some("{not json"));
        assert_eq!(decode(&encoded).unwrap().shape(), note.shape());
    }

    #[test]
    fn custom_font_size_round_trips() {
        let note = Annotation::new(
            owner(),
            1,
            Shape::Text(TextBlock {
                origin: Point::new(5.0, 40.0),
                content: "Level 2".into(),
                font_size: 24.0,
            }),
            Style::default(),
        );
        let encoded = encode(&note).unwrap();
        let text: serde_json::Value = serde_json::from_str(encoded.text.as_deref().unwrap()).unwrap();
        assert_eq!(text["content"], "Level 2");
        assert_eq!(text["meta"]["font_size"], 24.0);

        assert_eq!(decode(&encoded).unwrap().shape(), note.shape());
    }

    #[test]
    fn text_that_looks_like_a_payload_stays_literal() {
        let typed = record("text", 1.0, 2.0, 0.0, 0.0, r#"{"meta":{"rotation":1.0}}"#);
        let Shape::Text(text) = decode(&typed).unwrap().shape().clone() else {
            panic!("expected text");
        };
        assert_eq!(text.content, r#"{"meta":{"rotation":1.0}}"#);
        assert_eq!(text.font_size, DEFAULT_FONT_SIZE);
    }

    #[test]
    fn legacy_bare_point_array_decodes() {
        let legacy = record("pencil", 0.0, 0.0, 0.0, 0.0, r#"[{"x":1,"y":2},{"x":3,"y":4}]"#);
        let decoded = decode(&legacy).unwrap();
        assert_eq!(decoded.shape().points().unwrap(), &[Point::new(1.0, 2.0), Point::new(3.0, 4.0)]);
        assert_eq!(decoded.id(), Some(AnnotationId(7)));
        assert_eq!(decoded.style().color, Color::GREEN);
    }

    #[test]
    fn legacy_meta_only_payload_decodes() {
        let legacy = record("rectangle", 10.0, 10.0, 30.0, 20.0, r#"{"meta":{"rotation":1.5}}"#);
        let decoded = decode(&legacy).unwrap();
        assert_eq!(decoded.meta().rotation, 1.5);
        assert_eq!(decoded.style().line_width, Style::DEFAULT_LINE_WIDTH);
    }

    #[test]
    fn legacy_signed_line_decodes_with_direction() {
        let legacy = record("line", 100.0, 100.0, -40.0, 30.0, "");
        let decoded = decode(&legacy).unwrap();
        assert_eq!(
            decoded.shape(),
            &Shape::Line(Segment::new(Point::new(100.0, 100.0), Point::new(60.0, 130.0)))
        );
    }

    #[test]
    fn garbage_text_does_not_fail_frames() {
        let odd = record("ellipse", 0.0, 0.0, 10.0, 10.0, "hello {");
        assert!(decode(&odd).is_ok());
    }

    #[test]
    fn malformed_point_records_are_errors() {
        assert!(matches!(
            decode(&record("pencil", 0.0, 0.0, 0.0, 0.0, "not json")),
            Err(CodecError::MissingPoints { kind: AnnotationKind::Pencil })
        ));
        assert!(matches!(
            decode(&record("measure-angle", 0.0, 0.0, 0.0, 0.0, r#"[{"x":1,"y":2}]"#)),
            Err(CodecError::AngleArity { found: 1 })
        ));
        assert!(decode(&record("hexagon", 0.0, 0.0, 0.0, 0.0, "")).is_err());
    }
}
