//! Annotation painter
//!
//! Draws annotations in document space onto a `tiny-skia` pixmap. A
//! [`ViewTransform`] maps document space onto the pixmap; exports paint at
//! scale 1 because the page bitmap already is the document frame.

use std::f64::consts::{FRAC_PI_6, TAU};

use image::Rgba;
use markup_editor::config::DrawingConfig;
use markup_model::handles::{rotation_handle, selection_handles, HandleKind};
use markup_model::units::{format_angle, interior_angle};
use markup_model::{Annotation, Color, MeasurementUnit, Point, Segment, Shape, TextBlock, ViewTransform};
use markup_pages::RgbaImage;
use rusttype::{point as glyph_point, Font, Scale};
use tiny_skia::{ColorU8, FillRule, Paint, Path, PathBuilder, Pixmap, Stroke, StrokeDash, Transform};

use crate::font::{label_font, text_width};

const ARROW_HEAD: f64 = 15.0;
const ANGLE_ARC_RADIUS: f64 = 30.0;
const ANGLE_LABEL_OFFSET: f64 = 40.0;
const LABEL_SIZE: f64 = 14.0;
const HANDLE_SIZE: f64 = 6.0;
const ROTATION_KNOB_RADIUS: f64 = 6.0;
const PREVIEW_DOT_RADIUS: f64 = 5.0;

/// Settings that change how annotations look, not what they are.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintOptions {
    pub unit: MeasurementUnit,
    pub rotation_handle_offset: f64,
}

impl Default for PaintOptions {
    fn default() -> Self {
        Self { unit: MeasurementUnit::Px, rotation_handle_offset: 30.0 }
    }
}

impl PaintOptions {
    pub fn from_config(drawing: &DrawingConfig) -> Self {
        Self { unit: drawing.measurement_unit, rotation_handle_offset: drawing.rotation_handle_offset }
    }
}

pub struct Painter<'p> {
    pixmap: &'p mut Pixmap,
    view: ViewTransform,
    options: PaintOptions,
    font: Option<&'static Font<'static>>,
}

impl<'p> Painter<'p> {
    pub fn new(pixmap: &'p mut Pixmap, view: ViewTransform, options: PaintOptions) -> Self {
        Self { pixmap, view, options, font: label_font() }
    }

    fn base(&self) -> Transform {
        let scale = self.view.scale as f32;
        Transform::from_row(scale, 0.0, 0.0, scale, self.view.pan.x as f32, self.view.pan.y as f32)
    }

    /// Base transform plus the annotation's rotation about its bounding-box center.
    fn transform_for(&self, annotation: &Annotation) -> Transform {
        let rotation = annotation.rotation();
        if rotation.abs() <= f64::EPSILON || matches!(annotation.shape(), Shape::Text(_)) {
            return self.base();
        }
        let center = annotation.bounding_box().center();
        self.base().pre_concat(Transform::from_rotate_at(
            rotation.to_degrees() as f32,
            center.x as f32,
            center.y as f32,
        ))
    }

    pub fn annotation(&mut self, annotation: &Annotation) {
        let ts = self.transform_for(annotation);
        let style = *annotation.style();
        let (color, width) = (style.color, style.line_width);

        match annotation.shape() {
            Shape::Rectangle(frame) => {
                let b = frame.bounds();
                let corners = [
                    Point::new(b.x, b.y),
                    Point::new(b.max_x(), b.y),
                    Point::new(b.max_x(), b.max_y()),
                    Point::new(b.x, b.max_y()),
                ];
                self.stroke(polyline_path(&corners, true), color, width, false, ts);
            }
            Shape::Circle(frame) => {
                let center = frame.bounds().center();
                let radius = markup_model::annotation::circle_radius(frame);
                let path = PathBuilder::from_circle(center.x as f32, center.y as f32, radius as f32);
                self.stroke(path, color, width, false, ts);
            }
            Shape::Ellipse(frame) => {
                let b = frame.bounds();
                let mut pb = PathBuilder::new();
                if let Some(oval) =
                    tiny_skia::Rect::from_xywh(b.x as f32, b.y as f32, b.width as f32, b.height as f32)
                {
                    pb.push_oval(oval);
                }
                self.stroke(pb.finish(), color, width, false, ts);
            }
            Shape::Line(segment) => {
                self.stroke(polyline_path(&[segment.start, segment.end], false), color, width, false, ts);
            }
            Shape::Arrow(segment) => self.arrow(segment, color, width, ts),
            Shape::MeasureDistance(segment) => self.distance(segment, color, width, ts),
            Shape::Text(block) => self.text(block, color),
            Shape::Pencil { points } | Shape::Polyline { points } => {
                if points.len() > 1 {
                    self.stroke(polyline_path(points, false), color, width, false, ts);
                }
            }
            Shape::Polygon { points } => {
                if points.len() > 1 {
                    self.stroke(polyline_path(points, true), color, width, false, ts);
                }
            }
            Shape::MeasureAngle { points } => self.angle(points, color, width, ts),
        }
    }

    /// Numbered dots for the points collected so far by the angle tool.
    pub fn angle_preview(&mut self, points: &[Point]) {
        let ts = self.base();
        for (index, at) in points.iter().enumerate() {
            let dot = PathBuilder::from_circle(at.x as f32, at.y as f32, PREVIEW_DOT_RADIUS as f32);
            self.fill(dot, Color::MEASURE_DISTANCE, ts);
            let label = (index + 1).to_string();
            self.glyphs(&label, ts_point(ts, at.offset(-3.0, 4.0)), 12.0 * self.view.scale, Color::WHITE);
        }
    }

    /// Handles and outlines for the selected annotation.
    pub fn selection(&mut self, annotation: &Annotation) {
        if let Shape::Text(block) = annotation.shape() {
            self.text_outline(block);
            return;
        }

        let ts = self.transform_for(annotation);
        let half = HANDLE_SIZE / 2.0;
        for handle in selection_handles(annotation, self.options.rotation_handle_offset) {
            if handle.kind == HandleKind::Rotate {
                continue;
            }
            let at = handle.position;
            let square = [
                Point::new(at.x - half, at.y - half),
                Point::new(at.x + half, at.y - half),
                Point::new(at.x + half, at.y + half),
                Point::new(at.x - half, at.y + half),
            ];
            self.fill(polyline_path(&square, true), Color::WHITE, ts);
            self.stroke(polyline_path(&square, true), Color::SELECTION, 2.0, false, ts);
        }

        if let Some(knob) = rotation_handle(annotation, self.options.rotation_handle_offset) {
            let path = PathBuilder::from_circle(knob.x as f32, knob.y as f32, ROTATION_KNOB_RADIUS as f32);
            self.fill(path, Color::ROTATION_HANDLE, self.base());
        }
    }

    fn text_outline(&mut self, block: &TextBlock) {
        let em = block.font_size / 16.0;
        let estimated = block.estimated_box();
        let width = match self.font {
            Some(font) => f64::from(text_width(Some(font), &block.content, block.font_size as f32)) + 10.0,
            None => estimated.width,
        };
        let (x, y, height) = (estimated.x, block.origin.y - 20.0 * em, 25.0 * em);
        let outline = [
            Point::new(x, y),
            Point::new(x + width, y),
            Point::new(x + width, y + height),
            Point::new(x, y + height),
        ];
        self.stroke(polyline_path(&outline, true), Color::SELECTION, 1.0, true, self.base());
    }

    fn arrow(&mut self, segment: &Segment, color: Color, width: f64, ts: Transform) {
        let (start, end) = (segment.start, segment.end);
        let angle = end.angle_from(&start);
        let barb = |offset: f64| {
            Point::new(
                end.x - ARROW_HEAD * (angle + offset).cos(),
                end.y - ARROW_HEAD * (angle + offset).sin(),
            )
        };

        let mut pb = PathBuilder::new();
        pb.move_to(start.x as f32, start.y as f32);
        pb.line_to(end.x as f32, end.y as f32);
        for tip in [barb(-FRAC_PI_6), barb(FRAC_PI_6)] {
            pb.move_to(end.x as f32, end.y as f32);
            pb.line_to(tip.x as f32, tip.y as f32);
        }
        self.stroke(pb.finish(), color, width, false, ts);
    }

    fn distance(&mut self, segment: &Segment, color: Color, width: f64, ts: Transform) {
        self.stroke(polyline_path(&[segment.start, segment.end], false), color, width, true, ts);

        let label = self.options.unit.format_distance(segment.length());
        let mid = Point::new(
            (segment.start.x + segment.end.x) / 2.0,
            (segment.start.y + segment.end.y) / 2.0,
        );
        let anchor = ts_point(ts, mid);
        let scale = self.view.scale;
        let size = LABEL_SIZE * scale;
        let label_width = f64::from(text_width(self.font, &label, size as f32));

        let backdrop = tiny_skia::Rect::from_xywh(
            (anchor.x - label_width / 2.0 - 4.0 * scale) as f32,
            (anchor.y - 12.0 * scale) as f32,
            (label_width + 8.0 * scale) as f32,
            (20.0 * scale) as f32,
        );
        if let Some(backdrop) = backdrop {
            let mut paint = Paint::default();
            paint.set_color_rgba8(255, 255, 255, 230);
            self.pixmap.fill_rect(backdrop, &paint, Transform::identity(), None);
        }
        self.glyphs(&label, Point::new(anchor.x - label_width / 2.0, anchor.y + 4.0 * scale), size, color);
    }

    fn angle(&mut self, points: &[Point; 3], color: Color, width: f64, ts: Transform) {
        let [first, vertex, last] = points;
        self.stroke(polyline_path(points, false), color, width, true, ts);

        let start = first.angle_from(vertex);
        let mut end = last.angle_from(vertex);
        if end < start {
            end += TAU;
        }
        let steps = 32;
        let arc: Vec<Point> = (0..=steps)
            .map(|step| {
                let theta = start + (end - start) * f64::from(step) / f64::from(steps);
                Point::new(
                    vertex.x + ANGLE_ARC_RADIUS * theta.cos(),
                    vertex.y + ANGLE_ARC_RADIUS * theta.sin(),
                )
            })
            .collect();
        self.stroke(polyline_path(&arc, false), color, width, false, ts);

        let label = format_angle(interior_angle(first, vertex, last));
        let anchor = ts_point(ts, vertex.offset(ANGLE_LABEL_OFFSET, 0.0));
        self.glyphs(&label, anchor, LABEL_SIZE * self.view.scale, color);
    }

    fn text(&mut self, block: &TextBlock, color: Color) {
        let origin = self.view.to_screen(block.origin);
        self.glyphs(&block.content, origin, block.font_size * self.view.scale, color);
    }

    /// Rasterize `text` with its baseline starting at `origin` in pixmap space.
    fn glyphs(&mut self, text: &str, origin: Point, size: f64, color: Color) {
        let Some(font) = self.font else {
            return;
        };
        let scale = Scale::uniform(size as f32);
        let start = glyph_point(origin.x as f32, origin.y as f32);
        let pixmap = &mut *self.pixmap;
        for glyph in font.layout(text, scale, start) {
            if let Some(bounds) = glyph.pixel_bounding_box() {
                glyph.draw(|gx, gy, coverage| {
                    blend_pixel(pixmap, gx as i32 + bounds.min.x, gy as i32 + bounds.min.y, color, coverage);
                });
            }
        }
    }

    fn stroke(&mut self, path: Option<Path>, color: Color, width: f64, dashed: bool, ts: Transform) {
        let Some(path) = path else {
            return;
        };
        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r, color.g, color.b, color.a);
        paint.anti_alias = true;
        let stroke = Stroke {
            width: width as f32,
            dash: if dashed { StrokeDash::new(vec![5.0, 5.0], 0.0) } else { None },
            ..Stroke::default()
        };
        self.pixmap.stroke_path(&path, &paint, &stroke, ts, None);
    }

    fn fill(&mut self, path: Option<Path>, color: Color, ts: Transform) {
        let Some(path) = path else {
            return;
        };
        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r, color.g, color.b, color.a);
        paint.anti_alias = true;
        self.pixmap.fill_path(&path, &paint, FillRule::Winding, ts, None);
    }
}

fn polyline_path(points: &[Point], closed: bool) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.x as f32, first.y as f32);
    for point in rest {
        pb.line_to(point.x as f32, point.y as f32);
    }
    if closed {
        pb.close();
    }
    pb.finish()
}

fn ts_point(ts: Transform, at: Point) -> Point {
    let mut mapped = [tiny_skia::Point::from_xy(at.x as f32, at.y as f32)];
    ts.map_points(&mut mapped);
    Point::new(f64::from(mapped[0].x), f64::from(mapped[0].y))
}

/// Source-over blend of `color` at `coverage` into one premultiplied pixel.
fn blend_pixel(pixmap: &mut Pixmap, x: i32, y: i32, color: Color, coverage: f32) {
    let (width, height) = (pixmap.width() as i32, pixmap.height() as i32);
    if x < 0 || y < 0 || x >= width || y >= height {
        return;
    }
    let alpha = coverage.clamp(0.0, 1.0) * f32::from(color.a) / 255.0;
    if alpha <= 0.0 {
        return;
    }

    let index = ((y * width + x) * 4) as usize;
    let pixel = &mut pixmap.data_mut()[index..index + 4];
    for (channel, source) in pixel.iter_mut().zip([color.r, color.g, color.b, 255]) {
        *channel = (f32::from(source) * alpha + f32::from(*channel) * (1.0 - alpha)).round() as u8;
    }
}

pub fn pixmap_from_image(image: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

pub fn image_from_pixmap(pixmap: &Pixmap) -> RgbaImage {
    let mut image = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
        let color = src.demultiply();
        *dst = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
    }
    image
}
