//! Geometry and annotation model for document markup
//!
//! Pure data and pure functions: annotation records, hit-testing, the
//! transform engine, and the mapping between screen and document space.

pub mod annotation;
pub mod collection;
pub mod color;
pub mod geometry;
pub mod handles;
pub mod transform;
pub mod units;
pub mod viewport;

pub use annotation::{
    Annotation, AnnotationId, AnnotationKind, FileId, Frame, HitPolicy, LocalKey, Meta, Owner,
    ProjectId, Segment, Shape, Style, TextBlock,
};
pub use collection::AnnotationCollection;
pub use color::Color;
pub use geometry::{Point, Rect};
pub use units::MeasurementUnit;
pub use viewport::ViewTransform;
