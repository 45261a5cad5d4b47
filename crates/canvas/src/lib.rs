//! Annotation drawing and export
//!
//! Paints annotations onto page bitmaps with `tiny-skia`, composes the
//! on-screen view of an editor, and assembles exported PDFs.

pub mod export;
pub mod font;
pub mod painter;
pub mod view;

pub use export::{ExportArtifact, ExportCompositor, ExportError, ExportMode, PageSummary};
pub use painter::{image_from_pixmap, pixmap_from_image, PaintOptions, Painter};
pub use view::render_view;

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("cannot allocate a {width}x{height} canvas")]
    Allocate { width: u32, height: u32 },
    #[error("rendered page {rendered} is stale, editor is on page {current}")]
    StalePage { rendered: u32, current: u32 },
}
