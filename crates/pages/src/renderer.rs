//! Page rendering into the fixed-width document frame.
//!
//! PDF pages are rasterized at `scale = target_width / intrinsic_width`, so one
//! document-space unit is one pixel of the rendered bitmap. Images keep their
//! natural size at scale 1.

use std::time::Duration;

use crate::backend::{scaled_extent, DocumentHandle, PageSize, PdfBackend, RenderRequest, RgbaImage};
use crate::source::{DocumentKind, SourceDocument};
use crate::PageError;

/// Width of the reference render every annotation is stored against.
pub const REFERENCE_WIDTH: u32 = 900;

#[derive(Debug)]
enum Content {
    Pdf(DocumentHandle),
    Image(RgbaImage),
}

/// A document opened by a [`PageRenderer`].
#[derive(Debug)]
pub struct LoadedDocument {
    kind: DocumentKind,
    bytes: Vec<u8>,
    pages: Vec<PageSize>,
    content: Content,
}

impl LoadedDocument {
    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Intrinsic size of a 1-based page. Images report pixels as points.
    pub fn page_size(&self, page: u32) -> Option<PageSize> {
        let index = page.checked_sub(1)?;
        self.pages.get(index as usize).copied()
    }

    pub fn page_sizes(&self) -> &[PageSize] {
        &self.pages
    }

    /// Original bytes, kept for exports that write into a copy of the source.
    pub fn source_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Scale factor from intrinsic units to document space.
    pub fn scale_for(&self, page: u32, target_width: u32) -> Option<f64> {
        match self.content {
            Content::Image(_) => Some(1.0),
            Content::Pdf(_) => {
                let size = self.page_size(page)?;
                Some(f64::from(target_width) / f64::from(size.width_pt))
            }
        }
    }

    /// Size of a page in document space.
    pub fn document_size(&self, page: u32, target_width: u32) -> Option<(u32, u32)> {
        let size = self.page_size(page)?;
        let scale = self.scale_for(page, target_width)? as f32;
        Some((scaled_extent(size.width_pt, scale), scaled_extent(size.height_pt, scale)))
    }
}

/// Outcome of opening a document for editing.
#[derive(Debug)]
pub enum DocumentState {
    Ready(LoadedDocument),
    /// Rasterization is unavailable; the document may still be shown by an
    /// external viewer but cannot be annotated or exported.
    ViewOnly { reason: String },
}

impl DocumentState {
    pub fn is_view_only(&self) -> bool {
        matches!(self, DocumentState::ViewOnly { .. })
    }

    pub fn document(&self) -> Option<&LoadedDocument> {
        match self {
            DocumentState::Ready(doc) => Some(doc),
            DocumentState::ViewOnly { .. } => None,
        }
    }
}

/// One page rendered into document space.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 1-based page number
    pub page: u32,
    pub bitmap: RgbaImage,
    /// Intrinsic units to bitmap pixels
    pub scale: f64,
    pub page_size: PageSize,
}

impl RenderedPage {
    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }
}

pub struct PageRenderer<B> {
    backend: B,
    fetch_timeout: Duration,
}

impl<B: PdfBackend> PageRenderer<B> {
    pub fn new(backend: B) -> Self {
        Self { backend, fetch_timeout: Duration::from_secs(30) }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn load(&mut self, document: &SourceDocument) -> Result<LoadedDocument, PageError> {
        let bytes = document.read_bytes(self.fetch_timeout)?;

        match document.kind {
            DocumentKind::Image => {
                let image = image::load_from_memory(&bytes)?.to_rgba8();
                let size = PageSize { width_pt: image.width() as f32, height_pt: image.height() as f32 };
                tracing::debug!(width = image.width(), height = image.height(), "loaded image");
                Ok(LoadedDocument {
                    kind: DocumentKind::Image,
                    bytes,
                    pages: vec![size],
                    content: Content::Image(image),
                })
            }
            DocumentKind::Pdf => {
                let handle = self.backend.open(bytes.clone())?;
                let count = self.backend.page_count(handle)?;
                let pages = (0..count)
                    .map(|index| self.backend.page_size(handle, index))
                    .collect::<Result<Vec<_>, _>>()?;
                tracing::debug!(backend = self.backend.name(), pages = count, "loaded pdf");
                Ok(LoadedDocument { kind: DocumentKind::Pdf, bytes, pages, content: Content::Pdf(handle) })
            }
        }
    }

    /// Load, degrading to [`DocumentState::ViewOnly`] on failure.
    pub fn load_or_view_only(&mut self, document: &SourceDocument) -> DocumentState {
        match self.load(document) {
            Ok(doc) => DocumentState::Ready(doc),
            Err(err) => {
                tracing::warn!(
                    source = %document.describe(),
                    error = %err,
                    "document could not be rasterized; falling back to view-only"
                );
                DocumentState::ViewOnly { reason: err.to_string() }
            }
        }
    }

    /// Render 1-based `page` so that its width in pixels is `target_width`.
    pub fn render_page(
        &self,
        document: &LoadedDocument,
        page: u32,
        target_width: u32,
    ) -> Result<RenderedPage, PageError> {
        let page_size = document
            .page_size(page)
            .ok_or(PageError::PageOutOfRange { page, page_count: document.page_count() })?;

        match &document.content {
            Content::Image(image) => {
                Ok(RenderedPage { page, bitmap: image.clone(), scale: 1.0, page_size })
            }
            Content::Pdf(handle) => {
                let scale = f64::from(target_width) / f64::from(page_size.width_pt);
                let bitmap = self.backend.render_page(
                    *handle,
                    RenderRequest { page_index: page - 1, scale: scale as f32 },
                )?;
                tracing::debug!(page, width = bitmap.width(), height = bitmap.height(), "rendered page");
                Ok(RenderedPage { page, bitmap, scale, page_size })
            }
        }
    }

    /// Whether rendering 1-based `page` shows all of its content. Images always do.
    pub fn renders_faithfully(&self, document: &LoadedDocument, page: u32) -> Result<bool, PageError> {
        if document.page_size(page).is_none() {
            return Err(PageError::PageOutOfRange { page, page_count: document.page_count() });
        }
        match &document.content {
            Content::Image(_) => Ok(true),
            Content::Pdf(handle) => self.backend.renders_faithfully(*handle, page - 1),
        }
    }

    pub fn close(&mut self, document: LoadedDocument) -> Result<(), PageError> {
        match document.content {
            Content::Pdf(handle) => self.backend.close(handle),
            Content::Image(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LopdfBackend;
    use crate::fixtures::{blank_pdf, filled_pdf};
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    fn letter() -> PageSize {
        PageSize { width_pt: 612.0, height_pt: 792.0 }
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    #[test]
    fn pdf_pages_render_at_reference_width() {
        let mut renderer = PageRenderer::new(LopdfBackend::new());
        let doc = renderer.load(&SourceDocument::pdf(blank_pdf(&[letter(), letter()]).unwrap())).unwrap();

        assert_eq!(doc.page_count(), 2);
        let rendered = renderer.render_page(&doc, 2, REFERENCE_WIDTH).unwrap();
        assert_eq!(rendered.width(), REFERENCE_WIDTH);
        assert!((rendered.scale - 900.0 / 612.0).abs() < 1e-9);
        assert_eq!(doc.document_size(2, REFERENCE_WIDTH), Some((900, 1164)));
    }

    #[test]
    fn images_render_at_natural_size() {
        let mut renderer = PageRenderer::new(LopdfBackend::new());
        let doc = renderer.load(&SourceDocument::image(png_bytes(40, 30))).unwrap();

        assert_eq!(doc.page_count(), 1);
        let rendered = renderer.render_page(&doc, 1, REFERENCE_WIDTH).unwrap();
        assert_eq!((rendered.width(), rendered.height()), (40, 30));
        assert_eq!(rendered.scale, 1.0);
    }

    #[test]
    fn fidelity_follows_the_backend() {
        let mut renderer = PageRenderer::new(LopdfBackend::new());
        let filled = renderer.load(&SourceDocument::pdf(filled_pdf(&[letter()]).unwrap())).unwrap();
        let image = renderer.load(&SourceDocument::image(png_bytes(4, 4))).unwrap();

        assert!(!renderer.renders_faithfully(&filled, 1).unwrap());
        assert!(renderer.renders_faithfully(&image, 1).unwrap());
        assert!(matches!(
            renderer.renders_faithfully(&filled, 0),
            Err(PageError::PageOutOfRange { page: 0, page_count: 1 })
        ));
    }

    #[test]
    fn page_zero_is_out_of_range() {
        let mut renderer = PageRenderer::new(LopdfBackend::new());
        let doc = renderer.load(&SourceDocument::pdf(blank_pdf(&[letter()]).unwrap())).unwrap();
        assert!(matches!(
            renderer.render_page(&doc, 0, REFERENCE_WIDTH),
            Err(PageError::PageOutOfRange { page: 0, page_count: 1 })
        ));
    }

    #[test]
    fn broken_pdf_degrades_to_view_only() {
        let mut renderer = PageRenderer::new(LopdfBackend::new());
        let state = renderer.load_or_view_only(&SourceDocument::pdf(b"%PDF-garbage".to_vec()));
        assert!(state.is_view_only());
        assert!(state.document().is_none());
    }
}
