//! Page rendering for markup documents
//!
//! Opens images and PDFs, reports page geometry, and rasterizes pages into the
//! fixed-width document frame that annotation coordinates are stored in.

pub mod backend;
pub mod fixtures;
#[cfg(feature = "pdfium")]
pub mod pdfium;
pub mod renderer;
pub mod source;

pub use backend::{
    DocumentHandle, LopdfBackend, PageInfo, PageSize, PdfBackend, RenderRequest, RgbaImage,
};
pub use renderer::{DocumentState, LoadedDocument, PageRenderer, RenderedPage, REFERENCE_WIDTH};
pub use source::{DocumentKind, DocumentSource, SourceDocument};

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },
    #[error("unknown document type '{0}', expected image or pdf")]
    UnknownKind(String),
    #[error("invalid handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("document has no pages")]
    NoPages,
    #[error("encrypted PDFs are not supported")]
    EncryptedUnsupported,
    #[error("backend error: {0}")]
    Backend(String),
}

/// Best available rasterization backend: Pdfium when built with the `pdfium`
/// feature and the library binds, `lopdf` otherwise.
pub fn default_backend() -> Box<dyn PdfBackend> {
    #[cfg(feature = "pdfium")]
    match pdfium::PdfiumBackend::from_system_library() {
        Ok(backend) => return Box::new(backend),
        Err(err) => {
            tracing::warn!(error = %err, "pdfium unavailable; page content will not be rasterized")
        }
    }

    Box::new(LopdfBackend::new())
}
