//! Full-fidelity rasterization through a Pdfium library.

use image::RgbaImage;
use pdfium_render::prelude::*;
use std::collections::HashMap;

use crate::backend::{
    parse_page_sizes, scaled_extent, DocumentHandle, PageSize, PdfBackend, RenderRequest,
};
use crate::PageError;

struct OpenDocument {
    document: PdfDocument<'static>,
    page_sizes: Vec<PageSize>,
}

pub struct PdfiumBackend {
    pdfium: &'static Pdfium,
    next_handle: u64,
    docs: HashMap<DocumentHandle, OpenDocument>,
}

impl PdfiumBackend {
    /// Bind Pdfium from the executable's directory, the working directory, or
    /// the system library path, in that order.
    pub fn from_system_library() -> Result<Self, PageError> {
        // Documents borrow the library for as long as they are open.
        let pdfium: &'static Pdfium = Box::leak(Box::new(init_pdfium()?));
        Ok(Self { pdfium, next_handle: 0, docs: HashMap::new() })
    }

    fn document(&self, handle: DocumentHandle) -> Result<&OpenDocument, PageError> {
        self.docs.get(&handle).ok_or(PageError::InvalidHandle(handle.raw()))
    }
}

fn init_pdfium() -> Result<Pdfium, PageError> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(|dir| dir.to_path_buf()));

    if let Some(ref dir) = exe_dir {
        if let Ok(bindings) =
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
        {
            return Ok(Pdfium::new(bindings));
        }
    }

    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|err| PageError::Backend(format!("failed to bind pdfium library: {err}")))?;
    Ok(Pdfium::new(bindings))
}

fn backend_error(err: PdfiumError) -> PageError {
    PageError::Backend(err.to_string())
}

impl PdfBackend for PdfiumBackend {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    fn open(&mut self, bytes: Vec<u8>) -> Result<DocumentHandle, PageError> {
        let page_sizes = parse_page_sizes(&bytes)?;
        let document = self.pdfium.load_pdf_from_byte_vec(bytes, None).map_err(backend_error)?;

        self.next_handle += 1;
        let handle = DocumentHandle::from_raw(self.next_handle);
        tracing::debug!(handle = handle.raw(), pages = page_sizes.len(), "opened pdf with pdfium");
        self.docs.insert(handle, OpenDocument { document, page_sizes });
        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PageError> {
        Ok(self.document(handle)?.page_sizes.len() as u32)
    }

    fn page_size(&self, handle: DocumentHandle, page_index: u32) -> Result<PageSize, PageError> {
        let doc = self.document(handle)?;
        doc.page_sizes.get(page_index as usize).copied().ok_or(PageError::PageOutOfRange {
            page: page_index + 1,
            page_count: doc.page_sizes.len() as u32,
        })
    }

    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PageError> {
        let size = self.page_size(handle, request.page_index)?;
        let scale = if request.scale <= 0.0 { 1.0 } else { request.scale };
        let width = scaled_extent(size.width_pt, scale);

        let doc = self.document(handle)?;
        let index = request
            .page_index
            .try_into()
            .map_err(|_| PageError::Backend(format!("page index {} too large", request.page_index)))?;
        let page = doc.document.pages().get(index).map_err(backend_error)?;

        // Height follows the page's own aspect ratio, which accounts for /Rotate.
        let config = PdfRenderConfig::new().set_target_width(width as Pixels);
        let bitmap = page.render_with_config(&config).map_err(backend_error)?;

        let (bitmap_width, bitmap_height) = (bitmap.width() as u32, bitmap.height() as u32);
        RgbaImage::from_raw(bitmap_width, bitmap_height, bitmap.as_rgba_bytes()).ok_or_else(|| {
            PageError::Backend(format!(
                "pdfium bitmap {bitmap_width}x{bitmap_height} does not match its pixel data"
            ))
        })
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PageError> {
        self.docs.remove(&handle).map(|_| ()).ok_or(PageError::InvalidHandle(handle.raw()))
    }
}
