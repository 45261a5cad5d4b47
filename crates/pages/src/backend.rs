use image::{ImageBuffer, Rgba};
use lopdf::{Document, Object, ObjectId};
use std::collections::HashMap;

use crate::PageError;

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// US Letter, used when a page has no resolvable MediaBox.
pub const DEFAULT_PAGE_SIZE: PageSize = PageSize { width_pt: 612.0, height_pt: 792.0 };

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Intrinsic page size in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    /// 0-based page index
    pub page_index: u32,
    pub scale: f32,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self { page_index: 0, scale: 1.0 }
    }
}

/// Rasterization backend for PDF pages.
///
/// Injected into [`crate::PageRenderer`]; nothing in this crate reaches for a
/// global rendering library.
pub trait PdfBackend {
    fn name(&self) -> &'static str;
    fn open(&mut self, bytes: Vec<u8>) -> Result<DocumentHandle, PageError>;
    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PageError>;
    fn page_size(&self, handle: DocumentHandle, page_index: u32) -> Result<PageSize, PageError>;
    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PageError>;
    fn close(&mut self, handle: DocumentHandle) -> Result<(), PageError>;

    /// Whether `render_page` reproduces everything the page draws.
    ///
    /// Exports that bake pages into images consult this before discarding the
    /// original content stream.
    fn renders_faithfully(&self, handle: DocumentHandle, page_index: u32) -> Result<bool, PageError> {
        self.page_size(handle, page_index).map(|_| true)
    }
}

impl<B: PdfBackend + ?Sized> PdfBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn open(&mut self, bytes: Vec<u8>) -> Result<DocumentHandle, PageError> {
        (**self).open(bytes)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PageError> {
        (**self).page_count(handle)
    }

    fn page_size(&self, handle: DocumentHandle, page_index: u32) -> Result<PageSize, PageError> {
        (**self).page_size(handle, page_index)
    }

    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PageError> {
        (**self).render_page(handle, request)
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PageError> {
        (**self).close(handle)
    }

    fn renders_faithfully(&self, handle: DocumentHandle, page_index: u32) -> Result<bool, PageError> {
        (**self).renders_faithfully(handle, page_index)
    }
}

/// Geometry of one page and whether it draws anything.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageInfo {
    pub size: PageSize,
    pub has_content: bool,
}

/// Pure-Rust backend built on `lopdf`.
///
/// Reads page geometry exactly but does not interpret content streams: pages
/// render as blank sheets with a light border. Good enough for layout, hit
/// testing and export geometry; use the `pdfium` feature for real page content.
/// Pages with a non-empty content stream report `renders_faithfully == false`.
#[derive(Debug, Default)]
pub struct LopdfBackend {
    next_handle: u64,
    docs: HashMap<DocumentHandle, Vec<PageInfo>>,
}

impl LopdfBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn pages(&self, handle: DocumentHandle) -> Result<&[PageInfo], PageError> {
        self.docs
            .get(&handle)
            .map(Vec::as_slice)
            .ok_or(PageError::InvalidHandle(handle.raw()))
    }

    fn page(&self, handle: DocumentHandle, page_index: u32) -> Result<PageInfo, PageError> {
        let pages = self.pages(handle)?;
        pages.get(page_index as usize).copied().ok_or(PageError::PageOutOfRange {
            page: page_index + 1,
            page_count: pages.len() as u32,
        })
    }
}

/// Pixel extent of `points` at `scale`, truncated like a canvas size.
///
/// A small epsilon absorbs f32 error so that `width * (target / width)` lands on
/// `target` rather than one pixel short.
pub fn scaled_extent(points: f32, scale: f32) -> u32 {
    (f64::from(points) * f64::from(scale) + 1e-3).floor().max(1.0) as u32
}

fn load_unencrypted(bytes: &[u8]) -> Result<Document, PageError> {
    if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
        return Err(PageError::EncryptedUnsupported);
    }
    Ok(Document::load_mem(bytes)?)
}

/// Page sizes of every page, in page order.
pub fn parse_page_sizes(bytes: &[u8]) -> Result<Vec<PageSize>, PageError> {
    Ok(parse_pages(bytes)?.into_iter().map(|page| page.size).collect())
}

/// Size and content presence of every page, in page order.
pub fn parse_pages(bytes: &[u8]) -> Result<Vec<PageInfo>, PageError> {
    let doc = load_unencrypted(bytes)?;
    let pages: Vec<PageInfo> = doc
        .get_pages()
        .into_values()
        .map(|page_id| PageInfo {
            size: page_size_of(&doc, page_id),
            has_content: has_content(&doc, page_id),
        })
        .collect();

    if pages.is_empty() {
        return Err(PageError::NoPages);
    }

    Ok(pages)
}

/// Whether the page's content streams hold any operator. Unreadable streams
/// count as content.
fn has_content(doc: &Document, page_id: ObjectId) -> bool {
    match doc.get_page_content(page_id) {
        Ok(content) => content.iter().any(|byte| !byte.is_ascii_whitespace()),
        Err(err) => {
            tracing::debug!(?page_id, error = %err, "unreadable page content");
            true
        }
    }
}

/// Displayed size of a page: its MediaBox, turned by `/Rotate`.
pub fn page_size_of(doc: &Document, page_id: ObjectId) -> PageSize {
    let size = media_box_of(doc, page_id)
        .map(|[x0, y0, x1, y1]| PageSize { width_pt: x1 - x0, height_pt: y1 - y0 })
        .unwrap_or(DEFAULT_PAGE_SIZE);
    if rotation_of(doc, page_id) % 180 == 90 {
        PageSize { width_pt: size.height_pt, height_pt: size.width_pt }
    } else {
        size
    }
}

/// MediaBox corners `[x0, y0, x1, y1]` with `x0 <= x1` and `y0 <= y1`,
/// inherited through `Parent` when the page lacks its own.
pub fn media_box_of(doc: &Document, page_id: ObjectId) -> Option<[f32; 4]> {
    inherited(doc, page_id, b"MediaBox", |object| {
        let array = object.as_array().ok()?;
        if array.len() != 4 {
            return None;
        }
        let mut corners = [0.0f32; 4];
        for (corner, value) in corners.iter_mut().zip(array) {
            *corner = resolve(doc, value).as_float().ok()?;
        }
        let [ax, ay, bx, by] = corners;
        Some([ax.min(bx), ay.min(by), ax.max(bx), ay.max(by)])
    })
}

/// Clockwise display rotation of a page: 0, 90, 180 or 270.
pub fn rotation_of(doc: &Document, page_id: ObjectId) -> u16 {
    inherited(doc, page_id, b"Rotate", |object| object.as_i64().ok())
        .map(|degrees| degrees.rem_euclid(360))
        .filter(|degrees| degrees % 90 == 0)
        .map_or(0, |degrees| degrees as u16)
}

fn resolve<'d>(doc: &'d Document, object: &'d Object) -> &'d Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

/// First readable value of `key` on the page or its ancestors.
fn inherited<T>(
    doc: &Document,
    page_id: ObjectId,
    key: &[u8],
    read: impl Fn(&Object) -> Option<T>,
) -> Option<T> {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let Ok(dict) = doc.get_dictionary(id) else {
            break;
        };
        if let Some(value) = dict.get(key).ok().and_then(|object| read(resolve(doc, object))) {
            return Some(value);
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

impl PdfBackend for LopdfBackend {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn open(&mut self, bytes: Vec<u8>) -> Result<DocumentHandle, PageError> {
        let pages = parse_pages(&bytes)?;

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        tracing::debug!(handle = handle.raw(), pages = pages.len(), "opened pdf");
        self.docs.insert(handle, pages);

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PageError> {
        Ok(self.pages(handle)?.len() as u32)
    }

    fn page_size(&self, handle: DocumentHandle, page_index: u32) -> Result<PageSize, PageError> {
        Ok(self.page(handle, page_index)?.size)
    }

    fn renders_faithfully(&self, handle: DocumentHandle, page_index: u32) -> Result<bool, PageError> {
        Ok(!self.page(handle, page_index)?.has_content)
    }

    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PageError> {
        let page_size = self.page_size(handle, request.page_index)?;
        let scale = if request.scale <= 0.0 { 1.0 } else { request.scale };

        let width = scaled_extent(page_size.width_pt, scale);
        let height = scaled_extent(page_size.height_pt, scale);

        let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

        if width >= 4 && height >= 4 {
            let border = Rgba([220, 220, 220, 255]);
            for x in 0..width {
                image.put_pixel(x, 0, border);
                image.put_pixel(x, height - 1, border);
            }
            for y in 0..height {
                image.put_pixel(0, y, border);
                image.put_pixel(width - 1, y, border);
            }
        }

        Ok(image)
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PageError> {
        self.docs.remove(&handle).map(|_| ()).ok_or(PageError::InvalidHandle(handle.raw()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{blank_pdf, filled_pdf};

    fn sizes() -> Vec<PageSize> {
        vec![
            PageSize { width_pt: 612.0, height_pt: 792.0 },
            PageSize { width_pt: 842.0, height_pt: 595.0 },
        ]
    }

    #[test]
    fn opens_pdf_and_reads_page_sizes() {
        let mut backend = LopdfBackend::new();
        let handle = backend.open(blank_pdf(&sizes()).unwrap()).expect("open should succeed");

        assert_eq!(backend.page_count(handle).unwrap(), 2);
        assert_eq!(backend.page_size(handle, 1).unwrap(), sizes()[1]);
    }

    #[test]
    fn media_box_is_inherited_from_parent() {
        let bytes = crate::fixtures::blank_pdf_inherited_media_box(3, sizes()[1]).unwrap();
        let parsed = parse_page_sizes(&bytes).unwrap();
        assert_eq!(parsed, vec![sizes()[1]; 3]);
    }

    #[test]
    fn rotated_pages_report_their_displayed_size() {
        let quarter = crate::fixtures::placed_pdf([0.0, 0.0, 612.0, 792.0], 90).unwrap();
        let negative = crate::fixtures::placed_pdf([0.0, 0.0, 612.0, 792.0], -270).unwrap();
        let half = crate::fixtures::placed_pdf([0.0, 0.0, 612.0, 792.0], 180).unwrap();

        let turned = PageSize { width_pt: 792.0, height_pt: 612.0 };
        assert_eq!(parse_page_sizes(&quarter).unwrap(), vec![turned]);
        assert_eq!(parse_page_sizes(&negative).unwrap(), vec![turned]);
        assert_eq!(parse_page_sizes(&half).unwrap(), vec![sizes()[0]]);
    }

    #[test]
    fn offset_media_box_is_normalized() {
        let bytes = crate::fixtures::placed_pdf([100.0, 250.0, -50.0, 50.0], 0).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let page_id = doc.get_pages()[&1];

        assert_eq!(media_box_of(&doc, page_id), Some([-50.0, 50.0, 100.0, 250.0]));
        assert_eq!(rotation_of(&doc, page_id), 0);
        assert_eq!(page_size_of(&doc, page_id), PageSize { width_pt: 150.0, height_pt: 200.0 });
    }

    #[test]
    fn render_scales_page_to_request() {
        let mut backend = LopdfBackend::new();
        let handle = backend.open(blank_pdf(&sizes()).unwrap()).unwrap();
        let image = backend
            .render_page(handle, RenderRequest { page_index: 0, scale: 900.0 / 612.0 })
            .unwrap();

        assert_eq!(image.width(), 900);
        assert_eq!(image.height(), 1164);
        assert_eq!(image.get_pixel(10, 10), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn out_of_range_page_is_reported_one_based() {
        let mut backend = LopdfBackend::new();
        let handle = backend.open(blank_pdf(&sizes()).unwrap()).unwrap();
        let err = backend.page_size(handle, 5).unwrap_err();
        assert!(matches!(err, PageError::PageOutOfRange { page: 6, page_count: 2 }));
    }

    #[test]
    fn invalid_handle_returns_error() {
        let backend = LopdfBackend::new();
        let err = backend.page_count(DocumentHandle(999)).expect_err("unknown handle");
        assert!(matches!(err, PageError::InvalidHandle(999)));
    }

    #[test]
    fn pages_with_drawing_are_not_rendered_faithfully() {
        let mut backend = LopdfBackend::new();
        let blank = backend.open(blank_pdf(&sizes()).unwrap()).unwrap();
        let filled = backend.open(filled_pdf(&sizes()).unwrap()).unwrap();

        assert!(backend.renders_faithfully(blank, 0).unwrap());
        assert!(!backend.renders_faithfully(filled, 1).unwrap());
        assert!(matches!(
            backend.renders_faithfully(filled, 2),
            Err(PageError::PageOutOfRange { page: 3, page_count: 2 })
        ));
    }

    #[test]
    fn boxed_backend_forwards_capability() {
        let mut backend: Box<dyn PdfBackend> = Box::new(LopdfBackend::new());
        let handle = backend.open(filled_pdf(&sizes()[..1]).unwrap()).unwrap();
        assert!(!backend.renders_faithfully(handle, 0).unwrap());
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(parse_page_sizes(b"not a pdf"), Err(PageError::Parse(_))));
    }
}
