//! Export compositor
//!
//! Each page is rendered at the reference width, the annotations of that page
//! are painted on top at scale 1 and the result is embedded as one full-page
//! image sized to the page's original point dimensions. Text annotations are
//! also written as invisible text so exported pages stay searchable.
//!
//! Flattening needs a backend that rasterizes page content. When it cannot,
//! the export switches to overlay mode so the source content survives.

use std::fmt::{self, Write as _};
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::str::FromStr;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use markup_editor::Notice;
use markup_model::{Annotation, AnnotationCollection, Shape, ViewTransform};
use markup_pages::backend::{media_box_of, rotation_of};
use markup_pages::{
    DocumentKind, LoadedDocument, PageError, PageRenderer, PageSize, PdfBackend, RgbaImage,
    REFERENCE_WIDTH,
};
use serde::Serialize;
use tiny_skia::Pixmap;

use crate::painter::{image_from_pixmap, pixmap_from_image, PaintOptions, Painter};
use crate::CanvasError;

const PAGE_IMAGE: &str = "MkPage";
const OVERLAY_IMAGE: &str = "MkOverlay";
const TEXT_FONT: &str = "MkHelv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportMode {
    /// A fresh PDF holding one flattened image per page.
    #[default]
    Flatten,
    /// A copy of the source PDF with a transparent annotation layer on each
    /// page. Vector content of the source is kept.
    Overlay,
}

impl ExportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportMode::Flatten => "flatten",
            ExportMode::Overlay => "overlay",
        }
    }
}

impl fmt::Display for ExportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown export mode '{0}', expected flatten or overlay")]
pub struct UnknownExportMode(pub String);

impl FromStr for ExportMode {
    type Err = UnknownExportMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flatten" => Ok(ExportMode::Flatten),
            "overlay" => Ok(ExportMode::Overlay),
            other => Err(UnknownExportMode(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to render page {page}: {source}")]
    Render {
        page: u32,
        #[source]
        source: PageError,
    },
    #[error(
        "page {page} has content the {backend} backend cannot rasterize; \
         export as overlay or build with the pdfium feature"
    )]
    Unrasterized { page: u32, backend: &'static str },
    #[error(transparent)]
    Canvas(#[from] CanvasError),
    #[error("page {0} is missing from the source document")]
    MissingPage(u32),
    #[error("PDF assembly error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("failed to write page content: {0}")]
    Content(#[from] fmt::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    pub fn notice(&self) -> Notice {
        Notice::error(format!("Export failed: {self}"))
    }
}

/// What one exported page holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSummary {
    pub page: u32,
    pub width_pt: f32,
    pub height_pt: f32,
    pub annotations: usize,
    pub text_runs: usize,
}

/// A finished export. Nothing touches the disk until [`ExportArtifact::write_to`].
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub mode: ExportMode,
    pub bytes: Vec<u8>,
    pub pages: Vec<PageSummary>,
}

impl ExportArtifact {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Write the PDF through a temporary file so a failed write never leaves
    /// a truncated document at `path`.
    pub fn write_to(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let path = path.as_ref();
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &self.bytes)?;
        fs::rename(&tmp, path)
    }

    pub fn notice(&self) -> Notice {
        Notice::success(format!("Exported {} page(s)", self.pages.len()))
    }
}

pub struct ExportCompositor<'r, B> {
    renderer: &'r PageRenderer<B>,
    options: PaintOptions,
    mode: ExportMode,
    target_width: u32,
}

impl<'r, B: PdfBackend> ExportCompositor<'r, B> {
    pub fn new(renderer: &'r PageRenderer<B>, options: PaintOptions) -> Self {
        Self { renderer, options, mode: ExportMode::default(), target_width: REFERENCE_WIDTH }
    }

    pub fn with_mode(mut self, mode: ExportMode) -> Self {
        self.mode = mode;
        self
    }

    /// Render width of the frame annotations were drawn in.
    pub fn with_target_width(mut self, width: u32) -> Self {
        self.target_width = width.max(1);
        self
    }

    /// Page bitmap at the target width with the page's annotations painted on.
    ///
    /// Fails with [`ExportError::Unrasterized`] rather than painting onto a
    /// page whose content the backend would drop.
    pub fn flatten_page(
        &self,
        document: &LoadedDocument,
        page: u32,
        annotations: &AnnotationCollection,
    ) -> Result<RgbaImage, ExportError> {
        if !self.renders_faithfully(document, page)? {
            return Err(ExportError::Unrasterized { page, backend: self.renderer.backend().name() });
        }
        let rendered = self
            .renderer
            .render_page(document, page, self.target_width)
            .map_err(|source| ExportError::Render { page, source })?;
        let mut pixmap = pixmap_from_image(&rendered.bitmap)
            .ok_or(CanvasError::Allocate { width: rendered.width(), height: rendered.height() })?;
        self.paint(&mut pixmap, annotations.on_page(page));
        Ok(image_from_pixmap(&pixmap))
    }

    pub fn export(
        &self,
        document: &LoadedDocument,
        annotations: &AnnotationCollection,
    ) -> Result<ExportArtifact, ExportError> {
        let mode = match (self.mode, document.kind()) {
            (ExportMode::Overlay, DocumentKind::Image) => {
                tracing::warn!("overlay export needs a PDF source; flattening the image instead");
                ExportMode::Flatten
            }
            (ExportMode::Flatten, DocumentKind::Pdf) => {
                match self.first_unrasterized(document)? {
                    Some(page) => {
                        tracing::warn!(
                            page,
                            backend = self.renderer.backend().name(),
                            "backend cannot rasterize page content; exporting as overlay instead"
                        );
                        ExportMode::Overlay
                    }
                    None => ExportMode::Flatten,
                }
            }
            (mode, _) => mode,
        };

        let (bytes, pages) = match mode {
            ExportMode::Flatten => self.flatten(document, annotations)?,
            ExportMode::Overlay => self.overlay(document, annotations)?,
        };
        tracing::info!(%mode, pages = pages.len(), bytes = bytes.len(), "export assembled");
        Ok(ExportArtifact { mode, bytes, pages })
    }

    fn renders_faithfully(&self, document: &LoadedDocument, page: u32) -> Result<bool, ExportError> {
        self.renderer
            .renders_faithfully(document, page)
            .map_err(|source| ExportError::Render { page, source })
    }

    fn first_unrasterized(&self, document: &LoadedDocument) -> Result<Option<u32>, ExportError> {
        for page in 1..=document.page_count() {
            if !self.renders_faithfully(document, page)? {
                return Ok(Some(page));
            }
        }
        Ok(None)
    }

    fn paint<'a>(&self, pixmap: &mut Pixmap, annotations: impl IntoIterator<Item = &'a Annotation>) {
        let mut painter = Painter::new(pixmap, ViewTransform::default(), self.options);
        for annotation in annotations {
            painter.annotation(annotation);
        }
    }

    fn page_geometry(&self, document: &LoadedDocument, page: u32) -> Result<(PageSize, f64), ExportError> {
        let size = document.page_size(page).ok_or(ExportError::MissingPage(page))?;
        let scale = document.scale_for(page, self.target_width).ok_or(ExportError::MissingPage(page))?;
        Ok((size, scale))
    }

    fn flatten(
        &self,
        document: &LoadedDocument,
        annotations: &AnnotationCollection,
    ) -> Result<(Vec<u8>, Vec<PageSummary>), ExportError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(helvetica());

        let mut kids = Vec::new();
        let mut summaries = Vec::new();
        for page in 1..=document.page_count() {
            let (size, scale) = self.page_geometry(document, page)?;
            let bitmap = self.flatten_page(document, page, annotations)?;
            let image_id = doc.add_object(rgb_image(&bitmap)?);

            let placement = Placement::upright(size);
            let mut content = String::new();
            write_image(&mut content, PAGE_IMAGE, &placement)?;
            let text_runs = write_text_layer(&mut content, annotations.on_page(page), &placement, scale)?;
            let contents_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), size.width_pt.into(), size.height_pt.into()],
                "Contents" => contents_id,
                "Resources" => dictionary! {
                    "XObject" => dictionary! { PAGE_IMAGE => image_id },
                    "Font" => dictionary! { TEXT_FONT => font_id },
                },
            });
            kids.push(Object::Reference(page_id));
            summaries.push(PageSummary {
                page,
                width_pt: size.width_pt,
                height_pt: size.height_pt,
                annotations: annotations.on_page(page).count(),
                text_runs,
            });
            tracing::debug!(page, width = bitmap.width(), height = bitmap.height(), "page flattened");
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok((bytes, summaries))
    }

    fn overlay(
        &self,
        document: &LoadedDocument,
        annotations: &AnnotationCollection,
    ) -> Result<(Vec<u8>, Vec<PageSummary>), ExportError> {
        let mut doc = Document::load_mem(document.source_bytes())?;
        let page_ids = doc.get_pages();
        let mut font_id: Option<ObjectId> = None;

        let mut summaries = Vec::new();
        for page in 1..=document.page_count() {
            let page_id = *page_ids.get(&page).ok_or(ExportError::MissingPage(page))?;
            let (size, scale) = self.page_geometry(document, page)?;
            let placement = Placement::of_page(&doc, page_id, size);
            let on_page: Vec<&Annotation> = annotations.on_page(page).collect();
            let mut resources = page_resources(&doc, page_id);
            let mut content = String::new();

            if !on_page.is_empty() {
                let (width, height) =
                    document.document_size(page, self.target_width).ok_or(ExportError::MissingPage(page))?;
                let mut pixmap = Pixmap::new(width, height).ok_or(CanvasError::Allocate { width, height })?;
                self.paint(&mut pixmap, on_page.iter().copied());
                let (rgb, alpha) = split_alpha(&image_from_pixmap(&pixmap));

                let smask_id = doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => i64::from(width),
                        "Height" => i64::from(height),
                        "ColorSpace" => "DeviceGray",
                        "BitsPerComponent" => 8i64,
                        "Filter" => "FlateDecode",
                    },
                    deflate(&alpha)?,
                ));
                let image_id = doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => i64::from(width),
                        "Height" => i64::from(height),
                        "ColorSpace" => "DeviceRGB",
                        "BitsPerComponent" => 8i64,
                        "SMask" => smask_id,
                        "Filter" => "FlateDecode",
                    },
                    deflate(&rgb)?,
                ));
                sub_dictionary(&doc, &mut resources, "XObject")?.set(OVERLAY_IMAGE, image_id);

                write_image(&mut content, OVERLAY_IMAGE, &placement)?;
            }

            let text_runs = write_text_layer(&mut content, on_page.iter().copied(), &placement, scale)?;
            if text_runs > 0 {
                let font = *font_id.get_or_insert_with(|| doc.add_object(helvetica()));
                sub_dictionary(&doc, &mut resources, "Font")?.set(TEXT_FONT, font);
            }

            if !content.is_empty() {
                doc.get_object_mut(page_id)
                    .and_then(Object::as_dict_mut)?
                    .set("Resources", resources);
                doc.add_page_contents(page_id, content.into_bytes())?;
            }

            summaries.push(PageSummary {
                page,
                width_pt: size.width_pt,
                height_pt: size.height_pt,
                annotations: on_page.len(),
                text_runs,
            });
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok((bytes, summaries))
    }
}

fn helvetica() -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Where the displayed page sits in a page's user space.
///
/// Document space runs over the displayed page. A page's user space starts at
/// its MediaBox corner and is turned by `/Rotate` before display, so content
/// that must look upright is drawn along the turned axes.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Placement {
    size: PageSize,
    corner: (f64, f64),
    x_axis: (f64, f64),
    y_axis: (f64, f64),
}

impl Placement {
    fn upright(size: PageSize) -> Self {
        Self { size, corner: (0.0, 0.0), x_axis: (1.0, 0.0), y_axis: (0.0, 1.0) }
    }

    fn of_page(doc: &Document, page_id: ObjectId, size: PageSize) -> Self {
        let Some([x0, y0, x1, y1]) = media_box_of(doc, page_id) else {
            return Self::upright(size);
        };
        let (x0, y0, x1, y1) = (f64::from(x0), f64::from(y0), f64::from(x1), f64::from(y1));
        let (corner, x_axis, y_axis) = match rotation_of(doc, page_id) {
            90 => ((x1, y0), (0.0, 1.0), (-1.0, 0.0)),
            180 => ((x1, y1), (-1.0, 0.0), (0.0, -1.0)),
            270 => ((x0, y1), (0.0, -1.0), (1.0, 0.0)),
            _ => ((x0, y0), (1.0, 0.0), (0.0, 1.0)),
        };
        Self { size, corner, x_axis, y_axis }
    }

    /// User-space point of displayed point `(x, y)`, origin bottom-left.
    fn to_user(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.corner.0 + x * self.x_axis.0 + y * self.y_axis.0,
            self.corner.1 + x * self.x_axis.1 + y * self.y_axis.1,
        )
    }

    /// `cm` operands that map the unit square onto the displayed page.
    fn image_matrix(&self) -> [f64; 6] {
        let width = f64::from(self.size.width_pt);
        let height = f64::from(self.size.height_pt);
        [
            self.x_axis.0 * width,
            self.x_axis.1 * width,
            self.y_axis.0 * height,
            self.y_axis.1 * height,
            self.corner.0,
            self.corner.1,
        ]
    }
}

/// `0.00` for negative zero too.
fn number(value: f64) -> String {
    format!("{:.2}", value + 0.0)
}

fn write_image(content: &mut String, name: &str, placement: &Placement) -> Result<(), fmt::Error> {
    let matrix: Vec<String> = placement.image_matrix().into_iter().map(number).collect();
    writeln!(content, "q")?;
    writeln!(content, "{} cm", matrix.join(" "))?;
    writeln!(content, "/{name} Do")?;
    writeln!(content, "Q")
}

/// Invisible text (render mode 3) for every non-blank text annotation,
/// positioned in page points. Returns the number of runs written.
fn write_text_layer<'a>(
    content: &mut String,
    annotations: impl IntoIterator<Item = &'a Annotation>,
    placement: &Placement,
    scale: f64,
) -> Result<usize, fmt::Error> {
    let mut runs = 0;
    for annotation in annotations {
        let Shape::Text(block) = annotation.shape() else {
            continue;
        };
        if block.content.trim().is_empty() {
            continue;
        }
        let (x, y) = placement.to_user(
            block.origin.x / scale,
            f64::from(placement.size.height_pt) - block.origin.y / scale,
        );
        let (ax, ay) = placement.x_axis;
        let (bx, by) = placement.y_axis;

        writeln!(content, "BT")?;
        writeln!(content, "/{TEXT_FONT} {:.2} Tf", block.font_size / scale)?;
        writeln!(content, "3 Tr")?;
        writeln!(
            content,
            "{} {} {} {} {} {} Tm",
            number(ax),
            number(ay),
            number(bx),
            number(by),
            number(x),
            number(y)
        )?;
        writeln!(content, "({}) Tj", escape_pdf_string(&block.content))?;
        writeln!(content, "ET")?;
        runs += 1;
    }
    Ok(runs)
}

/// Literal-string escaping for a single-byte font. Characters outside
/// Latin-1 become `?`.
fn escape_pdf_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' | '(' | ')' => {
                out.push('\\');
                out.push(ch);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ' '..='~' => out.push(ch),
            _ => match u8::try_from(u32::from(ch)) {
                Ok(byte) => out.push_str(&format!("\\{byte:03o}")),
                Err(_) => out.push('?'),
            },
        }
    }
    out
}

fn deflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Opaque RGB image stream, composited over white.
fn rgb_image(bitmap: &RgbaImage) -> std::io::Result<Stream> {
    let mut rgb = Vec::with_capacity(bitmap.width() as usize * bitmap.height() as usize * 3);
    for pixel in bitmap.pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = u16::from(a);
        for channel in [r, g, b] {
            rgb.push(((u16::from(channel) * alpha + 255 * (255 - alpha)) / 255) as u8);
        }
    }

    Ok(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(bitmap.width()),
            "Height" => i64::from(bitmap.height()),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8i64,
            "Filter" => "FlateDecode",
        },
        deflate(&rgb)?,
    ))
}

fn split_alpha(image: &RgbaImage) -> (Vec<u8>, Vec<u8>) {
    let pixels = image.width() as usize * image.height() as usize;
    let mut rgb = Vec::with_capacity(pixels * 3);
    let mut alpha = Vec::with_capacity(pixels);
    for pixel in image.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }
    (rgb, alpha)
}

fn resolve_dictionary<'d>(doc: &'d Document, object: &'d Object) -> Option<&'d Dictionary> {
    match object {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Resources of a page as a direct dictionary, inherited through `Parent`
/// when the page has none of its own.
fn page_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let Ok(dict) = doc.get_dictionary(id) else {
            break;
        };
        if let Some(resources) = dict.get(b"Resources").ok().and_then(|o| resolve_dictionary(doc, o)) {
            return resources.clone();
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    Dictionary::new()
}

/// Direct sub-dictionary `key` of `resources`. A referenced one is copied in
/// so the page can extend it without touching shared objects.
fn sub_dictionary<'r>(
    doc: &Document,
    resources: &'r mut Dictionary,
    key: &str,
) -> Result<&'r mut Dictionary, ExportError> {
    let existing = resources
        .get(key.as_bytes())
        .ok()
        .and_then(|o| resolve_dictionary(doc, o))
        .cloned()
        .unwrap_or_else(Dictionary::new);
    resources.set(key, existing);
    resources.get_mut(key.as_bytes()).and_then(Object::as_dict_mut).map_err(ExportError::from)
}
