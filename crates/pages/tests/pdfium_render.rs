#![cfg(feature = "pdfium")]

use markup_pages::fixtures::filled_pdf;
use markup_pages::pdfium::PdfiumBackend;
use markup_pages::{PageRenderer, PageSize, SourceDocument, REFERENCE_WIDTH};

const LETTER: PageSize = PageSize { width_pt: 612.0, height_pt: 792.0 };
const LANDSCAPE: PageSize = PageSize { width_pt: 842.0, height_pt: 595.0 };

fn renderer() -> Option<PageRenderer<PdfiumBackend>> {
    match PdfiumBackend::from_system_library() {
        Ok(backend) => Some(PageRenderer::new(backend)),
        Err(err) => {
            eprintln!("skipping: {err}");
            None
        }
    }
}

#[test]
fn pdfium_rasterizes_page_content() {
    let Some(mut renderer) = renderer() else {
        return;
    };
    let doc = renderer.load(&SourceDocument::pdf(filled_pdf(&[LETTER, LANDSCAPE]).unwrap())).unwrap();

    for page in 1..=2 {
        let rendered = renderer.render_page(&doc, page, REFERENCE_WIDTH).unwrap();
        assert_eq!(rendered.width(), REFERENCE_WIDTH);
        let (_, expected_height) = doc.document_size(page, REFERENCE_WIDTH).unwrap();
        assert!(rendered.height().abs_diff(expected_height) <= 1);
        let center = rendered.bitmap.get_pixel(rendered.width() / 2, rendered.height() / 2).0;
        assert!(center[0] < 30 && center[1] < 30 && center[2] < 30, "page {page} is painted black");
        assert!(renderer.renders_faithfully(&doc, page).unwrap());
    }

    renderer.close(doc).unwrap();
}

#[test]
fn repeated_renders_reuse_the_open_document() {
    let Some(mut renderer) = renderer() else {
        return;
    };
    let doc = renderer.load(&SourceDocument::pdf(filled_pdf(&[LETTER]).unwrap())).unwrap();

    let first = renderer.render_page(&doc, 1, REFERENCE_WIDTH).unwrap();
    let second = renderer.render_page(&doc, 1, REFERENCE_WIDTH / 2).unwrap();
    assert_eq!(first.width(), REFERENCE_WIDTH);
    assert_eq!(second.width(), REFERENCE_WIDTH / 2);

    renderer.close(doc).unwrap();
}
