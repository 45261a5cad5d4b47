//! Minimal PDF documents.
//!
//! Builds small, valid PDFs with the given page geometry: blank pages for new
//! documents, and pages painted solid black as test input that has real
//! content.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::backend::PageSize;
use crate::PageError;

fn media_box(size: PageSize) -> Object {
    Object::Array(vec![0.into(), 0.into(), size.width_pt.into(), size.height_pt.into()])
}

fn empty_contents(doc: &mut Document) -> Result<lopdf::ObjectId, PageError> {
    contents(doc, Vec::new())
}

fn contents(doc: &mut Document, operations: Vec<Operation>) -> Result<lopdf::ObjectId, PageError> {
    let content = Content { operations };
    Ok(doc.add_object(Stream::new(dictionary! {}, content.encode()?)))
}

/// `0 g 0 0 w h re f`: the whole page in black.
fn fill_page(size: PageSize) -> Vec<Operation> {
    vec![
        Operation::new("g", vec![0.into()]),
        Operation::new(
            "re",
            vec![0.into(), 0.into(), size.width_pt.into(), size.height_pt.into()],
        ),
        Operation::new("f", vec![]),
    ]
}

fn finish(mut doc: Document, pages_id: lopdf::ObjectId, pages: lopdf::Dictionary) -> Result<Vec<u8>, PageError> {
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

/// One blank page per entry of `sizes`, each with its own MediaBox.
pub fn blank_pdf(sizes: &[PageSize]) -> Result<Vec<u8>, PageError> {
    pdf_with(sizes, |_| Vec::new())
}

/// Like [`blank_pdf`], but every page is filled black by its content stream.
pub fn filled_pdf(sizes: &[PageSize]) -> Result<Vec<u8>, PageError> {
    pdf_with(sizes, fill_page)
}

fn pdf_with(
    sizes: &[PageSize],
    operations: impl Fn(PageSize) -> Vec<Operation>,
) -> Result<Vec<u8>, PageError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::with_capacity(sizes.len());
    for size in sizes {
        let contents_id = contents(&mut doc, operations(*size))?;
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => media_box(*size),
            "Contents" => contents_id,
            "Resources" => dictionary! {},
        });
        kids.push(Object::Reference(page_id));
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Count" => sizes.len() as i64,
        "Kids" => kids,
    };
    finish(doc, pages_id, pages)
}

/// `count` blank pages that inherit one MediaBox from the page tree root.
pub fn blank_pdf_inherited_media_box(count: usize, size: PageSize) -> Result<Vec<u8>, PageError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::with_capacity(count);
    for _ in 0..count {
        let contents_id = empty_contents(&mut doc)?;
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => contents_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Count" => count as i64,
        "Kids" => kids,
        "MediaBox" => media_box(size),
        "Resources" => dictionary! {},
    };
    finish(doc, pages_id, pages)
}

/// One blank page with an explicit MediaBox `[x0, y0, x1, y1]` and `/Rotate`.
pub fn placed_pdf(media_box: [f32; 4], rotate: i64) -> Result<Vec<u8>, PageError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let contents_id = empty_contents(&mut doc)?;
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => media_box.iter().map(|&corner| Object::from(corner)).collect::<Vec<_>>(),
        "Rotate" => rotate,
        "Contents" => contents_id,
        "Resources" => dictionary! {},
    });

    let pages = dictionary! {
        "Type" => "Pages",
        "Count" => 1i64,
        "Kids" => vec![Object::Reference(page_id)],
    };
    finish(doc, pages_id, pages)
}
