//! On-screen composition of an editor.

use markup_editor::Editor;
use markup_pages::{RenderedPage, RgbaImage};
use markup_store::AnnotationStore;
use tiny_skia::{FilterQuality, Pixmap, PixmapPaint, Transform};

use crate::painter::{image_from_pixmap, pixmap_from_image, PaintOptions, Painter};
use crate::CanvasError;

/// Compose a `width`x`height` viewport: the page under the editor's zoom and
/// pan, its committed annotations, the in-progress shape and the selection.
///
/// `page` must be the editor's current page; a render for another page is
/// stale and refused.
pub fn render_view<S: AnnotationStore>(
    editor: &Editor<S>,
    page: &RenderedPage,
    (width, height): (u32, u32),
    options: PaintOptions,
) -> Result<RgbaImage, CanvasError> {
    if page.page != editor.page() {
        return Err(CanvasError::StalePage { rendered: page.page, current: editor.page() });
    }

    let mut viewport = Pixmap::new(width, height).ok_or(CanvasError::Allocate { width, height })?;
    viewport.fill(tiny_skia::Color::from_rgba8(0x2B, 0x2B, 0x2B, 0xFF));

    let sheet = pixmap_from_image(&page.bitmap)
        .ok_or(CanvasError::Allocate { width: page.width(), height: page.height() })?;
    let view = editor.view();
    let paint = PixmapPaint { quality: FilterQuality::Bilinear, ..PixmapPaint::default() };
    let placement = Transform::from_row(
        view.scale as f32,
        0.0,
        0.0,
        view.scale as f32,
        view.pan.x as f32,
        view.pan.y as f32,
    );
    viewport.draw_pixmap(0, 0, sheet.as_ref(), &paint, placement, None);

    let mut painter = Painter::new(&mut viewport, view, options);
    for annotation in editor.visible_annotations() {
        painter.annotation(annotation);
    }
    if let Some(temp) = editor.temp() {
        painter.annotation(temp);
    }
    painter.angle_preview(editor.angle_points());
    if let Some(selected) = editor.selected() {
        painter.selection(selected);
    }

    Ok(image_from_pixmap(&viewport))
}

#[cfg(test)]
mod tests {
    use super::*;
    use markup_editor::{EditorConfig, Tool};
    use markup_model::{Owner, Point};
    use markup_pages::fixtures::blank_pdf;
    use markup_pages::{DocumentState, LopdfBackend, PageRenderer, PageSize, SourceDocument};
    use markup_store::MemoryStore;

    fn setup() -> (Editor<MemoryStore>, RenderedPage, RenderedPage) {
        let letter = PageSize { width_pt: 612.0, height_pt: 792.0 };
        let mut renderer = PageRenderer::new(LopdfBackend::new());
        let doc = renderer.load(&SourceDocument::pdf(blank_pdf(&[letter, letter]).unwrap())).unwrap();
        let first = renderer.render_page(&doc, 1, 900).unwrap();
        let second = renderer.render_page(&doc, 2, 900).unwrap();
        let editor = Editor::new(
            Owner::new(1, 1),
            &DocumentState::Ready(doc),
            MemoryStore::new(),
            &EditorConfig::default(),
        );
        (editor, first, second)
    }

    fn is_red(image: &RgbaImage, x: u32, y: u32) -> bool {
        let px = image.get_pixel(x, y).0;
        px[0] > 200 && px[1] < 60 && px[2] < 60
    }

    #[test]
    fn composes_page_and_annotations_under_zoom() {
        let (mut editor, first, _) = setup();
        editor.switch_tool(Tool::Rectangle);
        editor.pointer_down(Point::new(50.0, 50.0));
        editor.pointer_move(Point::new(150.0, 100.0));
        editor.pointer_up();
        editor.zoom(1.0);

        let image = render_view(&editor, &first, (400, 300), PaintOptions::default()).unwrap();
        assert_eq!(image.dimensions(), (400, 300));
        // document (50, 50)..(150, 100) at scale 2
        assert!(is_red(&image, 200, 100));
        assert!(!is_red(&image, 200, 150));
    }

    #[test]
    fn in_progress_shape_is_drawn() {
        let (mut editor, first, _) = setup();
        editor.switch_tool(Tool::Line);
        editor.pointer_down(Point::new(10.0, 40.0));
        editor.pointer_move(Point::new(90.0, 40.0));

        let image = render_view(&editor, &first, (120, 80), PaintOptions::default()).unwrap();
        assert!(is_red(&image, 50, 40));
        assert!(editor.annotations().is_empty());
    }

    #[test]
    fn stale_page_render_is_refused() {
        let (mut editor, first, second) = setup();
        editor.next_page();
        assert!(matches!(
            render_view(&editor, &first, (10, 10), PaintOptions::default()),
            Err(CanvasError::StalePage { rendered: 1, current: 2 })
        ));
        assert!(render_view(&editor, &second, (10, 10), PaintOptions::default()).is_ok());
    }
}
