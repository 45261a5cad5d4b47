use std::f64::consts::FRAC_PI_2;

use markup_editor::{
    ArrayParams, Editor, EditorConfig, InteractionState, Key, Modifiers, NoticeLevel, SaveStatus,
    ScriptedPrompter, Tool,
};
use markup_model::{Frame, Owner, Point, Shape};
use markup_pages::fixtures::blank_pdf;
use markup_pages::{DocumentState, LopdfBackend, PageRenderer, PageSize, SourceDocument};
use markup_store::{decode, MemoryStore};

fn two_page_document() -> DocumentState {
    let letter = PageSize { width_pt: 612.0, height_pt: 792.0 };
    let bytes = blank_pdf(&[letter, letter]).unwrap();
    let mut renderer = PageRenderer::new(LopdfBackend::new());
    DocumentState::Ready(renderer.load(&SourceDocument::pdf(bytes)).unwrap())
}

fn editor(store: MemoryStore) -> Editor<MemoryStore> {
    Editor::new(Owner::new(1, 7), &two_page_document(), store, &EditorConfig::default())
}

fn p(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn drag(editor: &mut Editor<MemoryStore>, from: Point, to: Point) {
    editor.pointer_down(from);
    editor.pointer_move(to);
    editor.pointer_up();
}

fn draw_rect(editor: &mut Editor<MemoryStore>) {
    editor.switch_tool(Tool::Rectangle);
    drag(editor, p(50.0, 50.0), p(150.0, 100.0));
}

#[test]
fn drawing_maps_screen_to_document_space() {
    let mut editor = editor(MemoryStore::new());
    editor.zoom(1.0);
    editor.switch_tool(Tool::Pan);
    drag(&mut editor, p(0.0, 0.0), p(10.0, 10.0));
    assert_eq!(editor.view().scale, 2.0);
    assert_eq!(editor.view().pan, p(10.0, 10.0));

    editor.key(Key::Char('r'), Modifiers::NONE);
    assert_eq!(editor.tool(), Tool::Rectangle);
    drag(&mut editor, p(110.0, 110.0), p(310.0, 210.0));

    let drawn = editor.annotations().last().unwrap();
    assert_eq!(drawn.shape(), &Shape::Rectangle(Frame::new(50.0, 50.0, 100.0, 50.0)));
    assert!(drawn.is_persisted());
    assert_eq!(editor.status(), SaveStatus::Saved);
}

#[test]
fn dragging_backwards_is_normalized_when_saved() {
    let mut editor = editor(MemoryStore::new());
    editor.switch_tool(Tool::Rectangle);
    drag(&mut editor, p(150.0, 100.0), p(50.0, 50.0));

    let row = &editor.store().records()[0];
    assert_eq!((row.x, row.y, row.width, row.height), (50.0, 50.0, Some(100.0), Some(50.0)));
    let drawn = editor.annotations().last().unwrap();
    assert_eq!(drawn.shape(), &Shape::Rectangle(Frame::new(50.0, 50.0, 100.0, 50.0)));
}

#[test]
fn click_without_drag_creates_nothing() {
    let mut editor = editor(MemoryStore::new());
    editor.switch_tool(Tool::Line);
    editor.pointer_down(p(5.0, 5.0));
    editor.pointer_up();
    editor.switch_tool(Tool::Pencil);
    editor.pointer_down(p(5.0, 5.0));
    editor.pointer_up();
    assert!(editor.annotations().is_empty());
}

#[test]
fn annotations_stay_on_their_page() {
    let prompter = ScriptedPrompter::new().answer_text("Note");
    let mut editor = editor(MemoryStore::new()).with_prompter(prompter);

    draw_rect(&mut editor);
    assert!(editor.go_to_page(2));
    editor.key(Key::Char('t'), Modifiers::NONE);
    editor.pointer_down(p(20.0, 20.0));

    let page_two: Vec<_> = editor.visible_annotations().collect();
    assert_eq!(page_two.len(), 1);
    assert!(matches!(page_two[0].shape(), Shape::Text(t) if t.content == "Note"));
    assert_eq!(page_two[0].page(), 2);

    editor.previous_page();
    let page_one: Vec<_> = editor.visible_annotations().collect();
    assert_eq!(page_one.len(), 1);
    assert!(matches!(page_one[0].shape(), Shape::Rectangle(_)));
    assert!(!editor.go_to_page(3));
}

#[test]
fn page_change_clears_selection() {
    let mut editor = editor(MemoryStore::new());
    draw_rect(&mut editor);
    editor.switch_tool(Tool::Select);
    editor.pointer_down(p(60.0, 60.0));
    editor.pointer_up();
    assert!(editor.selected().is_some());

    editor.next_page();
    assert!(editor.selected().is_none());
}

#[test]
fn redo_restores_undone_annotation_with_new_id() {
    let mut editor = editor(MemoryStore::new());
    draw_rect(&mut editor);
    let original = editor.annotations().last().unwrap().clone();

    editor.key(Key::Char('z'), Modifiers::CTRL);
    assert!(editor.annotations().is_empty());
    assert!(editor.store().records().is_empty());
    assert!(editor.can_redo());

    editor.key(Key::Char('y'), Modifiers::CTRL);
    let restored = editor.annotations().last().unwrap();
    assert_eq!(restored.shape(), original.shape());
    assert_eq!(restored.style(), original.style());
    assert_eq!(restored.kind(), original.kind());
    assert_ne!(restored.id(), original.id());
    assert!(!editor.can_redo());
}

#[test]
fn new_creation_clears_redo() {
    let mut editor = editor(MemoryStore::new());
    draw_rect(&mut editor);
    editor.undo();
    assert!(editor.can_redo());

    drag(&mut editor, p(0.0, 0.0), p(10.0, 10.0));
    assert!(!editor.can_redo());
}

#[test]
fn delete_key_removes_selection_and_redo_brings_it_back() {
    let mut editor = editor(MemoryStore::new());
    draw_rect(&mut editor);
    editor.switch_tool(Tool::Select);
    editor.pointer_down(p(100.0, 75.0));
    editor.pointer_up();

    editor.key(Key::Delete, Modifiers::NONE);
    assert!(editor.annotations().is_empty());
    assert!(editor.selected().is_none());

    editor.key(Key::Char('Z'), Modifiers::CTRL_SHIFT);
    assert_eq!(editor.annotations().len(), 1);
}

#[test]
fn array_keeps_successful_copies_when_one_fails() {
    let prompter = ScriptedPrompter::new().answer_array(ArrayParams { count: 4, dx: 10.0, dy: 0.0 });
    let mut editor = editor(MemoryStore::new().rejecting_create(3)).with_prompter(prompter);
    draw_rect(&mut editor);

    editor.switch_tool(Tool::Array);
    editor.pointer_down(p(100.0, 75.0));

    assert_eq!(editor.store().records().len(), 3);
    let xs: Vec<f64> = editor.store().records().iter().map(|r| r.x).collect();
    assert_eq!(xs, vec![50.0, 60.0, 80.0]);
    assert_eq!(editor.annotations().len(), 4);
    assert_eq!(editor.status(), SaveStatus::Unsaved);

    let notice = editor.notices().latest().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.message.contains("1 of 3"));
}

#[test]
fn cancelled_array_prompt_creates_nothing() {
    let mut editor = editor(MemoryStore::new());
    draw_rect(&mut editor);
    editor.switch_tool(Tool::Array);
    editor.pointer_down(p(100.0, 75.0));
    assert_eq!(editor.annotations().len(), 1);
}

#[test]
fn copy_tool_offsets_duplicate() {
    let mut editor = editor(MemoryStore::new());
    draw_rect(&mut editor);
    editor.switch_tool(Tool::Copy);
    editor.pointer_down(p(100.0, 75.0));

    let copy = editor.annotations().last().unwrap();
    assert_eq!(copy.shape(), &Shape::Rectangle(Frame::new(70.0, 70.0, 100.0, 50.0)));
    assert_eq!(editor.store().records().len(), 2);
}

#[test]
fn move_persists_on_release() {
    let mut editor = editor(MemoryStore::new());
    draw_rect(&mut editor);
    editor.switch_tool(Tool::Move);
    editor.pointer_down(p(100.0, 75.0));
    editor.pointer_move(p(110.0, 80.0));
    assert!(matches!(editor.state(), InteractionState::Moving { .. }));
    assert_eq!(editor.store().records()[0].x, 50.0);
    editor.pointer_up();

    let row = &editor.store().records()[0];
    assert_eq!((row.x, row.y), (60.0, 55.0));
}

#[test]
fn scale_past_the_anchor_normalizes() {
    let mut editor = editor(MemoryStore::new());
    draw_rect(&mut editor);
    editor.switch_tool(Tool::Scale);
    editor.pointer_down(p(150.0, 100.0));
    editor.pointer_move(p(0.0, 0.0));
    editor.pointer_up();

    let scaled = editor.annotations().last().unwrap();
    assert_eq!(scaled.shape(), &Shape::Rectangle(Frame::new(0.0, 0.0, 50.0, 50.0)));
    let row = &editor.store().records()[0];
    assert_eq!((row.width, row.height), (Some(50.0), Some(50.0)));
}

#[test]
fn mirror_tool_keeps_frame_in_place() {
    let mut editor = editor(MemoryStore::new());
    draw_rect(&mut editor);
    editor.switch_tool(Tool::Mirror);
    editor.pointer_down(p(100.0, 75.0));
    let mirrored = editor.annotations().last().unwrap();
    assert_eq!(mirrored.bounding_box(), markup_model::Rect::new(50.0, 50.0, 100.0, 50.0));
}

#[test]
fn rotation_handle_tracks_the_pointer() {
    let mut editor = editor(MemoryStore::new());
    draw_rect(&mut editor);
    editor.switch_tool(Tool::Select);
    editor.pointer_down(p(60.0, 60.0));
    editor.pointer_up();

    // handle sits 30 units above the box, over its center (100, 75)
    editor.pointer_down(p(100.0, 20.0));
    assert!(matches!(editor.state(), InteractionState::Rotating { .. }));
    editor.pointer_move(p(155.0, 75.0));
    editor.pointer_up();

    let rotation = editor.selected().unwrap().rotation();
    assert!((rotation - FRAC_PI_2).abs() < 1e-9);
    let stored = decode(&editor.store().records()[0]).unwrap();
    assert!((stored.rotation() - FRAC_PI_2).abs() < 1e-9);
}

#[test]
fn polygon_commits_on_tool_switch() {
    let mut editor = editor(MemoryStore::new());
    editor.switch_tool(Tool::Polygon);
    for point in [p(0.0, 0.0), p(40.0, 0.0), p(40.0, 30.0)] {
        editor.pointer_down(point);
        editor.pointer_up();
    }
    assert!(editor.temp().is_some());
    assert!(editor.annotations().is_empty());

    editor.key(Key::Char('s'), Modifiers::NONE);
    assert!(editor.temp().is_none());
    let polygon = editor.annotations().last().unwrap();
    assert_eq!(polygon.shape().points().unwrap().len(), 3);
    assert_eq!(editor.store().records().len(), 1);
}

#[test]
fn single_point_polyline_is_dropped_on_switch() {
    let mut editor = editor(MemoryStore::new());
    editor.switch_tool(Tool::Polyline);
    editor.pointer_down(p(1.0, 1.0));
    editor.pointer_up();
    editor.switch_tool(Tool::Select);
    assert!(editor.annotations().is_empty());
    assert!(editor.temp().is_none());
}

#[test]
fn double_click_finishes_polyline_without_duplicate_points() {
    let mut editor = editor(MemoryStore::new());
    editor.switch_tool(Tool::Polyline);
    for point in [p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0), p(10.0, 10.0)] {
        editor.pointer_down(point);
        editor.pointer_up();
    }
    editor.double_click(p(10.0, 10.0));

    let polyline = editor.annotations().last().unwrap();
    assert_eq!(polyline.shape().points().unwrap(), &[p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0)]);
    assert_eq!(editor.state(), &InteractionState::Idle);
}

#[test]
fn angle_measure_commits_after_third_point() {
    let mut editor = editor(MemoryStore::new());
    editor.key(Key::Char('g'), Modifiers::NONE);
    editor.pointer_down(p(0.0, 0.0));
    editor.pointer_up();
    editor.pointer_down(p(10.0, 0.0));
    editor.pointer_up();
    assert_eq!(editor.angle_points().len(), 2);
    assert!(editor.store().records().is_empty());

    editor.pointer_down(p(10.0, 10.0));
    assert!(editor.angle_points().is_empty());
    assert_eq!(editor.store().records()[0].kind, "measure-angle");
}

#[test]
fn eraser_removes_hit_annotation_only() {
    let mut editor = editor(MemoryStore::new());
    draw_rect(&mut editor);
    editor.key(Key::Char('e'), Modifiers::NONE);
    editor.pointer_down(p(400.0, 400.0));
    assert_eq!(editor.annotations().len(), 1);
    editor.pointer_down(p(55.0, 55.0));
    assert!(editor.annotations().is_empty());
}

#[test]
fn double_click_edits_text() {
    let prompter = ScriptedPrompter::new().answer_text("Note").answer_text("Revised");
    let mut editor = editor(MemoryStore::new()).with_prompter(prompter);
    editor.switch_tool(Tool::Text);
    editor.pointer_down(p(20.0, 20.0));
    editor.double_click(p(25.0, 15.0));

    let row = &editor.store().records()[0];
    assert_eq!(row.text.as_deref(), Some("Revised"));
}

#[test]
fn emptied_text_edit_keeps_the_original() {
    let prompter = ScriptedPrompter::new().answer_text("Note").answer_text("");
    let mut editor = editor(MemoryStore::new()).with_prompter(prompter);
    editor.switch_tool(Tool::Text);
    editor.pointer_down(p(20.0, 20.0));
    editor.double_click(p(25.0, 15.0));

    assert_eq!(editor.annotations().len(), 1);
    let Shape::Text(text) = editor.annotations().last().unwrap().shape() else {
        panic!("expected text");
    };
    assert_eq!(text.content, "Note");
    assert_eq!(editor.store().records()[0].text.as_deref(), Some("Note"));
}

#[test]
fn blank_text_is_not_created() {
    let prompter = ScriptedPrompter::new().answer_text("   ").cancel_text();
    let mut editor = editor(MemoryStore::new()).with_prompter(prompter);
    editor.switch_tool(Tool::Text);
    editor.pointer_down(p(20.0, 20.0));
    editor.pointer_down(p(20.0, 20.0));
    assert!(editor.annotations().is_empty());
}

#[test]
fn failed_save_keeps_shape_and_flags_status() {
    let mut editor = editor(MemoryStore::new());
    editor.store_mut().set_offline(true);
    draw_rect(&mut editor);

    assert_eq!(editor.status(), SaveStatus::Unsaved);
    let shape = editor.annotations().last().unwrap();
    assert!(!shape.is_persisted());
    let notice = editor.notices().latest().unwrap();
    assert!(notice.message.starts_with("save annotation failed"));

    // retrying through an edit saves it
    editor.store_mut().set_offline(false);
    editor.switch_tool(Tool::Move);
    drag(&mut editor, p(100.0, 75.0), p(101.0, 75.0));
    assert_eq!(editor.status(), SaveStatus::Saved);
    assert!(editor.annotations().last().unwrap().is_persisted());
    assert_eq!(editor.store().records().len(), 1);
}

#[test]
fn clear_all_reports_each_failure() {
    let mut editor = editor(MemoryStore::new());
    draw_rect(&mut editor);
    drag(&mut editor, p(200.0, 200.0), p(260.0, 260.0));
    assert_eq!(editor.clear_all(), 2);
    assert!(editor.annotations().is_empty());
    assert!(editor.store().records().is_empty());
}

#[test]
fn load_replaces_collection() {
    let mut first = editor(MemoryStore::new());
    draw_rect(&mut first);
    let records = first.store().records().to_vec();

    let mut second = editor(MemoryStore::with_records(records));
    assert_eq!(second.load().unwrap(), 1);
    assert_eq!(second.visible_annotations().count(), 1);
}

#[test]
fn view_only_document_blocks_editing() {
    let document = DocumentState::ViewOnly { reason: "parse error".into() };
    let mut editor =
        Editor::new(Owner::new(1, 7), &document, MemoryStore::new(), &EditorConfig::default());
    assert!(editor.is_view_only());
    assert!(editor.notices().latest().unwrap().message.contains("view-only"));

    editor.switch_tool(Tool::Rectangle);
    drag(&mut editor, p(0.0, 0.0), p(50.0, 50.0));
    assert!(editor.annotations().is_empty());

    editor.switch_tool(Tool::Pan);
    drag(&mut editor, p(0.0, 0.0), p(5.0, 5.0));
    assert_eq!(editor.view().pan, p(5.0, 5.0));
}

#[test]
fn zoom_is_clamped_and_fit_resets() {
    let mut editor = editor(MemoryStore::new());
    for _ in 0..20 {
        editor.zoom_in();
    }
    assert_eq!(editor.view().scale, 4.0);
    for _ in 0..20 {
        editor.zoom_out();
    }
    assert_eq!(editor.view().scale, 0.25);
    editor.zoom_fit();
    assert_eq!(editor.view().scale, 1.0);
}
