//! Interaction state machine
//!
//! Turns pointer and keyboard input into annotation changes. Pointer positions
//! arrive in screen space and are mapped into document space before any
//! geometry is created or hit-tested. Persistence failures never escape a
//! handler; they end up in [`SaveStatus`] and the notice queue.

use markup_model::handles::rotation_handle;
use markup_model::transform::{self, RotationDrag};
use markup_model::{
    Annotation, AnnotationCollection, Color, LocalKey, Owner, Point, Shape, Style, TextBlock,
    ViewTransform,
};
use markup_pages::DocumentState;
use markup_store::{AnnotationStore, PersistenceBridge, PersistenceFailure};

use crate::config::{CanvasConfig, DrawingConfig, EditorConfig};
use crate::prompt::{ArrayParams, NoPrompt, Prompter};
use crate::status::{Notice, Notices, SaveStatus};
use crate::tool::{Key, Modifiers, Tool};
use crate::undo::UndoLog;

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionState {
    Idle,
    /// Press-drag-release shapes and freehand ink.
    Drawing { start: Point },
    /// Polygon or polyline collecting clicks; `preview` follows the pointer.
    PathBuilding { preview: Option<Point> },
    /// `grab` is the screen position minus the pan offset at press time.
    Panning { grab: Point },
    Moving { origin: Point, original: Annotation },
    Scaling { origin: Point, original: Annotation },
    Rotating { drag: RotationDrag, original: Annotation },
    MeasuringAngle { points: Vec<Point> },
}

/// Result of [`Editor::array_selected`] and the array tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArrayOutcome {
    pub created: usize,
    pub failed: usize,
}

pub struct Editor<S> {
    owner: Owner,
    page: u32,
    page_count: u32,
    view_only: bool,
    drawing: DrawingConfig,
    canvas: CanvasConfig,
    view: ViewTransform,
    tool: Tool,
    color: Color,
    line_width: f64,
    state: InteractionState,
    annotations: AnnotationCollection,
    selection: Option<LocalKey>,
    temp: Option<Annotation>,
    undo: UndoLog,
    status: SaveStatus,
    notices: Notices,
    bridge: PersistenceBridge<S>,
    prompter: Box<dyn Prompter>,
}

impl<S: AnnotationStore> Editor<S> {
    /// Editor for one file. A document that failed to load is view-only.
    pub fn new(owner: Owner, document: &DocumentState, store: S, config: &EditorConfig) -> Self {
        let (page_count, view_only) = match document {
            DocumentState::Ready(doc) => (doc.page_count().max(1), false),
            DocumentState::ViewOnly { .. } => (1, true),
        };
        let mut notices = Notices::default();
        if let DocumentState::ViewOnly { reason } = document {
            notices.push(Notice::error(format!("Document opened view-only: {reason}")));
        }

        Self {
            owner,
            page: 1,
            page_count,
            view_only,
            drawing: config.drawing.clone(),
            canvas: config.canvas.clone(),
            view: ViewTransform::default(),
            tool: Tool::default(),
            color: config.drawing.color,
            line_width: config.drawing.line_width,
            state: InteractionState::Idle,
            annotations: AnnotationCollection::new(),
            selection: None,
            temp: None,
            undo: UndoLog::with_depth(config.drawing.undo_depth),
            status: SaveStatus::Saved,
            notices,
            bridge: PersistenceBridge::new(store),
            prompter: Box::new(NoPrompt),
        }
    }

    pub fn with_prompter(mut self, prompter: impl Prompter + 'static) -> Self {
        self.prompter = Box::new(prompter);
        self
    }

    /// Replace the in-memory collection with the stored annotations of the file.
    pub fn load(&mut self) -> Result<usize, PersistenceFailure> {
        match self.bridge.list_by_file(self.owner.file_id) {
            Ok(annotations) => {
                let count = annotations.len();
                self.annotations = annotations.into_iter().collect();
                self.selection = None;
                Ok(count)
            }
            Err(err) => {
                self.notices.push(Notice::error(err.to_string()));
                Err(err)
            }
        }
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn is_view_only(&self) -> bool {
        self.view_only
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    pub fn status(&self) -> SaveStatus {
        self.status
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }

    pub fn annotations(&self) -> &AnnotationCollection {
        &self.annotations
    }

    /// Committed annotations of the current page, bottom-most first.
    pub fn visible_annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.on_page(self.page)
    }

    /// In-progress shape, drawn as an overlay and never persisted.
    pub fn temp(&self) -> Option<&Annotation> {
        self.temp.as_ref()
    }

    /// Points collected so far by the angle tool.
    pub fn angle_points(&self) -> &[Point] {
        match &self.state {
            InteractionState::MeasuringAngle { points } => points,
            _ => &[],
        }
    }

    pub fn selected(&self) -> Option<&Annotation> {
        self.selection.and_then(|key| self.annotations.get(key))
    }

    pub fn select(&mut self, key: Option<LocalKey>) {
        self.selection = key.filter(|key| self.annotations.get(*key).is_some());
    }

    pub fn store(&self) -> &S {
        self.bridge.store()
    }

    pub fn store_mut(&mut self) -> &mut S {
        self.bridge.store_mut()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn set_line_width(&mut self, width: f64) {
        self.line_width = width.max(0.5);
    }

    pub fn document_point(&self, screen: Point) -> Point {
        self.view.to_document(screen)
    }

    /// Switch tools. A polygon or polyline in progress is committed first.
    pub fn switch_tool(&mut self, tool: Tool) {
        if tool == self.tool {
            return;
        }
        self.finish_gesture();
        tracing::debug!(from = %self.tool, to = %tool, "tool switched");
        self.tool = tool;
    }

    /// Show another page. Clears the selection; out-of-range pages are ignored.
    pub fn go_to_page(&mut self, page: u32) -> bool {
        if page == 0 || page > self.page_count {
            return false;
        }
        self.finish_gesture();
        self.page = page;
        self.selection = None;
        tracing::debug!(page, "page changed");
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.page + 1)
    }

    pub fn previous_page(&mut self) -> bool {
        self.page > 1 && self.go_to_page(self.page - 1)
    }

    pub fn zoom_in(&mut self) {
        self.zoom(self.canvas.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.zoom(-self.canvas.zoom_step);
    }

    pub fn zoom(&mut self, delta: f64) {
        self.view = self.view.zoomed(delta, self.canvas.zoom_min, self.canvas.zoom_max);
    }

    pub fn zoom_fit(&mut self) {
        self.view = ViewTransform::default();
    }

    pub fn pointer_down(&mut self, screen: Point) {
        let pos = self.view.to_document(screen);

        if self.tool == Tool::Pan {
            let grab = Point::new(screen.x - self.view.pan.x, screen.y - self.view.pan.y);
            self.state = InteractionState::Panning { grab };
            return;
        }
        if self.view_only && self.tool.edits() {
            tracing::debug!(tool = %self.tool, "editing disabled for view-only document");
            return;
        }

        match self.tool {
            Tool::Pan => {}
            Tool::Select => self.select_at(pos),
            Tool::Move | Tool::Scale => self.begin_transform(pos),
            Tool::Copy => self.copy_at(pos),
            Tool::Mirror => self.mirror_at(pos),
            Tool::Array => {
                self.array_at(pos);
            }
            Tool::Eraser => self.erase_at(pos),
            Tool::Polygon | Tool::Polyline => self.add_path_point(pos),
            Tool::MeasureAngle => self.add_angle_point(pos),
            Tool::Text => self.place_text(pos),
            Tool::Pencil => {
                self.state = InteractionState::Drawing { start: pos };
                let style = self.stroke_style();
                self.temp = Some(self.new_annotation(Shape::Pencil { points: vec![pos] }, style));
            }
            Tool::Line
            | Tool::Arrow
            | Tool::Rectangle
            | Tool::Circle
            | Tool::Ellipse
            | Tool::MeasureDistance => {
                self.state = InteractionState::Drawing { start: pos };
                self.temp = None;
            }
        }
    }

    pub fn pointer_move(&mut self, screen: Point) {
        let pos = self.view.to_document(screen);

        match &mut self.state {
            InteractionState::Idle => {}
            InteractionState::Panning { grab } => {
                let pan = Point::new(screen.x - grab.x, screen.y - grab.y);
                self.view = self.view.panned_to(pan);
            }
            InteractionState::PathBuilding { preview } => *preview = Some(pos),
            InteractionState::MeasuringAngle { .. } => {}
            InteractionState::Moving { origin, original } => {
                let live = transform::translate(original, pos.x - origin.x, pos.y - origin.y);
                self.annotations.replace(live);
            }
            InteractionState::Scaling { origin, original } => {
                let (width, height) = original.shape().extent();
                let live = transform::resize(
                    original,
                    width + (pos.x - origin.x),
                    height + (pos.y - origin.y),
                );
                self.annotations.replace(live);
            }
            InteractionState::Rotating { drag, original } => {
                let live = transform::set_rotation(original, drag.rotation_at(pos));
                self.annotations.replace(live);
            }
            InteractionState::Drawing { start } => {
                let start = *start;
                self.update_drawing(start, pos);
            }
        }
    }

    pub fn pointer_up(&mut self) {
        let state = std::mem::replace(&mut self.state, InteractionState::Idle);

        match state {
            InteractionState::Moving { original, .. }
            | InteractionState::Scaling { original, .. }
            | InteractionState::Rotating { original, .. } => self.finish_transform(original),
            InteractionState::Drawing { .. } => {
                if let Some(temp) = self.temp.take() {
                    let complete = match temp.shape() {
                        Shape::Pencil { points } => points.len() > 1,
                        _ => true,
                    };
                    if complete {
                        self.commit(temp);
                    }
                }
            }
            // gestures that span several clicks stay active
            InteractionState::PathBuilding { .. } | InteractionState::MeasuringAngle { .. } => {
                self.state = state;
            }
            InteractionState::Idle | InteractionState::Panning { .. } => {}
        }
    }

    /// Double-click edits text under the pointer, otherwise finishes a path.
    pub fn double_click(&mut self, screen: Point) {
        if self.view_only {
            return;
        }
        let pos = self.view.to_document(screen);
        let hit = self.hit(pos).filter(|a| matches!(a.shape(), Shape::Text(_))).cloned();

        if let Some(target) = hit {
            self.edit_text(&target);
        } else if matches!(self.state, InteractionState::PathBuilding { .. }) {
            self.finish_path();
        }
    }

    pub fn key(&mut self, key: Key, modifiers: Modifiers) {
        match key {
            Key::Delete | Key::Backspace => self.delete_selected(),
            Key::Escape => self.cancel_gesture(),
            Key::Char(c) if modifiers.ctrl => match c.to_ascii_lowercase() {
                'z' if modifiers.shift => self.redo(),
                'z' => self.undo(),
                'y' => self.redo(),
                _ => {}
            },
            Key::Char(c) => {
                if let Some(tool) = Tool::from_hotkey(c) {
                    self.switch_tool(tool);
                }
            }
        }
    }

    /// Delete the most recently committed annotation and keep it for redo.
    pub fn undo(&mut self) {
        if self.view_only {
            return;
        }
        let Some(last) = self.annotations.last().cloned() else {
            return;
        };
        if self.remove(&last) {
            self.undo.push_undone(last);
            self.notices.push(Notice::info("Undo successful"));
        }
    }

    /// Re-create the most recently undone annotation. It receives a new id.
    pub fn redo(&mut self) {
        if self.view_only {
            return;
        }
        let Some(snapshot) = self.undo.pop_redo() else {
            return;
        };
        let restored = snapshot.detached();
        self.status = SaveStatus::Saving;
        match self.bridge.create(&restored) {
            Ok(saved) => {
                self.annotations.push(saved);
                self.status = SaveStatus::Saved;
                self.notices.push(Notice::info("Redo successful"));
            }
            Err(err) => {
                self.undo.restore(snapshot);
                self.report(err);
            }
        }
    }

    pub fn delete_selected(&mut self) {
        if self.view_only {
            return;
        }
        if let Some(selected) = self.selected().cloned() {
            if self.remove(&selected) {
                self.undo.push_undone(selected);
                self.notices.push(Notice::success("Annotation deleted"));
            }
        }
    }

    /// Delete every annotation of the file. Each deletion is attempted on its
    /// own; failed ones stay in the collection.
    pub fn clear_all(&mut self) -> usize {
        if self.view_only {
            return 0;
        }
        self.cancel_gesture();
        let all: Vec<Annotation> = self.annotations.iter().cloned().collect();
        let mut failed = 0;
        let mut removed = 0;
        for annotation in &all {
            match self.bridge.delete(annotation) {
                Ok(()) => {
                    self.annotations.remove(annotation.key());
                    removed += 1;
                }
                Err(err) => {
                    tracing::warn!("{err}");
                    failed += 1;
                }
            }
        }
        self.selection = None;
        if failed == 0 {
            self.notices.push(Notice::success("All annotations cleared"));
        } else {
            self.status = SaveStatus::Unsaved;
            self.notices.push(Notice::error(format!(
                "delete annotation failed for {failed} of {} annotations",
                all.len()
            )));
        }
        removed
    }

    /// Horizontally flip the selected annotation.
    pub fn mirror_selected(&mut self) {
        if self.view_only {
            return;
        }
        if let Some(selected) = self.selected().cloned() {
            self.apply_edit(transform::mirror(&selected), "Mirrored");
        }
    }

    /// Rotate the selected annotation by `radians` (text is unaffected).
    pub fn rotate_selected(&mut self, radians: f64) {
        if self.view_only {
            return;
        }
        if let Some(selected) = self.selected().cloned() {
            if !matches!(selected.shape(), Shape::Text(_)) {
                self.apply_edit(transform::rotate(&selected, radians), "Rotated");
            }
        }
    }

    /// Create `count - 1` offset copies of the selected annotation.
    pub fn array_selected(&mut self, params: ArrayParams) -> ArrayOutcome {
        match self.selected().cloned() {
            Some(base) if !self.view_only => self.create_array(&base, params),
            _ => ArrayOutcome::default(),
        }
    }

    fn select_at(&mut self, pos: Point) {
        if let Some(selected) = self.selected().filter(|a| a.page() == self.page).cloned() {
            let on_handle = rotation_handle(&selected, self.drawing.rotation_handle_offset)
                .is_some_and(|handle| handle.distance_to(&pos) <= self.drawing.rotation_handle_radius);
            if on_handle && !self.view_only {
                let drag = RotationDrag::begin(&selected, pos);
                self.state = InteractionState::Rotating { drag, original: selected };
                return;
            }
        }
        self.selection = self.hit(pos).map(Annotation::key);
    }

    fn begin_transform(&mut self, pos: Point) {
        let target = self.hit(pos).or_else(|| self.selected_on_page()).cloned();
        let Some(original) = target else {
            return;
        };
        self.selection = Some(original.key());
        self.state = match self.tool {
            Tool::Scale => InteractionState::Scaling { origin: pos, original },
            _ => InteractionState::Moving { origin: pos, original },
        };
    }

    fn copy_at(&mut self, pos: Point) {
        if let Some(clicked) = self.hit(pos).cloned() {
            self.commit(transform::duplicate(&clicked, self.drawing.copy_offset));
        }
    }

    fn mirror_at(&mut self, pos: Point) {
        let target = self.hit(pos).or_else(|| self.selected_on_page()).cloned();
        if let Some(target) = target {
            self.selection = Some(target.key());
            self.apply_edit(transform::mirror(&target), "Mirrored");
        }
    }

    fn array_at(&mut self, pos: Point) -> ArrayOutcome {
        let base = self.hit(pos).or_else(|| self.selected_on_page()).cloned();
        let Some(base) = base else {
            return ArrayOutcome::default();
        };
        match self.prompter.array_params(ArrayParams::default()) {
            Some(params) => self.create_array(&base, params),
            None => ArrayOutcome::default(),
        }
    }

    fn create_array(&mut self, base: &Annotation, params: ArrayParams) -> ArrayOutcome {
        if params.count < 2 {
            return ArrayOutcome::default();
        }
        let mut outcome = ArrayOutcome::default();
        for copy in transform::array(base, params.count, params.dx, params.dy) {
            if self.commit(copy) {
                outcome.created += 1;
            } else {
                outcome.failed += 1;
            }
        }
        if outcome.failed == 0 {
            self.notices.push(Notice::success("Array created"));
        } else {
            tracing::warn!(created = outcome.created, failed = outcome.failed, "array partially created");
            self.status = SaveStatus::Unsaved;
            self.notices.push(Notice::error(format!(
                "Array partially created: {} of {} copies failed",
                outcome.failed,
                outcome.created + outcome.failed
            )));
        }
        outcome
    }

    fn erase_at(&mut self, pos: Point) {
        if let Some(target) = self.hit(pos).cloned() {
            if self.remove(&target) {
                self.undo.push_undone(target);
                self.notices.push(Notice::success("Annotation deleted"));
            }
        }
    }

    fn add_path_point(&mut self, pos: Point) {
        if matches!(self.state, InteractionState::PathBuilding { .. }) {
            if let Some(temp) = self.temp.take() {
                let mut points = temp.shape().points().map(<[Point]>::to_vec).unwrap_or_default();
                points.push(pos);
                self.temp = Some(temp.with_shape(path_shape(self.tool, points)));
                return;
            }
        }
        let style = self.stroke_style();
        self.temp = Some(self.new_annotation(path_shape(self.tool, vec![pos]), style));
        self.state = InteractionState::PathBuilding { preview: None };
    }

    fn add_angle_point(&mut self, pos: Point) {
        let mut points = match std::mem::replace(&mut self.state, InteractionState::Idle) {
            InteractionState::MeasuringAngle { points } => points,
            _ => Vec::new(),
        };
        points.push(pos);

        if let Ok(points) = <[Point; 3]>::try_from(points.as_slice()) {
            let style = Style::new(Color::MEASURE_ANGLE, Style::DEFAULT_LINE_WIDTH);
            self.commit(self.new_annotation(Shape::MeasureAngle { points }, style));
        } else {
            self.state = InteractionState::MeasuringAngle { points };
        }
    }

    fn place_text(&mut self, pos: Point) {
        let Some(text) = self.prompter.text("Enter text:", "") else {
            return;
        };
        if text.trim().is_empty() {
            return;
        }
        let shape = Shape::Text(TextBlock {
            origin: pos,
            content: text,
            font_size: self.drawing.font_size,
        });
        let style = self.stroke_style();
        self.commit(self.new_annotation(shape, style));
    }

    fn edit_text(&mut self, target: &Annotation) {
        let Shape::Text(block) = target.shape() else {
            return;
        };
        let Some(content) = self.prompter.text("Edit text:", &block.content) else {
            return;
        };
        // an emptied text counts as a cancelled edit
        if content.trim().is_empty() {
            return;
        }
        let edited = target.with_shape(Shape::Text(TextBlock { content, ..block.clone() }));
        self.apply_edit(edited, "Text updated");
    }

    fn update_drawing(&mut self, start: Point, pos: Point) {
        if self.tool == Tool::Pencil {
            if let Some(temp) = &mut self.temp {
                if let Shape::Pencil { points } = temp.shape() {
                    let mut points = points.clone();
                    points.push(pos);
                    *temp = temp.with_shape(Shape::Pencil { points });
                }
            }
            return;
        }
        let Some(kind) = self.tool.drag_kind() else {
            return;
        };
        if let Some(shape) = Shape::dragged(kind, start, pos) {
            let style = match self.tool {
                Tool::MeasureDistance => Style::new(Color::MEASURE_DISTANCE, Style::DEFAULT_LINE_WIDTH),
                _ => self.stroke_style(),
            };
            self.temp = Some(self.new_annotation(shape, style));
        }
    }

    fn finish_transform(&mut self, original: Annotation) {
        let Some(live) = self.annotations.get(original.key()).cloned() else {
            return;
        };
        if live == original {
            return;
        }
        let message = match self.tool {
            Tool::Scale => "Resized",
            Tool::Move => "Moved",
            _ => "Rotated",
        };
        self.apply_edit(live.normalized(), message);
    }

    /// Commit the polygon or polyline in progress when it has at least two
    /// distinct points; otherwise drop it.
    fn finish_path(&mut self) {
        self.state = InteractionState::Idle;
        let Some(temp) = self.temp.take() else {
            return;
        };
        let points: Vec<Point> = temp.shape().points().map(dedup_points).unwrap_or_default();
        if points.len() > 1 {
            let tool = match temp.shape() {
                Shape::Polygon { .. } => Tool::Polygon,
                _ => Tool::Polyline,
            };
            let finished = temp.with_shape(path_shape(tool, points));
            if self.commit(finished) {
                self.notices.push(Notice::success(format!("{} saved", tool.label().to_lowercase())));
            }
        }
    }

    /// Leave the current gesture: paths are committed, everything else is
    /// dropped. A drag in progress keeps whatever was last committed.
    fn finish_gesture(&mut self) {
        match self.state {
            InteractionState::PathBuilding { .. } => self.finish_path(),
            _ => self.cancel_gesture(),
        }
    }

    fn cancel_gesture(&mut self) {
        let state = std::mem::replace(&mut self.state, InteractionState::Idle);
        if let InteractionState::Moving { original, .. }
        | InteractionState::Scaling { original, .. }
        | InteractionState::Rotating { original, .. } = state
        {
            self.annotations.replace(original);
        }
        self.temp = None;
    }

    /// Persist a new annotation and add it to the collection. The collection
    /// keeps the annotation even when saving fails.
    fn commit(&mut self, annotation: Annotation) -> bool {
        self.undo.clear_redo();
        self.status = SaveStatus::Saving;
        match self.bridge.create(&annotation) {
            Ok(saved) => {
                self.annotations.push(saved);
                self.status = SaveStatus::Saved;
                self.notices.push(Notice::success("Annotation saved"));
                true
            }
            Err(err) => {
                self.annotations.push(annotation.normalized());
                self.report(err);
                false
            }
        }
    }

    /// Store an edited annotation in place and persist it. Annotations whose
    /// earlier save failed are created instead.
    fn apply_edit(&mut self, edited: Annotation, message: &str) {
        self.annotations.replace(edited.clone());
        self.status = SaveStatus::Saving;

        let result = if edited.is_persisted() {
            self.bridge.update(&edited).map(|()| edited)
        } else {
            self.bridge.create(&edited)
        };
        match result {
            Ok(saved) => {
                self.annotations.replace(saved);
                self.status = SaveStatus::Saved;
                self.notices.push(Notice::info(message));
            }
            Err(err) => self.report(err),
        }
    }

    /// Delete remotely, then locally. Returns whether it was removed.
    fn remove(&mut self, annotation: &Annotation) -> bool {
        match self.bridge.delete(annotation) {
            Ok(()) => {
                self.annotations.remove(annotation.key());
                if self.selection == Some(annotation.key()) {
                    self.selection = None;
                }
                true
            }
            Err(err) => {
                self.report(err);
                false
            }
        }
    }

    fn report(&mut self, err: PersistenceFailure) {
        tracing::warn!(operation = %err.operation(), "{err}");
        self.status = SaveStatus::Unsaved;
        self.notices.push(Notice::error(err.to_string()));
    }

    fn hit(&self, pos: Point) -> Option<&Annotation> {
        self.annotations.hit_test(self.page, &pos, self.drawing.hit_tolerance, self.drawing.hit_policy)
    }

    fn selected_on_page(&self) -> Option<&Annotation> {
        self.selected().filter(|a| a.page() == self.page)
    }

    fn stroke_style(&self) -> Style {
        Style::new(self.color, self.line_width)
    }

    fn new_annotation(&self, shape: Shape, style: Style) -> Annotation {
        Annotation::new(self.owner, self.page, shape, style)
    }
}

fn path_shape(tool: Tool, points: Vec<Point>) -> Shape {
    match tool {
        Tool::Polygon => Shape::Polygon { points },
        _ => Shape::Polyline { points },
    }
}

/// Drop consecutive repeats, such as the extra clicks of a double-click.
fn dedup_points(points: &[Point]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for point in points {
        if out.last().map_or(true, |last| last.distance_to(point) > 1e-6) {
            out.push(*point);
        }
    }
    out
}
