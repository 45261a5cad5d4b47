//! Undo/redo log
//!
//! Undo removes the most recently committed annotation; the removed snapshot
//! is kept here so redo can re-create it. Only creation and deletion are
//! undoable. In-place edits (move, scale, rotate, mirror, text edits) are not
//! recorded.

use std::collections::VecDeque;

use markup_model::Annotation;

#[derive(Debug, Clone)]
pub struct UndoLog {
    redo: VecDeque<Annotation>,
    max_depth: usize,
}

impl Default for UndoLog {
    fn default() -> Self {
        Self::with_depth(100)
    }
}

impl UndoLog {
    pub fn with_depth(max_depth: usize) -> Self {
        Self { redo: VecDeque::new(), max_depth: max_depth.max(1) }
    }

    /// Remember an undone annotation. The oldest snapshot is dropped once the
    /// log is full.
    pub fn push_undone(&mut self, annotation: Annotation) {
        self.redo.push_front(annotation);
        if self.redo.len() > self.max_depth {
            self.redo.pop_back();
        }
    }

    /// Most recently undone annotation.
    pub fn pop_redo(&mut self) -> Option<Annotation> {
        self.redo.pop_front()
    }

    /// Put a snapshot back after a failed redo.
    pub fn restore(&mut self, annotation: Annotation) {
        self.redo.push_front(annotation);
    }

    /// A new creation invalidates the forward history.
    pub fn clear_redo(&mut self) {
        if !self.redo.is_empty() {
            tracing::debug!(dropped = self.redo.len(), "redo history cleared");
        }
        self.redo.clear();
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }
}
