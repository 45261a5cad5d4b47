use std::fmt;

use markup_model::AnnotationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tool {
    #[default]
    Select,
    Pan,
    Pencil,
    Line,
    Arrow,
    Rectangle,
    Circle,
    Ellipse,
    Polygon,
    Polyline,
    Text,
    Eraser,
    MeasureDistance,
    MeasureAngle,
    Move,
    Copy,
    Scale,
    Mirror,
    Array,
}

impl Tool {
    pub const ALL: [Tool; 19] = [
        Tool::Select,
        Tool::Pan,
        Tool::Pencil,
        Tool::Line,
        Tool::Arrow,
        Tool::Rectangle,
        Tool::Circle,
        Tool::Ellipse,
        Tool::Polygon,
        Tool::Polyline,
        Tool::Text,
        Tool::Eraser,
        Tool::MeasureDistance,
        Tool::MeasureAngle,
        Tool::Move,
        Tool::Copy,
        Tool::Scale,
        Tool::Mirror,
        Tool::Array,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Tool::Select => "Select",
            Tool::Pan => "Pan",
            Tool::Pencil => "Pencil",
            Tool::Line => "Line",
            Tool::Arrow => "Arrow",
            Tool::Rectangle => "Rectangle",
            Tool::Circle => "Circle",
            Tool::Ellipse => "Ellipse",
            Tool::Polygon => "Polygon",
            Tool::Polyline => "Polyline",
            Tool::Text => "Text",
            Tool::Eraser => "Eraser",
            Tool::MeasureDistance => "Measure Distance",
            Tool::MeasureAngle => "Measure Angle",
            Tool::Move => "Move",
            Tool::Copy => "Copy",
            Tool::Scale => "Scale",
            Tool::Mirror => "Mirror",
            Tool::Array => "Array",
        }
    }

    pub fn hotkey(&self) -> Option<char> {
        match self {
            Tool::Select => Some('S'),
            Tool::Pan => Some('H'),
            Tool::Pencil => Some('P'),
            Tool::Line => Some('L'),
            Tool::Arrow => Some('A'),
            Tool::Rectangle => Some('R'),
            Tool::Circle => Some('C'),
            Tool::Text => Some('T'),
            Tool::Eraser => Some('E'),
            Tool::MeasureDistance => Some('M'),
            Tool::MeasureAngle => Some('G'),
            _ => None,
        }
    }

    /// Tool bound to a hotkey, case-insensitive.
    pub fn from_hotkey(key: char) -> Option<Tool> {
        let key = key.to_ascii_uppercase();
        Tool::ALL.into_iter().find(|tool| tool.hotkey() == Some(key))
    }

    /// Kind created by press-drag-release with this tool.
    pub fn drag_kind(&self) -> Option<AnnotationKind> {
        match self {
            Tool::Line => Some(AnnotationKind::Line),
            Tool::Arrow => Some(AnnotationKind::Arrow),
            Tool::Rectangle => Some(AnnotationKind::Rectangle),
            Tool::Circle => Some(AnnotationKind::Circle),
            Tool::Ellipse => Some(AnnotationKind::Ellipse),
            Tool::MeasureDistance => Some(AnnotationKind::MeasureDistance),
            _ => None,
        }
    }

    /// Polygon and polyline are built one click at a time.
    pub fn builds_path(&self) -> bool {
        matches!(self, Tool::Polygon | Tool::Polyline)
    }

    /// Whether the tool creates, changes or removes annotations.
    pub fn edits(&self) -> bool {
        !matches!(self, Tool::Select | Tool::Pan)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Keyboard input the editor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Delete,
    Backspace,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers { ctrl: false, shift: false };
    pub const CTRL: Modifiers = Modifiers { ctrl: true, shift: false };
    pub const CTRL_SHIFT: Modifiers = Modifiers { ctrl: true, shift: true };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hotkeys_are_case_insensitive() {
        assert_eq!(Tool::from_hotkey('r'), Some(Tool::Rectangle));
        assert_eq!(Tool::from_hotkey('G'), Some(Tool::MeasureAngle));
        assert_eq!(Tool::from_hotkey('x'), None);
    }

    #[test]
    fn every_hotkey_is_unique() {
        let keys: Vec<char> = Tool::ALL.iter().filter_map(Tool::hotkey).collect();
        assert_eq!(keys.len(), 11);
        for key in &keys {
            assert_eq!(keys.iter().filter(|k| *k == key).count(), 1);
        }
    }
}
