//! Interactive annotation editing
//!
//! The tool state machine that turns pointer and keyboard input into
//! annotation changes, with undo/redo, save status and configuration.

pub mod config;
pub mod editor;
pub mod prompt;
pub mod status;
pub mod tool;
pub mod undo;

pub use config::{ConfigError, EditorConfig};
pub use editor::{ArrayOutcome, Editor, InteractionState};
pub use prompt::{ArrayParams, NoPrompt, Prompter, ScriptedPrompter};
pub use status::{Notice, NoticeLevel, SaveStatus};
pub use tool::{Key, Modifiers, Tool};
pub use undo::UndoLog;
