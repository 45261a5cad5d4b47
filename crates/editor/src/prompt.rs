//! Synchronous user prompts.

use std::collections::VecDeque;

/// Parameters of an array operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrayParams {
    /// Total instances including the original; at least 2.
    pub count: u32,
    pub dx: f64,
    pub dy: f64,
}

impl Default for ArrayParams {
    fn default() -> Self {
        Self { count: 3, dx: 40.0, dy: 0.0 }
    }
}

/// Asks the user for input while a gesture is being handled.
///
/// `None` means the prompt was cancelled.
pub trait Prompter {
    fn text(&mut self, message: &str, initial: &str) -> Option<String>;
    fn array_params(&mut self, defaults: ArrayParams) -> Option<ArrayParams>;
}

/// Cancels every prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

impl Prompter for NoPrompt {
    fn text(&mut self, _message: &str, _initial: &str) -> Option<String> {
        None
    }

    fn array_params(&mut self, _defaults: ArrayParams) -> Option<ArrayParams> {
        None
    }
}

/// Answers prompts from a prepared queue, for headless use.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompter {
    texts: VecDeque<Option<String>>,
    arrays: VecDeque<Option<ArrayParams>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer_text(mut self, answer: impl Into<String>) -> Self {
        self.texts.push_back(Some(answer.into()));
        self
    }

    pub fn cancel_text(mut self) -> Self {
        self.texts.push_back(None);
        self
    }

    pub fn answer_array(mut self, params: ArrayParams) -> Self {
        self.arrays.push_back(Some(params));
        self
    }
}

impl Prompter for ScriptedPrompter {
    fn text(&mut self, _message: &str, _initial: &str) -> Option<String> {
        self.texts.pop_front().flatten()
    }

    fn array_params(&mut self, _defaults: ArrayParams) -> Option<ArrayParams> {
        self.arrays.pop_front().flatten()
    }
}
