//! Blocking modal prompt primitives.

use std::collections::VecDeque;

/// Backend answering `confirm` and showing `alert` messages.
pub trait Prompts {
    fn confirm(&mut self, message: &str) -> bool;
    fn alert(&mut self, message: &str);
}

/// Answers confirms from a queue, falling back to a fixed default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptedPrompts {
    answers: VecDeque<bool>,
    default_answer: bool,
}

impl ScriptedPrompts {
    pub fn new(default_answer: bool) -> Self {
        Self {
            answers: VecDeque::new(),
            default_answer,
        }
    }

    pub fn with_answers(default_answer: bool, answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            default_answer,
        }
    }

    pub fn push_answer(&mut self, answer: bool) {
        self.answers.push_back(answer);
    }
}

impl Prompts for ScriptedPrompts {
    fn confirm(&mut self, _message: &str) -> bool {
        self.answers.pop_front().unwrap_or(self.default_answer)
    }

    fn alert(&mut self, _message: &str) {}
}

/// A dialog the page raised, in the order raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialog {
    Alert { message: String },
    Confirm { message: String, accepted: bool },
}

impl Dialog {
    pub fn message(&self) -> &str {
        match self {
            Self::Alert { message } | Self::Confirm { message, .. } => message,
        }
    }
}
