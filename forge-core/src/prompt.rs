//! Prompt collaborator: question descriptors in, answers out.
//!
//! The interactive terminal implementation lives in `forge-runner`;
//! [`ScriptedPrompter`] answers from a prepared queue and is used for
//! non-interactive runs and tests.

use std::collections::VecDeque;

use crate::error::PromptError;
use crate::value::{Value, Variables};

/// One entry of a select menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub title: String,
    pub value: String,
}

impl Choice {
    pub fn new(title: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
        }
    }
}

/// A question descriptor. The answer is stored under `name`.
#[derive(Debug, Clone, PartialEq)]
pub enum Question {
    /// Pick one of `choices`; the answer is the choice's `value`.
    Select {
        name: String,
        message: String,
        choices: Vec<Choice>,
        initial: usize,
    },
    /// Free text.
    Input {
        name: String,
        message: String,
        default: Option<String>,
    },
    /// Yes / no.
    Confirm {
        name: String,
        message: String,
        default: bool,
    },
}

impl Question {
    pub fn name(&self) -> &str {
        match self {
            Question::Select { name, .. }
            | Question::Input { name, .. }
            | Question::Confirm { name, .. } => name,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Question::Select { message, .. }
            | Question::Input { message, .. }
            | Question::Confirm { message, .. } => message,
        }
    }
}

/// Collects answers for a list of questions.
///
/// Implementations fill `answers` in place, keyed by [`Question::name`];
/// existing entries for other names are left untouched.
pub trait Prompter {
    fn ask(&mut self, questions: &[Question], answers: &mut Variables) -> Result<(), PromptError>;
}

/// Answers questions from a queue, falling back to a fixed answer once the
/// queue is empty.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<Value>,
    fallback: Option<Value>,
    asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, V>(answers: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            fallback: None,
            asked: Vec::new(),
        }
    }

    /// Answer every question with `value` once the queue runs dry.
    pub fn with_fallback(mut self, value: impl Into<Value>) -> Self {
        self.fallback = Some(value.into());
        self
    }

    /// Messages of every question asked so far, in order.
    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, questions: &[Question], answers: &mut Variables) -> Result<(), PromptError> {
        for question in questions {
            self.asked.push(question.message().to_string());

            let answer = self
                .answers
                .pop_front()
                .or_else(|| self.fallback.clone())
                .ok_or_else(|| PromptError::Exhausted {
                    name: question.name().to_string(),
                })?;

            if let Question::Select { name, choices, .. } = question {
                let text = answer.to_string();
                if !choices.iter().any(|c| c.value == text) {
                    return Err(PromptError::InvalidChoice {
                        name: name.clone(),
                        answer: text,
                    });
                }
            }

            answers.insert(question.name().to_string(), answer);
        }
        Ok(())
    }
}
