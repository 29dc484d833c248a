//! Interaction adapter trait for user prompts during a refactoring
//!
//! Refactorings ask for names, positions and permutations. The engine asks
//! through `InteractionAdapter` so the same code runs behind:
//!
//! - **CLI mode**: terminal prompts (in the retalk crate)
//! - **Scripted mode**: answers supplied up front (`--answer`, tests)
//!
//! Any cancellation aborts the whole refactoring before edits are applied.
//! The trait is object-safe, allowing it to be used as `dyn InteractionAdapter`.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

use thiserror::Error;

/// Error type for interaction operations
#[derive(Error, Debug)]
pub enum InteractionError {
    /// User cancelled the prompt (or a script ran out of answers)
    #[error("operation cancelled by user")]
    Cancelled,

    /// Standard input is not a TTY and no answers were supplied
    #[error("stdin is not a TTY - interactive input unavailable")]
    NonTty,

    /// IO error during interaction
    #[error("IO error: {0}")]
    Io(String),

    /// Invalid input provided
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl InteractionError {
    /// Create a new IO error
    pub fn io(err: impl fmt::Display) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<std::io::Error> for InteractionError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for interaction operations
pub type InteractionResult<T> = Result<T, InteractionError>;

/// Validates a text answer; `Some(message)` rejects it.
pub type Validator<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Accept any answer.
pub fn accept_any(_: &str) -> Option<String> {
    None
}

/// Trait for abstracting user interaction across execution modes
pub trait InteractionAdapter: Send + Sync {
    /// Ask the user for text input
    ///
    /// `validate` is applied to the answer (or the default when the answer
    /// is empty). Interactive adapters re-prompt on rejection; scripted ones
    /// fail with `InvalidInput`.
    fn ask_text(
        &self,
        prompt: &str,
        default: Option<&str>,
        validate: Validator<'_>,
    ) -> InteractionResult<String>;

    /// Ask the user to select one option from a list
    ///
    /// Returns the index of the selected option (0-based).
    fn ask_select(&self, prompt: &str, options: &[&str]) -> InteractionResult<usize>;

    /// Ask the user a yes/no confirmation question
    fn ask_confirm(&self, prompt: &str, default: bool) -> InteractionResult<bool>;

    /// Print an informational message
    fn print_info(&self, message: &str);

    /// Print a warning message
    fn print_warning(&self, message: &str);

    /// Print an error message
    fn print_error(&self, message: &str);

    /// Print a success message
    fn print_success(&self, message: &str);
}

// ============================================================================
// Scripted Adapter
// ============================================================================

/// Severity of a message recorded by [`ScriptedAdapter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
    Success,
}

/// Adapter that answers prompts from a pre-supplied script.
///
/// Answers are consumed in order. An exhausted script counts as a
/// cancellation. Printed messages are recorded for inspection.
#[derive(Debug, Default)]
pub struct ScriptedAdapter {
    answers: Mutex<VecDeque<String>>,
    messages: Mutex<Vec<(MessageLevel, String)>>,
}

impl ScriptedAdapter {
    /// Create an adapter with the given answers.
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedAdapter {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Messages printed so far.
    pub fn messages(&self) -> Vec<(MessageLevel, String)> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Number of unused answers.
    pub fn remaining(&self) -> usize {
        self.answers.lock().map(|a| a.len()).unwrap_or(0)
    }

    fn next_answer(&self) -> InteractionResult<String> {
        let mut answers = self
            .answers
            .lock()
            .map_err(|_| InteractionError::Io("answer script poisoned".to_string()))?;
        answers.pop_front().ok_or(InteractionError::Cancelled)
    }

    fn record(&self, level: MessageLevel, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push((level, message.to_string()));
        }
    }
}

impl InteractionAdapter for ScriptedAdapter {
    fn ask_text(
        &self,
        _prompt: &str,
        default: Option<&str>,
        validate: Validator<'_>,
    ) -> InteractionResult<String> {
        let answer = self.next_answer()?;
        let answer = match (answer.trim().is_empty(), default) {
            (true, Some(d)) => d.to_string(),
            _ => answer.trim().to_string(),
        };
        match validate(&answer) {
            Some(message) => Err(InteractionError::InvalidInput(message)),
            None => Ok(answer),
        }
    }

    fn ask_select(&self, _prompt: &str, options: &[&str]) -> InteractionResult<usize> {
        if options.is_empty() {
            return Err(InteractionError::InvalidInput(
                "options cannot be empty".to_string(),
            ));
        }
        let answer = self.next_answer()?;
        let answer = answer.trim();
        if let Some(i) = options.iter().position(|o| *o == answer) {
            return Ok(i);
        }
        // 1-based index
        match answer.parse::<usize>() {
            Ok(n) if n >= 1 && n <= options.len() => Ok(n - 1),
            _ => Err(InteractionError::InvalidInput(format!(
                "'{}' is not one of the {} options",
                answer,
                options.len()
            ))),
        }
    }

    fn ask_confirm(&self, _prompt: &str, default: bool) -> InteractionResult<bool> {
        let answer = self.next_answer()?;
        match answer.trim().to_ascii_lowercase().as_str() {
            "" => Ok(default),
            "y" | "yes" | "true" => Ok(true),
            "n" | "no" | "false" => Ok(false),
            other => Err(InteractionError::InvalidInput(format!(
                "expected yes or no, got '{}'",
                other
            ))),
        }
    }

    fn print_info(&self, message: &str) {
        self.record(MessageLevel::Info, message);
    }

    fn print_warning(&self, message: &str) {
        self.record(MessageLevel::Warning, message);
    }

    fn print_error(&self, message: &str) {
        self.record(MessageLevel::Error, message);
    }

    fn print_success(&self, message: &str) {
        self.record(MessageLevel::Success, message);
    }
}
