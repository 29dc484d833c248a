//! Error types and error code constants for retalk.
//!
//! `RetalkError` is the unified error rendered to JSON output. Engine and
//! workspace errors are bridged into it with `impl From<X> for RetalkError`.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad input from caller)
//! - `3`: Resolution errors (no symbol or refactoring at location, file not found)
//! - `4`: Apply errors (conflicting edits, file changed on disk, write failure)
//! - `5`: Precondition failed (refactoring offered but not applicable)
//! - `10`: Internal errors (bugs, unexpected state)

use std::fmt;

use thiserror::Error;

use crate::host::HostError;
use crate::interaction::InteractionError;
use crate::patch::Conflict;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output.
///
/// These codes map to CLI exit codes and appear in JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad input, malformed request).
    InvalidArguments = 2,
    /// Resolution errors (nothing refactorable at the location, file not found).
    ResolutionError = 3,
    /// Apply errors (conflicts, concurrent modification, IO).
    ApplyError = 4,
    /// A downstream invariant of an offered refactoring failed.
    PreconditionFailed = 5,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
#[derive(Debug, Error)]
pub enum RetalkError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// No refactoring of the requested kind applies at the location.
    #[error("no {command} refactoring at {file}:{line}:{col}")]
    NotApplicable {
        command: String,
        file: String,
        line: u32,
        col: u32,
    },

    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// Refactoring was offered but cannot be completed.
    #[error("{message}")]
    PreconditionFailed { message: String },

    /// The user cancelled a prompt.
    #[error("cancelled")]
    Cancelled,

    /// Failed to apply changes.
    #[error("apply error: {message}")]
    ApplyError {
        message: String,
        conflicts: Vec<Conflict>,
    },

    /// Configuration could not be loaded.
    #[error("config error: {message}")]
    ConfigError { message: String },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&RetalkError> for OutputErrorCode {
    fn from(err: &RetalkError) -> Self {
        match err {
            RetalkError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            RetalkError::NotApplicable { .. } => OutputErrorCode::ResolutionError,
            RetalkError::FileNotFound { .. } => OutputErrorCode::ResolutionError,
            RetalkError::PreconditionFailed { .. } => OutputErrorCode::PreconditionFailed,
            RetalkError::Cancelled => OutputErrorCode::PreconditionFailed,
            RetalkError::ApplyError { .. } => OutputErrorCode::ApplyError,
            RetalkError::ConfigError { .. } => OutputErrorCode::InvalidArguments,
            RetalkError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<RetalkError> for OutputErrorCode {
    fn from(err: RetalkError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl RetalkError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        RetalkError::InvalidArguments {
            message: message.into(),
            details: None,
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        RetalkError::FileNotFound { path: path.into() }
    }

    /// Create a precondition error.
    pub fn precondition(message: impl Into<String>) -> Self {
        RetalkError::PreconditionFailed {
            message: message.into(),
        }
    }

    /// Create an apply error from conflicts.
    pub fn conflicts(conflicts: Vec<Conflict>) -> Self {
        let message = conflicts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        RetalkError::ApplyError { message, conflicts }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        RetalkError::InternalError {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

impl From<std::io::Error> for RetalkError {
    fn from(err: std::io::Error) -> Self {
        RetalkError::InternalError {
            message: format!("IO error: {}", err),
        }
    }
}

// ============================================================================
// Bridge: HostError -> RetalkError
// ============================================================================

impl From<HostError> for RetalkError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::NotFound { uri } => RetalkError::FileNotFound { path: uri },
            HostError::Io { uri, message } => RetalkError::ApplyError {
                message: format!("{}: {}", uri, message),
                conflicts: Vec::new(),
            },
            HostError::Rejected { conflicts } => RetalkError::conflicts(conflicts),
        }
    }
}

// ============================================================================
// Bridge: InteractionError -> RetalkError
// ============================================================================

impl From<InteractionError> for RetalkError {
    fn from(err: InteractionError) -> Self {
        match err {
            InteractionError::Cancelled => RetalkError::Cancelled,
            InteractionError::NonTty => {
                RetalkError::invalid_args("stdin is not a TTY; supply answers with --answer")
            }
            InteractionError::InvalidInput(message) => RetalkError::invalid_args(message),
            InteractionError::Io(message) => RetalkError::internal(message),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
