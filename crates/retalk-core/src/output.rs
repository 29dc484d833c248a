//! JSON output types and serialization for CLI responses.
//!
//! ## Design Principles
//!
//! 1. **Status first:** Every response has `status` as first field
//! 2. **Deterministic:** Same input -> same output (field order, array ordering)
//! 3. **Nullable vs absent:** absent field means "not applicable"
//! 4. **Versioned:** Schema version in response enables forward compatibility

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::error::{OutputErrorCode, RetalkError};
use crate::patch::{MaterializedPatch, Summary};

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

/// One entry of the contextual action menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeAction {
    /// Menu title.
    pub title: String,
    /// Command id (`logtalk.refactor.<kind>`).
    pub command: String,
    /// Precomputed detector output passed back on execution.
    pub arguments: Vec<serde_json::Value>,
}

/// Response for the `actions` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionsResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Available actions (may be empty).
    pub actions: Vec<CodeAction>,
}

impl ActionsResponse {
    /// Create a new actions response.
    pub fn new(actions: Vec<CodeAction>) -> Self {
        ActionsResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            actions,
        }
    }
}

/// Response for the `run` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefactorResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Command that ran.
    pub command: String,
    /// The generated patch.
    pub patch: MaterializedPatch,
    /// Edit statistics.
    pub summary: Summary,
    /// Warnings and notes raised during the refactoring.
    pub warnings: Vec<String>,
    /// Whether the edits were written.
    pub applied: bool,
}

impl RefactorResponse {
    /// Create a new refactor response.
    pub fn new(
        command: impl Into<String>,
        patch: MaterializedPatch,
        summary: Summary,
        warnings: Vec<String>,
        applied: bool,
    ) -> Self {
        RefactorResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            command: command.into(),
            patch,
            summary,
            warnings,
            applied,
        }
    }
}

/// Error information for error responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code.
    pub code: u8,
    /// Human-readable message.
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    /// Create from a RetalkError.
    pub fn from_error(err: &RetalkError) -> Self {
        let code = OutputErrorCode::from(err).code();
        let details = match err {
            RetalkError::InvalidArguments { details, .. } => details.clone(),
            RetalkError::FileNotFound { path } => Some(serde_json::json!({ "path": path })),
            RetalkError::NotApplicable {
                command,
                file,
                line,
                col,
            } => Some(serde_json::json!({
                "command": command,
                "location": { "file": file, "line": line, "col": col }
            })),
            RetalkError::ApplyError { conflicts, .. } if !conflicts.is_empty() => {
                serde_json::to_value(conflicts).ok()
            }
            _ => None,
        };
        ErrorInfo {
            code,
            message: err.to_string(),
            details,
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Error information.
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Create from a RetalkError.
    pub fn from_error(err: &RetalkError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod response_tests {
        use super::*;

        #[test]
        fn status_is_first_field() {
            let response = ActionsResponse::new(vec![]);
            let json = serde_json::to_string(&response).unwrap();
            assert!(json.starts_with("{\"status\":\"ok\""));
        }

        #[test]
        fn error_response_carries_code_and_details() {
            let err = RetalkError::file_not_found("a.lgt");
            let response = ErrorResponse::from_error(&err);
            assert_eq!(response.status, "error");
            assert_eq!(response.error.code, 3);
            assert_eq!(response.error.details.unwrap()["path"], "a.lgt");
        }

        #[test]
        fn precondition_has_no_details() {
            let err = RetalkError::precondition("no locations found");
            let info = ErrorInfo::from_error(&err);
            assert_eq!(info.code, 5);
            assert_eq!(info.message, "no locations found");
            let json = serde_json::to_string(&info).unwrap();
            assert!(!json.contains("details"));
        }
    }

    mod emit_tests {
        use super::*;

        #[test]
        fn emit_response_produces_valid_json() {
            let response = ActionsResponse::new(vec![CodeAction {
                title: "Add argument".to_string(),
                command: "logtalk.refactor.addArgument".to_string(),
                arguments: vec![serde_json::json!({"kind": "add_argument"})],
            }]);
            let mut output = Vec::new();
            emit_response(&response, &mut output).unwrap();
            let parsed: serde_json::Value =
                serde_json::from_str(&String::from_utf8(output).unwrap()).unwrap();
            assert_eq!(parsed["actions"][0]["command"], "logtalk.refactor.addArgument");
        }

        #[test]
        fn emit_response_is_deterministic() {
            let response = ActionsResponse::new(vec![]);
            let mut a = Vec::new();
            let mut b = Vec::new();
            emit_response(&response, &mut a).unwrap();
            emit_response(&response, &mut b).unwrap();
            assert_eq!(a, b);
        }
    }
}
