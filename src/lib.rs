//! Retalk - structural refactoring engine for Logtalk sources.
//!
//! This crate provides the `retalk` binary front door.
//!
//! ## Modules
//!
//! - `cli` - CLI command implementations
//!
//! The engine itself lives in `retalk-logtalk`; language-agnostic
//! infrastructure lives in `retalk-core`.

pub mod cli;

// Re-export core types for convenience
pub use retalk_core::config::{Config, FormatConfig, WorkspaceConfig};
pub use retalk_core::error::{OutputErrorCode, RetalkError};
pub use retalk_core::output::{ActionsResponse, ErrorInfo, ErrorResponse, RefactorResponse, SCHEMA_VERSION};
pub use retalk_core::workspace::FsHost;

// Re-export the engine
pub use retalk_logtalk;
pub use retalk_logtalk::{Engine, Outcome, RefactorAction, RefactorError, TextIndex};
