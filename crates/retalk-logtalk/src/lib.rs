//! Logtalk refactoring support for retalk.
//!
//! This crate provides the text-based structural refactorings:
//! - Lexical scanning and term/entity boundary resolution
//! - Directive classification and layout-preserving list rewriting
//! - Symbol resolution under the cursor and reference location
//! - Refactoring detection and the rewriters behind each action
//! - The [`Engine`](engine::Engine) that plans, applies and reports a run

pub mod action;
pub mod boundary;
pub mod callable;
pub mod detect;
pub mod directives;
pub mod engine;
pub mod error;
mod error_bridges;
pub mod index;
pub mod locator;
pub mod ops;
pub mod scanner;
pub mod symbol;
pub mod syntax;

pub use action::RefactorAction;
pub use engine::{Engine, Outcome};
pub use error::{RefactorError, RefactorResult};
pub use index::TextIndex;
