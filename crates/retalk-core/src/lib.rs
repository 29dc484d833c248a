//! Core infrastructure for retalk.
//!
//! This crate provides language-agnostic infrastructure:
//! - Positions, ranges and locations in the editor coordinate model
//! - Text utilities (UTF-16 columns, line handling, indentation)
//! - Read-only document snapshots
//! - Patch IR for multi-file edit batches, conflict detection and diffs
//! - Host, symbol provider and interaction contracts
//! - Workspace discovery and the file-system host
//! - Configuration, error types and JSON output types

pub mod config;
pub mod diff;
pub mod document;
pub mod error;
pub mod host;
pub mod interaction;
pub mod output;
pub mod patch;
pub mod text;
pub mod types;
pub mod workspace;
