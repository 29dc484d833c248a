//! Collaborator contracts consumed by the engine.
//!
//! - [`Host`]: opens documents, lists workspace files, applies edit batches
//! - [`SymbolProvider`]: declaration/definition/implementation/reference queries
//! - [`CancellationToken`]: cooperative cancellation checked at checkpoints
//!
//! [`MemoryHost`] keeps files in memory and is used for embedding and tests;
//! the file-system host lives in [`crate::workspace`].

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::debug;

use crate::document::{Document, TextDocument};
use crate::patch::{ApplyResult, Conflict, WorkspaceEdit};
use crate::types::{Location, Position};

// ============================================================================
// Errors
// ============================================================================

/// Errors reported by a host.
#[derive(Debug, Error)]
pub enum HostError {
    /// The document does not exist.
    #[error("file not found: {uri}")]
    NotFound { uri: String },

    /// Reading or writing failed.
    #[error("{uri}: {message}")]
    Io { uri: String, message: String },

    /// The batch was rejected; nothing was written.
    #[error("edit batch rejected: {}", .conflicts.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Rejected { conflicts: Vec<Conflict> },
}

pub type HostResult<T> = Result<T, HostError>;

// ============================================================================
// Host
// ============================================================================

/// Document access and atomic edit application.
pub trait Host {
    /// Open an immutable snapshot of `uri`.
    fn open_document(&self, uri: &str) -> HostResult<TextDocument>;

    /// Whether `uri` exists.
    fn file_exists(&self, uri: &str) -> bool;

    /// Source files of the workspace, in deterministic order.
    fn workspace_files(&self) -> Vec<String>;

    /// Apply a batch all-or-nothing.
    fn apply_edits(&self, edit: &WorkspaceEdit) -> HostResult<()>;
}

/// Directory part of a URI (empty for a bare file name).
pub fn parent_uri(uri: &str) -> &str {
    match uri.rfind('/') {
        Some(i) => &uri[..i],
        None => "",
    }
}

/// Join a directory URI and a relative path.
pub fn join_uri(dir: &str, name: &str) -> String {
    if dir.is_empty() || name.starts_with('/') {
        name.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    }
}

// ============================================================================
// Symbol Provider
// ============================================================================

/// Symbol-level queries. Results are trusted as correct by the engine.
pub trait SymbolProvider {
    /// Scope directive declaring the symbol at `position`.
    fn find_declaration(&self, doc: &dyn Document, position: Position) -> Option<Location>;

    /// First clause defining the symbol at `position`.
    fn find_definition(&self, doc: &dyn Document, position: Position) -> Option<Location>;

    /// Definitions in entities implementing a declaring protocol.
    fn find_implementations(&self, doc: &dyn Document, position: Position) -> Vec<Location>;

    /// All mentions of the symbol.
    fn find_references(&self, doc: &dyn Document, position: Position) -> Vec<Location>;
}

// ============================================================================
// Cancellation
// ============================================================================

/// Cooperative cancellation flag shared between the host and the engine.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Memory Host
// ============================================================================

/// In-memory host.
#[derive(Debug, Default)]
pub struct MemoryHost {
    files: Mutex<BTreeMap<String, String>>,
    reject_applies: AtomicBool,
}

impl MemoryHost {
    /// Create an empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a host holding the given files.
    pub fn with_files<I, K, V>(files: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let host = Self::new();
        for (uri, text) in files {
            host.insert(uri, text);
        }
        host
    }

    /// Add or replace a file.
    pub fn insert(&self, uri: impl Into<String>, text: impl Into<String>) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(uri.into(), text.into());
        }
    }

    /// Current text of a file.
    pub fn text(&self, uri: &str) -> Option<String> {
        self.files.lock().ok()?.get(uri).cloned()
    }

    /// Make every subsequent apply fail, simulating a host-level rejection.
    pub fn reject_applies(&self, reject: bool) {
        self.reject_applies.store(reject, Ordering::SeqCst);
    }
}

impl Host for MemoryHost {
    fn open_document(&self, uri: &str) -> HostResult<TextDocument> {
        self.text(uri)
            .map(|text| TextDocument::new(uri, &text))
            .ok_or_else(|| HostError::NotFound {
                uri: uri.to_string(),
            })
    }

    fn file_exists(&self, uri: &str) -> bool {
        self.files
            .lock()
            .map(|f| f.contains_key(uri))
            .unwrap_or(false)
    }

    fn workspace_files(&self) -> Vec<String> {
        self.files
            .lock()
            .map(|f| f.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn apply_edits(&self, edit: &WorkspaceEdit) -> HostResult<()> {
        let mut files = self.files.lock().map_err(|_| HostError::Io {
            uri: String::new(),
            message: "host state poisoned".to_string(),
        })?;
        if self.reject_applies.load(Ordering::SeqCst) {
            return Err(HostError::Rejected {
                conflicts: Vec::new(),
            });
        }
        let contents: HashMap<String, String> =
            files.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        match edit.apply(&contents) {
            ApplyResult::Success { modified_files } => {
                debug!(files = modified_files.len(), "applied edit batch");
                files.extend(modified_files);
                Ok(())
            }
            ApplyResult::Failed { conflicts } => Err(HostError::Rejected { conflicts }),
        }
    }
}
