//! Patch IR: TextEdit, WorkspaceEdit, conflict detection and atomic apply.
//!
//! This module is the Edit Assembler of the engine:
//! - Edits are grouped per file and validated for non-overlap
//! - New files are carried alongside edits so an extraction is one batch
//! - Preconditions pin every touched file to the content hash it was read with
//! - Application is all-or-nothing: any conflict fails the whole batch
//! - Batches materialize to output edits and a unified diff

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::diff::unified_diff;
use crate::text::{position_in_bounds, range_to_offsets};
use crate::types::{Position, Range};

/// Hash type for content verification (SHA-256, stored as hex string for JSON compatibility).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Compute SHA-256 hash of the given bytes, returning hex-encoded string.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentHash(hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Edits
// ============================================================================

/// A single text replacement in one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    /// Range being replaced (empty for insertions).
    pub range: Range,
    /// Replacement text (empty for deletions).
    pub new_text: String,
}

impl TextEdit {
    /// Replace `range` with `text`.
    pub fn replace(range: Range, text: impl Into<String>) -> Self {
        TextEdit {
            range,
            new_text: text.into(),
        }
    }

    /// Insert `text` at `position`.
    pub fn insert(position: Position, text: impl Into<String>) -> Self {
        TextEdit {
            range: Range::point(position),
            new_text: text.into(),
        }
    }

    /// Delete `range`.
    pub fn delete(range: Range) -> Self {
        TextEdit {
            range,
            new_text: String::new(),
        }
    }

    /// Check if this edit is a pure insertion.
    pub fn is_insert(&self) -> bool {
        self.range.is_empty()
    }
}

/// Checks that must pass before any edit can apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Precondition {
    /// File content hash must match the snapshot the edits were computed from.
    FileHashMatches { uri: String, content_hash: ContentHash },
    /// File must not exist yet (new files created by the batch).
    FileAbsent { uri: String },
}

/// A detected overlap or invalidation that prevents apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Conflict {
    /// Two edits have overlapping ranges in the same file.
    OverlappingRanges { uri: String, first: Range, second: Range },
    /// Two insertions at the same position; application order would be undefined.
    AmbiguousInsertOrder { uri: String, position: Position },
    /// A range lies outside the file content.
    RangeOutOfBounds { uri: String, range: Range },
    /// Edits target a file the apply context does not know.
    FileMissing { uri: String },
    /// The file changed since the edits were computed.
    HashMismatch {
        uri: String,
        expected: ContentHash,
        actual: ContentHash,
    },
    /// A file scheduled for creation already exists.
    FileExists { uri: String },
    /// IO failure while writing results.
    IoError { uri: String, message: String },
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::OverlappingRanges { uri, first, second } => {
                write!(f, "overlapping edits in {}: {} and {}", uri, first, second)
            }
            Conflict::AmbiguousInsertOrder { uri, position } => {
                write!(f, "two insertions at {} in {}", position, uri)
            }
            Conflict::RangeOutOfBounds { uri, range } => {
                write!(f, "edit range {} out of bounds in {}", range, uri)
            }
            Conflict::FileMissing { uri } => write!(f, "file not found: {}", uri),
            Conflict::HashMismatch { uri, .. } => {
                write!(f, "{} was modified after it was read", uri)
            }
            Conflict::FileExists { uri } => write!(f, "file already exists: {}", uri),
            Conflict::IoError { uri, message } => write!(f, "{}: {}", uri, message),
        }
    }
}

// ============================================================================
// WorkspaceEdit
// ============================================================================

/// An atomic multi-file batch: edits to existing files plus new files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceEdit {
    /// Edits per existing file, in insertion order.
    pub changes: BTreeMap<String, Vec<TextEdit>>,
    /// New files and their full contents.
    pub creates: BTreeMap<String, String>,
    /// Preconditions that must pass before applying.
    pub preconditions: Vec<Precondition>,
}

impl WorkspaceEdit {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an edit for `uri`.
    pub fn push(&mut self, uri: impl Into<String>, edit: TextEdit) {
        self.changes.entry(uri.into()).or_default().push(edit);
    }

    /// Add several edits for `uri`.
    pub fn extend(&mut self, uri: &str, edits: impl IntoIterator<Item = TextEdit>) {
        self.changes
            .entry(uri.to_string())
            .or_default()
            .extend(edits);
    }

    /// Schedule creation of a new file.
    pub fn create_file(&mut self, uri: impl Into<String>, contents: impl Into<String>) {
        let uri = uri.into();
        self.preconditions
            .push(Precondition::FileAbsent { uri: uri.clone() });
        self.creates.insert(uri, contents.into());
    }

    /// Pin `uri` to the content hash it was read with.
    pub fn require_hash(&mut self, uri: impl Into<String>, content_hash: ContentHash) {
        let uri = uri.into();
        let exists = self.preconditions.iter().any(|p| {
            matches!(p, Precondition::FileHashMatches { uri: u, .. } if *u == uri)
        });
        if !exists {
            self.preconditions
                .push(Precondition::FileHashMatches { uri, content_hash });
        }
    }

    /// Check if this batch changes anything.
    pub fn has_edits(&self) -> bool {
        self.changes.values().any(|e| !e.is_empty()) || !self.creates.is_empty()
    }

    /// Number of edits, counting each created file as one.
    pub fn edit_count(&self) -> usize {
        self.changes.values().map(Vec::len).sum::<usize>() + self.creates.len()
    }

    /// Number of distinct files touched.
    pub fn file_count(&self) -> usize {
        self.changes.values().filter(|e| !e.is_empty()).count() + self.creates.len()
    }

    /// Sort each file's edits by start position (stable).
    pub fn sort_edits(&mut self) {
        for edits in self.changes.values_mut() {
            edits.sort_by(|a, b| a.range.start.cmp(&b.range.start));
        }
    }

    /// Drop edits that replace a range with exactly the same range and text twice.
    pub fn dedup(&mut self) {
        for edits in self.changes.values_mut() {
            let mut seen: Vec<TextEdit> = Vec::with_capacity(edits.len());
            for edit in edits.drain(..) {
                if !seen.contains(&edit) {
                    seen.push(edit);
                }
            }
            *edits = seen;
        }
    }

    /// Detect conflicts within this batch.
    ///
    /// Returns a list of all detected conflicts. An empty list means no conflicts.
    #[must_use]
    pub fn detect_conflicts(&self) -> Vec<Conflict> {
        let mut conflicts = Vec::new();
        for (uri, edits) in &self.changes {
            for i in 0..edits.len() {
                for j in (i + 1)..edits.len() {
                    let a = &edits[i].range;
                    let b = &edits[j].range;
                    if a.overlaps(b) {
                        conflicts.push(Conflict::OverlappingRanges {
                            uri: uri.clone(),
                            first: *a,
                            second: *b,
                        });
                    } else if a.is_empty() && b.is_empty() && a.start == b.start {
                        conflicts.push(Conflict::AmbiguousInsertOrder {
                            uri: uri.clone(),
                            position: a.start,
                        });
                    }
                }
            }
        }
        for uri in self.creates.keys() {
            if self.changes.get(uri).is_some_and(|e| !e.is_empty()) {
                conflicts.push(Conflict::FileExists { uri: uri.clone() });
            }
        }
        conflicts
    }

    /// Check if precondition "no overlaps" would be satisfied.
    pub fn has_no_overlaps(&self) -> bool {
        self.detect_conflicts().is_empty()
    }
}

// ============================================================================
// Atomic Apply
// ============================================================================

/// Result of attempting to apply a WorkspaceEdit.
#[derive(Debug, Clone)]
pub enum ApplyResult {
    /// All edits applied successfully.
    Success {
        /// The new content for each modified or created file.
        modified_files: BTreeMap<String, String>,
    },
    /// Apply failed due to conflicts or precondition failures.
    Failed {
        /// The conflicts/failures that prevented apply.
        conflicts: Vec<Conflict>,
    },
}

/// Apply a list of edits to one file's text.
///
/// Edits are applied in reverse position order so earlier ranges stay valid.
pub fn apply_to_text(uri: &str, text: &str, edits: &[TextEdit]) -> Result<String, Conflict> {
    let mut resolved: Vec<(usize, usize, &TextEdit)> = Vec::with_capacity(edits.len());
    for edit in edits {
        if !position_in_bounds(text, edit.range.start) || !position_in_bounds(text, edit.range.end)
        {
            return Err(Conflict::RangeOutOfBounds {
                uri: uri.to_string(),
                range: edit.range,
            });
        }
        let (start, end) = range_to_offsets(text, &edit.range);
        resolved.push((start, end, edit));
    }
    resolved.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
    let mut out = text.to_string();
    for (start, end, edit) in resolved {
        out.replace_range(start..end, &edit.new_text);
    }
    Ok(out)
}

impl WorkspaceEdit {
    /// Apply this batch atomically against in-memory file contents.
    ///
    /// Either all edits apply successfully, or none do (no partial application).
    #[must_use]
    pub fn apply(&self, file_contents: &HashMap<String, String>) -> ApplyResult {
        let mut conflicts = self.detect_conflicts();

        for precondition in &self.preconditions {
            match precondition {
                Precondition::FileHashMatches { uri, content_hash } => {
                    match file_contents.get(uri) {
                        Some(text) => {
                            let actual = ContentHash::compute(text.as_bytes());
                            if &actual != content_hash {
                                conflicts.push(Conflict::HashMismatch {
                                    uri: uri.clone(),
                                    expected: content_hash.clone(),
                                    actual,
                                });
                            }
                        }
                        None => conflicts.push(Conflict::FileMissing { uri: uri.clone() }),
                    }
                }
                Precondition::FileAbsent { uri } => {
                    if file_contents.contains_key(uri) {
                        conflicts.push(Conflict::FileExists { uri: uri.clone() });
                    }
                }
            }
        }

        let mut modified_files = BTreeMap::new();
        for (uri, edits) in &self.changes {
            if edits.is_empty() {
                continue;
            }
            let Some(text) = file_contents.get(uri) else {
                conflicts.push(Conflict::FileMissing { uri: uri.clone() });
                continue;
            };
            match apply_to_text(uri, text, edits) {
                Ok(new_text) => {
                    modified_files.insert(uri.clone(), new_text);
                }
                Err(conflict) => conflicts.push(conflict),
            }
        }

        if !conflicts.is_empty() {
            return ApplyResult::Failed { conflicts };
        }

        for (uri, contents) in &self.creates {
            modified_files.insert(uri.clone(), contents.clone());
        }
        ApplyResult::Success { modified_files }
    }
}

// ============================================================================
// Patch Materialization
// ============================================================================

/// A single edit as it appears in output (for JSON serialization).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEdit {
    /// File path.
    pub file: String,
    /// Range being replaced.
    pub range: Range,
    /// Original text.
    pub old_text: String,
    /// Replacement text.
    pub new_text: String,
}

/// Materialized patch output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterializedPatch {
    /// Individual edits (ordered by file, then range start).
    pub edits: Vec<OutputEdit>,
    /// Created files.
    pub created_files: Vec<String>,
    /// Standard unified diff format.
    pub unified_diff: String,
}

impl WorkspaceEdit {
    /// Materialize this batch to output format.
    ///
    /// Requires file contents to compute old text and the diff.
    pub fn materialize(&self, file_contents: &HashMap<String, String>) -> MaterializedPatch {
        let mut edits = Vec::new();
        let mut diff = String::new();

        for (uri, file_edits) in &self.changes {
            let Some(text) = file_contents.get(uri) else {
                continue;
            };
            let mut sorted = file_edits.clone();
            sorted.sort_by(|a, b| a.range.start.cmp(&b.range.start));
            for edit in &sorted {
                let (start, end) = range_to_offsets(text, &edit.range);
                edits.push(OutputEdit {
                    file: uri.clone(),
                    range: edit.range,
                    old_text: text[start..end].to_string(),
                    new_text: edit.new_text.clone(),
                });
            }
            if let Ok(new_text) = apply_to_text(uri, text, &sorted) {
                diff.push_str(&unified_diff(uri, text, &new_text));
            }
        }
        for (uri, contents) in &self.creates {
            diff.push_str(&unified_diff(uri, "", contents));
        }

        MaterializedPatch {
            edits,
            created_files: self.creates.keys().cloned().collect(),
            unified_diff: diff,
        }
    }
}

/// Edit summary for responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Files modified or created.
    pub files_changed: u32,
    /// Total edits.
    pub edits_count: u32,
    /// Bytes added.
    pub bytes_added: i64,
    /// Bytes removed.
    pub bytes_removed: i64,
}

impl Summary {
    /// Create from a materialized patch.
    pub fn from_patch(patch: &MaterializedPatch, creates: &BTreeMap<String, String>) -> Self {
        let mut files = std::collections::BTreeSet::new();
        let mut bytes_added: i64 = 0;
        let mut bytes_removed: i64 = 0;

        for edit in &patch.edits {
            files.insert(edit.file.as_str());
            bytes_added += edit.new_text.len() as i64;
            bytes_removed += edit.old_text.len() as i64;
        }
        for (uri, contents) in creates {
            files.insert(uri.as_str());
            bytes_added += contents.len() as i64;
        }

        Summary {
            files_changed: files.len() as u32,
            edits_count: (patch.edits.len() + creates.len()) as u32,
            bytes_added,
            bytes_removed,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
