//! Workspace file discovery and the file-system host.
//!
//! - Deterministic file ordering (sorted by workspace-relative path)
//! - Extension filter, default directory exclusions, configurable globs
//! - Atomic multi-file apply: every write is staged to a temp file next to
//!   its target, content hashes are re-checked, then all files are persisted;
//!   a failure part-way restores the files already written

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::WorkspaceConfig;
use crate::document::TextDocument;
use crate::error::RetalkError;
use crate::host::{Host, HostError, HostResult};
use crate::patch::{ApplyResult, Conflict, ContentHash, Precondition, WorkspaceEdit};

// ============================================================================
// Discovery
// ============================================================================

/// Default directories to exclude from discovery.
const DEFAULT_EXCLUDE_DIRS: &[&str] = &[".git", ".hg", ".svn", "node_modules", "target", "_build"];

/// Check if a path component should be excluded based on default patterns.
fn should_exclude(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| DEFAULT_EXCLUDE_DIRS.contains(&name))
}

/// Compile exclude globs.
pub fn build_exclude_set(patterns: &[String]) -> Result<GlobSet, RetalkError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| RetalkError::ConfigError {
            message: format!("invalid exclude pattern '{}': {}", pattern, e),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| RetalkError::ConfigError {
        message: format!("invalid exclude patterns: {}", e),
    })
}

/// Source files under a workspace root.
#[derive(Debug, Clone)]
pub struct WorkspaceFiles {
    root: PathBuf,
    files: Vec<String>,
}

impl WorkspaceFiles {
    /// Walk `root` and collect source files matching `config`.
    pub fn discover(root: &Path, config: &WorkspaceConfig) -> Result<Self, RetalkError> {
        let exclude = build_exclude_set(&config.exclude)?;
        let mut files = Vec::new();

        for entry in WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !should_exclude(e.path()))
        {
            let entry = entry.map_err(|e| RetalkError::internal(format!("walk error: {}", e)))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let full_path = entry.path();
            let matches_ext = full_path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| config.extensions.iter().any(|x| x == e));
            if !matches_ext {
                continue;
            }
            let Ok(relative) = full_path.strip_prefix(root) else {
                continue;
            };
            // Convert to forward slashes for consistency
            let relative_str = relative
                .to_string_lossy()
                .replace(std::path::MAIN_SEPARATOR, "/");
            if exclude.is_match(&relative_str) {
                continue;
            }
            if let Some(max_size) = config.max_file_size {
                if entry.metadata().map(|m| m.len() > max_size).unwrap_or(false) {
                    debug!(file = %relative_str, "skipping large file");
                    continue;
                }
            }
            files.push(relative_str);
        }

        files.sort();
        Ok(WorkspaceFiles {
            root: root.to_path_buf(),
            files,
        })
    }

    /// Workspace root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative paths, sorted.
    pub fn files(&self) -> &[String] {
        &self.files
    }
}

// ============================================================================
// File-system Host
// ============================================================================

/// Host backed by the file system. URIs are paths relative to the root.
#[derive(Debug)]
pub struct FsHost {
    root: PathBuf,
    files: Vec<String>,
}

impl FsHost {
    /// Create a host rooted at `root`, discovering files with `config`.
    pub fn new(root: &Path, config: &WorkspaceConfig) -> Result<Self, RetalkError> {
        let discovered = WorkspaceFiles::discover(root, config)?;
        Ok(FsHost {
            root: root.to_path_buf(),
            files: discovered.files,
        })
    }

    /// Absolute path of a URI.
    pub fn path_of(&self, uri: &str) -> PathBuf {
        self.root.join(uri)
    }

    /// Workspace-relative URI of a path, if it lies under the root.
    pub fn uri_of(&self, path: &Path) -> Option<String> {
        let relative = if path.is_absolute() {
            path.strip_prefix(&self.root).ok()?
        } else {
            path
        };
        Some(
            relative
                .to_string_lossy()
                .replace(std::path::MAIN_SEPARATOR, "/")
                .trim_start_matches("./")
                .to_string(),
        )
    }

    fn read(&self, uri: &str) -> HostResult<Option<String>> {
        match fs::read_to_string(self.path_of(uri)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(uri, e)),
        }
    }

    fn stage(&self, uri: &str, contents: &str) -> HostResult<NamedTempFile> {
        let path = self.path_of(uri);
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        fs::create_dir_all(&dir).map_err(|e| io_error(uri, e))?;
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| io_error(uri, e))?;
        tmp.write_all(contents.as_bytes())
            .map_err(|e| io_error(uri, e))?;
        tmp.flush().map_err(|e| io_error(uri, e))?;
        Ok(tmp)
    }

    fn rollback(&self, written: &[(String, Option<String>)]) {
        for (uri, original) in written.iter().rev() {
            let path = self.path_of(uri);
            let result = match original {
                Some(text) => fs::write(&path, text),
                None => fs::remove_file(&path),
            };
            if let Err(e) = result {
                warn!(file = %uri, error = %e, "rollback failed");
            }
        }
    }
}

fn io_error(uri: &str, e: io::Error) -> HostError {
    HostError::Io {
        uri: uri.to_string(),
        message: e.to_string(),
    }
}

impl Host for FsHost {
    fn open_document(&self, uri: &str) -> HostResult<TextDocument> {
        match self.read(uri)? {
            Some(text) => Ok(TextDocument::new(uri, &text)),
            None => Err(HostError::NotFound {
                uri: uri.to_string(),
            }),
        }
    }

    fn file_exists(&self, uri: &str) -> bool {
        self.path_of(uri).is_file()
    }

    fn workspace_files(&self) -> Vec<String> {
        self.files.clone()
    }

    fn apply_edits(&self, edit: &WorkspaceEdit) -> HostResult<()> {
        // Current contents of every file the batch mentions
        let mut contents: HashMap<String, String> = HashMap::new();
        let mentioned = edit
            .changes
            .keys()
            .chain(edit.creates.keys())
            .chain(edit.preconditions.iter().map(|p| match p {
                Precondition::FileHashMatches { uri, .. } | Precondition::FileAbsent { uri } => uri,
            }));
        for uri in mentioned {
            if contents.contains_key(uri) {
                continue;
            }
            if let Some(text) = self.read(uri)? {
                contents.insert(uri.clone(), text);
            }
        }

        let modified = match edit.apply(&contents) {
            ApplyResult::Success { modified_files } => modified_files,
            ApplyResult::Failed { conflicts } => return Err(HostError::Rejected { conflicts }),
        };

        let mut staged = Vec::with_capacity(modified.len());
        for (uri, text) in &modified {
            staged.push((uri.clone(), self.stage(uri, text)?));
        }

        // Files must not have changed while staging
        for (uri, _) in &staged {
            let now = self.read(uri)?;
            let before = contents.get(uri);
            if now.as_ref() != before {
                let hash = |t: Option<&String>| {
                    ContentHash::compute(t.map(String::as_bytes).unwrap_or_default())
                };
                return Err(HostError::Rejected {
                    conflicts: vec![Conflict::HashMismatch {
                        uri: uri.clone(),
                        expected: hash(before),
                        actual: hash(now.as_ref()),
                    }],
                });
            }
        }

        let mut written: Vec<(String, Option<String>)> = Vec::new();
        for (uri, tmp) in staged {
            let original = contents.get(&uri).cloned();
            if let Err(e) = tmp.persist(self.path_of(&uri)) {
                self.rollback(&written);
                return Err(io_error(&uri, e.error));
            }
            written.push((uri, original));
        }
        debug!(files = written.len(), "persisted edit batch");
        Ok(())
    }
}
