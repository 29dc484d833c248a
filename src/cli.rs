//! CLI front door.
//!
//! Provides the command-line helpers behind the `retalk` binary:
//! - `actions` - list the refactorings available at a location (JSON)
//! - `run` - execute one refactoring and report the patch
//!
//! ## Locations
//!
//! The command line uses 1-based `path:line:col` locations with columns
//! counted in characters. They are converted to the engine's 0-based
//! UTF-16 positions here, so nothing below this module sees 1-based values.
//!
//! ## Prompts
//!
//! Refactorings that need names or positions ask through an
//! [`InteractionAdapter`]. Answers given with `--answer` are consumed in
//! order; with none given, the terminal is asked instead.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use retalk_core::config::Config;
use retalk_core::document::{Document, TextDocument};
use retalk_core::error::RetalkError;
use retalk_core::host::Host;
use retalk_core::interaction::{
    InteractionAdapter, InteractionError, InteractionResult, ScriptedAdapter, Validator,
};
use retalk_core::output::{emit_response, ActionsResponse, RefactorResponse};
use retalk_core::patch::{MaterializedPatch, Summary, WorkspaceEdit};
use retalk_core::text::char_col_to_utf16;
use retalk_core::types::{CliLocation, Position, Range};
use retalk_core::workspace::FsHost;
use retalk_logtalk::syntax::EntityKind;
use retalk_logtalk::{Engine, RefactorAction, RefactorError, TextIndex};
use tracing::{debug, info};

// ============================================================================
// Workspace
// ============================================================================

/// An opened workspace: root, configuration and file-system host.
pub struct Workspace {
    root: PathBuf,
    config: Config,
    host: FsHost,
}

impl Workspace {
    /// Open `root`, loading `retalk.toml` when present.
    pub fn open(root: &Path) -> Result<Self, RetalkError> {
        let root = root.canonicalize().map_err(|e| {
            RetalkError::invalid_args(format!("workspace {}: {}", root.display(), e))
        })?;
        let config = Config::load_from_workspace(&root)?;
        let host = FsHost::new(&root, &config.workspace)?;
        debug!(root = %root.display(), files = host.workspace_files().len(), "opened workspace");
        Ok(Workspace { root, config, host })
    }

    /// Canonical workspace root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a CLI location (and optional selection end) to a URI and range.
    fn resolve(&self, at: &str, to: Option<&str>) -> Result<Target, RetalkError> {
        let location = CliLocation::parse(at).ok_or_else(|| {
            RetalkError::invalid_args(format!(
                "invalid location format '{}', expected path:line:col",
                at
            ))
        })?;
        let path = Path::new(&location.file);
        let path = if path.is_absolute() {
            path.canonicalize()
                .map_err(|_| RetalkError::file_not_found(&location.file))?
        } else {
            path.to_path_buf()
        };
        let uri = self.host.uri_of(&path).ok_or_else(|| {
            RetalkError::invalid_args(format!("{} is outside the workspace", location.file))
        })?;
        let doc = self.host.open_document(&uri)?;
        let start = to_position(&doc, location.line, location.col)?;
        let end = match to {
            Some(end) => {
                let (line, col) = CliLocation::parse_line_col(end).ok_or_else(|| {
                    RetalkError::invalid_args(format!(
                        "invalid selection end '{}', expected line:col",
                        end
                    ))
                })?;
                to_position(&doc, line, col)?
            }
            None => start,
        };
        Ok(Target {
            uri,
            range: Range::new(start, end),
            location,
        })
    }
}

/// A resolved command-line location.
struct Target {
    uri: String,
    range: Range,
    location: CliLocation,
}

/// Convert a 1-based line and character column to a 0-based position.
fn to_position(doc: &dyn Document, line: u32, col: u32) -> Result<Position, RetalkError> {
    let out_of_range = || {
        RetalkError::invalid_args(format!(
            "{}:{}:{} is outside the file",
            doc.uri(),
            line,
            col
        ))
    };
    if line == 0 || col == 0 {
        return Err(out_of_range());
    }
    let index = (line - 1) as usize;
    if index > doc.line_count() {
        return Err(out_of_range());
    }
    let character = if index < doc.line_count() {
        char_col_to_utf16(doc.line(index), col - 1)
    } else {
        0
    };
    Ok(Position::new(line - 1, character))
}

// ============================================================================
// Terminal Prompts
// ============================================================================

/// Adapter that prompts on stderr and reads answers from stdin.
#[derive(Debug, Default)]
pub struct TerminalAdapter;

impl TerminalAdapter {
    fn read_answer(&self, prompt: &str) -> InteractionResult<String> {
        if !io::stdin().is_terminal() {
            return Err(InteractionError::NonTty);
        }
        let mut stderr = io::stderr();
        write!(stderr, "{}: ", prompt)?;
        stderr.flush()?;
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            // end of input
            return Err(InteractionError::Cancelled);
        }
        Ok(line.trim().to_string())
    }
}

impl InteractionAdapter for TerminalAdapter {
    fn ask_text(
        &self,
        prompt: &str,
        default: Option<&str>,
        validate: Validator<'_>,
    ) -> InteractionResult<String> {
        let shown = match default {
            Some(d) => format!("{} [{}]", prompt, d),
            None => prompt.to_string(),
        };
        loop {
            let answer = self.read_answer(&shown)?;
            let answer = match (answer.is_empty(), default) {
                (true, Some(d)) => d.to_string(),
                _ => answer,
            };
            match validate(&answer) {
                Some(message) => self.print_error(&message),
                None => return Ok(answer),
            }
        }
    }

    fn ask_select(&self, prompt: &str, options: &[&str]) -> InteractionResult<usize> {
        if options.is_empty() {
            return Err(InteractionError::InvalidInput(
                "options cannot be empty".to_string(),
            ));
        }
        let mut stderr = io::stderr();
        for (i, option) in options.iter().enumerate() {
            writeln!(stderr, "  {}) {}", i + 1, option)?;
        }
        loop {
            let answer = self.read_answer(prompt)?;
            if let Some(i) = options.iter().position(|o| *o == answer) {
                return Ok(i);
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Ok(n - 1),
                _ => self.print_error(&format!("enter a number between 1 and {}", options.len())),
            }
        }
    }

    fn ask_confirm(&self, prompt: &str, default: bool) -> InteractionResult<bool> {
        let hint = if default { "Y/n" } else { "y/N" };
        loop {
            let answer = self.read_answer(&format!("{} [{}]", prompt, hint))?;
            match answer.to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.print_error("answer yes or no"),
            }
        }
    }

    fn print_info(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn print_warning(&self, message: &str) {
        eprintln!("warning: {}", message);
    }

    fn print_error(&self, message: &str) {
        eprintln!("error: {}", message);
    }

    fn print_success(&self, message: &str) {
        eprintln!("done: {}", message);
    }
}

/// Scripted answers when any were given, the terminal otherwise.
fn adapter_for(answers: &[String]) -> Box<dyn InteractionAdapter> {
    if answers.is_empty() {
        Box::new(TerminalAdapter)
    } else {
        Box::new(ScriptedAdapter::new(answers.iter().cloned()))
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Output format of `run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable summary.
    Text,
    /// `RefactorResponse` JSON.
    Json,
    /// Unified diff of the batch.
    Diff,
}

/// Parameters of one `run` invocation.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Command id or bare kind (`addArgument`, `logtalk.refactor.addArgument`).
    pub command: String,
    /// `path:line:col`, 1-based.
    pub at: String,
    /// Selection end `line:col`, 1-based.
    pub to: Option<String>,
    /// Target kind for `convertEntity`.
    pub kind: Option<String>,
    /// Prompt answers, in order.
    pub answers: Vec<String>,
    /// Compute the patch without writing it.
    pub dry_run: bool,
    /// Output format; defaults to a diff for dry runs and JSON otherwise.
    pub format: Option<OutputFormat>,
}

/// List the refactorings available at `at` (and up to `to`) as JSON.
pub fn run_actions(workspace: &Workspace, at: &str, to: Option<&str>) -> Result<String, RetalkError> {
    let target = workspace.resolve(at, to)?;
    let index = TextIndex::new(&workspace.host);
    let ui = ScriptedAdapter::new(Vec::<String>::new());
    let engine = Engine::new(&workspace.host, &index, &ui);
    let actions = engine.detect(&target.uri, target.range)?;
    info!(uri = %target.uri, count = actions.len(), "listed actions");
    to_json(&ActionsResponse::new(actions))
}

/// Run one refactoring and render the result in the requested format.
pub fn run_command(workspace: &Workspace, request: &RunRequest) -> Result<String, RetalkError> {
    let target = workspace.resolve(&request.at, request.to.as_deref())?;
    let kind = request.kind.as_deref().map(parse_kind).transpose()?;
    let index = TextIndex::new(&workspace.host);
    let ui = adapter_for(&request.answers);
    let engine = Engine::new(&workspace.host, &index, ui.as_ref())
        .with_format(workspace.config.format.clone());

    let not_applicable = || RetalkError::NotApplicable {
        command: request.command.clone(),
        file: target.location.file.clone(),
        line: target.location.line,
        col: target.location.col,
    };
    let action = engine
        .detect_actions(&target.uri, target.range)?
        .into_iter()
        .filter(|a| a.matches_command(&request.command))
        .find(|a| match (a, kind) {
            (RefactorAction::ConvertEntity(t), Some(kind)) => t.to == kind,
            _ => true,
        })
        .ok_or_else(not_applicable)?;
    if matches!(action, RefactorAction::ConvertEntity(_)) && kind.is_none() {
        return Err(RetalkError::invalid_args(
            "convertEntity needs --kind object|protocol|category",
        ));
    }

    let outcome = engine.plan(&action).map_err(|err| match err {
        RefactorError::NotApplicable(_) => not_applicable(),
        other => RetalkError::from(other),
    })?;
    let patch = materialize(&workspace.host, &outcome.edit)?;
    let summary = Summary::from_patch(&patch, &outcome.edit.creates);
    let applied = !request.dry_run && outcome.edit.has_edits();
    if applied {
        workspace.host.apply_edits(&outcome.edit)?;
        ui.print_success(&action.title());
    }
    info!(command = %action.command(), applied, files = summary.files_changed, "run finished");

    let format = request.format.unwrap_or(if request.dry_run {
        OutputFormat::Diff
    } else {
        OutputFormat::Json
    });
    match format {
        OutputFormat::Diff => Ok(patch.unified_diff),
        OutputFormat::Json => to_json(&RefactorResponse::new(
            action.command(),
            patch,
            summary,
            outcome.warnings,
            applied,
        )),
        OutputFormat::Text => Ok(text_report(&action, &summary, &outcome.warnings, applied)),
    }
}

fn parse_kind(name: &str) -> Result<EntityKind, RetalkError> {
    EntityKind::ALL
        .into_iter()
        .find(|k| k.keyword() == name)
        .ok_or_else(|| RetalkError::invalid_args(format!("unknown entity kind '{}'", name)))
}

/// Materialize `edit` against the current contents of the files it touches.
fn materialize(host: &FsHost, edit: &WorkspaceEdit) -> Result<MaterializedPatch, RetalkError> {
    let mut contents = HashMap::new();
    for uri in edit.changes.keys() {
        let doc: TextDocument = host.open_document(uri)?;
        contents.insert(uri.clone(), doc.full_text());
    }
    Ok(edit.materialize(&contents))
}

fn text_report(action: &RefactorAction, summary: &Summary, warnings: &[String], applied: bool) -> String {
    let mut out = String::new();
    if summary.edits_count == 0 {
        let _ = writeln!(out, "{}: nothing to change", action.title());
    } else {
        let verb = if applied { "applied" } else { "would apply" };
        let _ = writeln!(
            out,
            "{} {}: {} edits in {} files",
            verb,
            action.title(),
            summary.edits_count,
            summary.files_changed
        );
    }
    for warning in warnings {
        let _ = writeln!(out, "warning: {}", warning);
    }
    out
}

fn to_json<T: serde::Serialize>(response: &T) -> Result<String, RetalkError> {
    let mut buf = Vec::new();
    emit_response(response, &mut buf).map_err(|e| RetalkError::internal(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| RetalkError::internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    mod position_tests {
        use super::*;

        #[test]
        fn one_based_columns_become_utf16() {
            let doc = TextDocument::new("a.lgt", "h\u{e9}llo(\u{1d11e}, X).\n");
            assert_eq!(to_position(&doc, 1, 1).unwrap(), Position::new(0, 0));
            // the clef takes two UTF-16 units
            assert_eq!(to_position(&doc, 1, 9).unwrap(), Position::new(0, 9));
        }

        #[test]
        fn zero_and_far_lines_are_rejected() {
            let doc = TextDocument::new("a.lgt", "foo.\n");
            assert!(to_position(&doc, 0, 1).is_err());
            assert!(to_position(&doc, 1, 0).is_err());
            assert!(to_position(&doc, 5, 1).is_err());
            assert_eq!(to_position(&doc, 2, 1).unwrap(), Position::new(1, 0));
        }
    }

    mod kind_tests {
        use super::*;

        #[test]
        fn entity_kinds_parse_by_keyword() {
            assert_eq!(parse_kind("category").unwrap(), EntityKind::Category);
            assert!(parse_kind("module").is_err());
        }
    }
}
