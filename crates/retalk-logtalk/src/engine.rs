//! Engine entry points and the per-run edit builder.
//!
//! [`Engine::detect`] populates the action menu; [`Engine::plan`] runs one
//! refactoring against document snapshots and returns the assembled batch;
//! [`Engine::execute`] additionally hands the batch to the host. Nothing
//! touches the host's files before the whole batch has been assembled and
//! checked for conflicts.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use retalk_core::config::FormatConfig;
use retalk_core::document::{Document, TextDocument};
use retalk_core::host::{CancellationToken, Host, SymbolProvider};
use retalk_core::interaction::InteractionAdapter;
use retalk_core::output::CodeAction;
use retalk_core::patch::{TextEdit, WorkspaceEdit};
use retalk_core::types::{Position, Range};
use tracing::{debug, info, warn};

use crate::action::RefactorAction;
use crate::boundary::TermRange;
use crate::callable::{self, ArgChange};
use crate::detect;
use crate::error::{RefactorError, RefactorResult};
use crate::ops;
use crate::syntax;

/// Result of planning a refactoring.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    /// The assembled batch; empty when the refactoring is a no-op.
    pub edit: WorkspaceEdit,
    /// Non-fatal notes raised while planning.
    pub warnings: Vec<String>,
}

/// Refactoring engine bound to its collaborators.
pub struct Engine<'a> {
    host: &'a dyn Host,
    symbols: &'a dyn SymbolProvider,
    ui: &'a dyn InteractionAdapter,
    format: FormatConfig,
    cancel: CancellationToken,
}

impl<'a> Engine<'a> {
    pub fn new(host: &'a dyn Host, symbols: &'a dyn SymbolProvider, ui: &'a dyn InteractionAdapter) -> Self {
        Engine {
            host,
            symbols,
            ui,
            format: FormatConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Use `format` for synthesized code.
    pub fn with_format(mut self, format: FormatConfig) -> Self {
        self.format = format;
        self
    }

    /// Share a cancellation token with the caller.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Refactorings available at `range` of `uri`.
    pub fn detect_actions(&self, uri: &str, range: Range) -> RefactorResult<Vec<RefactorAction>> {
        let doc = self.host.open_document(uri)?;
        let actions = detect::detect(&doc, range);
        debug!(uri, %range, count = actions.len(), "detected actions");
        Ok(actions)
    }

    /// Menu entries for the refactorings available at `range` of `uri`.
    pub fn detect(&self, uri: &str, range: Range) -> RefactorResult<Vec<CodeAction>> {
        Ok(self
            .detect_actions(uri, range)?
            .iter()
            .map(RefactorAction::to_code_action)
            .collect())
    }

    /// Compute the edits of `action` without applying them.
    pub fn plan(&self, action: &RefactorAction) -> RefactorResult<Outcome> {
        let mut b = EditBuilder::new(self);
        match action {
            RefactorAction::AddArgument(t) => ops::arguments::add_argument(&mut b, t)?,
            RefactorAction::RemoveArgument(t) => ops::arguments::remove_argument(&mut b, t)?,
            RefactorAction::ReorderArguments(t) => ops::arguments::reorder_arguments(&mut b, t)?,
            RefactorAction::AddParameter(t) => ops::parameters::add_parameter(&mut b, t)?,
            RefactorAction::RemoveParameter(t) => ops::parameters::remove_parameter(&mut b, t)?,
            RefactorAction::ReorderParameters(t) => ops::parameters::reorder_parameters(&mut b, t)?,
            RefactorAction::ExtractToEntity(t) => ops::extract::extract_to_entity(&mut b, t)?,
            RefactorAction::ExtractToNewEntity(t) => ops::extract::extract_to_new_entity(&mut b, t)?,
            RefactorAction::ExtractToNewFile(t) => ops::extract::extract_to_new_file(&mut b, t)?,
            RefactorAction::ExtractProtocol(t) => ops::protocol::extract_protocol(&mut b, t)?,
            RefactorAction::ConvertEntity(t) => ops::convert::convert_entity(&mut b, t)?,
            RefactorAction::InlineVariable(t) => ops::variables::inline_variable(&mut b, t)?,
            RefactorAction::UnifyWithNewVariable(t) => ops::variables::unify_with_new_variable(&mut b, t)?,
            RefactorAction::IncrementNumberedVariables(t) => ops::variables::shift_numbered_variables(&mut b, t, 1)?,
            RefactorAction::DecrementNumberedVariables(t) => ops::variables::shift_numbered_variables(&mut b, t, -1)?,
            RefactorAction::SplitListDirective(t) => ops::list_directive::split_list_directive(&mut b, t)?,
            RefactorAction::SortListDirective(t) => ops::list_directive::sort_list_directive(&mut b, t)?,
            RefactorAction::ReplaceMagicNumber(t) => ops::magic_number::replace_magic_number(&mut b, t)?,
            RefactorAction::IncludeFileContents(t) => ops::include::include_file_contents(&mut b, t)?,
            RefactorAction::ReplaceWithInclude(t) => ops::include::replace_with_include(&mut b, t)?,
        }
        let outcome = b.finish()?;
        info!(
            command = %action.command(),
            files = outcome.edit.file_count(),
            edits = outcome.edit.edit_count(),
            "planned refactoring"
        );
        Ok(outcome)
    }

    /// Plan `action` and apply the batch through the host.
    ///
    /// Failures are reported through the interaction adapter before being
    /// returned; a cancelled prompt is not reported.
    pub fn execute(&self, action: &RefactorAction) -> RefactorResult<Outcome> {
        let result = self.plan(action).and_then(|outcome| {
            if outcome.edit.has_edits() {
                self.host.apply_edits(&outcome.edit)?;
                info!(command = %action.command(), "applied refactoring");
            }
            Ok(outcome)
        });
        match &result {
            Ok(outcome) if !outcome.edit.has_edits() => self.ui.print_info("nothing to change"),
            Ok(_) => self.ui.print_success(&action.title()),
            Err(RefactorError::Cancelled) => debug!("refactoring cancelled"),
            Err(err @ RefactorError::NotApplicable(_)) => self.ui.print_info(&err.to_string()),
            Err(err) => self.ui.print_error(&err.to_string()),
        }
        result
    }
}

// ============================================================================
// Edit builder
// ============================================================================

/// Mutable state of one refactoring run.
pub struct EditBuilder<'e> {
    pub(crate) host: &'e dyn Host,
    pub(crate) symbols: &'e dyn SymbolProvider,
    pub(crate) ui: &'e dyn InteractionAdapter,
    pub(crate) format: &'e FormatConfig,
    pub(crate) cancel: &'e CancellationToken,
    docs: HashMap<String, Rc<TextDocument>>,
    edit: WorkspaceEdit,
    claimed: HashSet<(String, usize)>,
    warnings: Vec<String>,
}

impl<'e> EditBuilder<'e> {
    fn new(engine: &'e Engine<'_>) -> Self {
        EditBuilder {
            host: engine.host,
            symbols: engine.symbols,
            ui: engine.ui,
            format: &engine.format,
            cancel: &engine.cancel,
            docs: HashMap::new(),
            edit: WorkspaceEdit::new(),
            claimed: HashSet::new(),
            warnings: Vec::new(),
        }
    }

    /// Snapshot of `uri`, opened once per run.
    pub fn document(&mut self, uri: &str) -> RefactorResult<Rc<TextDocument>> {
        if let Some(doc) = self.docs.get(uri) {
            return Ok(Rc::clone(doc));
        }
        let doc = Rc::new(self.host.open_document(uri)?);
        self.docs.insert(uri.to_string(), Rc::clone(&doc));
        Ok(doc)
    }

    /// Mark the term starting at `line` as handled; false if it already was.
    pub fn claim(&mut self, uri: &str, line: usize) -> bool {
        self.claimed.insert((uri.to_string(), line))
    }

    /// Replace lines `start..=end` with `text` (lines joined with `\n`).
    pub fn replace_lines(&mut self, doc: &TextDocument, start: usize, end: usize, text: &str) {
        if doc.lines_text(start, end) == text {
            return;
        }
        let new_text = to_line_ending(doc, text);
        self.edit
            .push(doc.uri(), TextEdit::replace(doc.line_span(start, end), new_text));
        self.edit.require_hash(doc.uri(), doc.content_hash().clone());
    }

    /// Rewrite a whole term once; later calls for the same term are ignored.
    pub fn rewrite_term(&mut self, doc: &TextDocument, term: TermRange, rewrite: impl FnOnce(&str) -> String) -> bool {
        if !self.claim(doc.uri(), term.start) {
            return false;
        }
        let text = doc.lines_text(term.start, term.end);
        let new = rewrite(&text);
        self.replace_lines(doc, term.start, term.end, &new);
        true
    }

    /// Insert `text` as whole lines before `line` (appends past the end).
    pub fn insert_lines(&mut self, doc: &TextDocument, line: usize, text: &str) {
        let body = to_line_ending(doc, text);
        let eol = doc.line_ending();
        let edit = if line < doc.line_count() {
            TextEdit::insert(Position::line_start(line as u32), format!("{}{}", body, eol))
        } else if doc.line_count() == 0 {
            TextEdit::insert(Position::line_start(0), format!("{}{}", body, eol))
        } else if doc.full_text().ends_with('\n') {
            TextEdit::insert(Position::line_start(doc.line_count() as u32), format!("{}{}", body, eol))
        } else {
            let last = doc.line_count() - 1;
            TextEdit::insert(doc.position_at(last, doc.line(last).len()), format!("{}{}", eol, body))
        };
        self.edit.push(doc.uri(), edit);
        self.edit.require_hash(doc.uri(), doc.content_hash().clone());
    }

    /// Delete lines `start..=end` including their line breaks.
    pub fn delete_lines(&mut self, doc: &TextDocument, start: usize, end: usize) {
        self.edit
            .push(doc.uri(), TextEdit::delete(doc.whole_lines(start, end)));
        self.edit.require_hash(doc.uri(), doc.content_hash().clone());
    }

    /// Schedule a new file.
    pub fn create(&mut self, uri: &str, contents: String) -> RefactorResult<()> {
        if self.host.file_exists(uri) || self.edit.creates.contains_key(uri) {
            return Err(RefactorError::precondition(format!("file already exists: {}", uri)));
        }
        debug!(uri, "creating file");
        self.edit.create_file(uri, contents);
        Ok(())
    }

    /// Record a non-fatal note.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(%message, "refactoring warning");
        self.ui.print_warning(&message);
        self.warnings.push(message);
    }

    /// Fail with [`RefactorError::Cancelled`] if cancellation was requested.
    pub fn checkpoint(&self) -> RefactorResult<()> {
        if self.cancel.is_cancelled() {
            return Err(RefactorError::Cancelled);
        }
        Ok(())
    }

    fn finish(mut self) -> RefactorResult<Outcome> {
        self.edit.dedup();
        self.edit.sort_edits();
        let conflicts = self.edit.detect_conflicts();
        if !conflicts.is_empty() {
            return Err(RefactorError::Conflict(conflicts));
        }
        Ok(Outcome {
            edit: self.edit,
            warnings: self.warnings,
        })
    }

    // ------------------------------------------------------------------------
    // Prompts
    // ------------------------------------------------------------------------

    /// Ask for a variable name.
    pub fn ask_variable(&self, prompt: &str, default: Option<&str>) -> RefactorResult<String> {
        let validate = |s: &str| (!syntax::is_variable(s)).then(|| format!("'{}' is not a variable name", s));
        Ok(self.ui.ask_text(prompt, default, &validate)?)
    }

    /// Ask for an atom; unquoted answers that need quotes are quoted.
    pub fn ask_atom(&self, prompt: &str, default: Option<&str>) -> RefactorResult<String> {
        let validate = |s: &str| s.trim().is_empty().then(|| "a name is required".to_string());
        let answer = self.ui.ask_text(prompt, default, &validate)?;
        Ok(syntax::quote_atom(answer.trim()))
    }

    /// Ask for a 1-based position in `1..=max`.
    pub fn ask_position(&self, prompt: &str, max: usize, default: usize) -> RefactorResult<usize> {
        let validate = move |s: &str| match s.trim().parse::<usize>() {
            Ok(n) if (1..=max).contains(&n) => None,
            _ => Some(format!("expected a position between 1 and {}", max)),
        };
        let default = default.to_string();
        let answer = self.ui.ask_text(prompt, Some(&default), &validate)?;
        answer
            .trim()
            .parse()
            .map_err(|_| RefactorError::precondition(format!("invalid position '{}'", answer)))
    }

    /// Ask for a permutation of `1..=arity`.
    pub fn ask_permutation(&self, prompt: &str, arity: usize) -> RefactorResult<Vec<usize>> {
        let validate = move |s: &str| match callable::parse_permutation(s) {
            Some(permutation) => ArgChange::Reorder { permutation }.validate(arity).err(),
            None => Some("expected positions separated by commas".to_string()),
        };
        let default = (1..=arity).map(|n| n.to_string()).collect::<Vec<_>>().join(",");
        let answer = self.ui.ask_text(prompt, Some(&default), &validate)?;
        callable::parse_permutation(&answer)
            .ok_or_else(|| RefactorError::precondition(format!("invalid permutation '{}'", answer)))
    }

    /// Ask the user to pick one of `options`.
    pub fn ask_select(&self, prompt: &str, options: &[String]) -> RefactorResult<usize> {
        let labels: Vec<&str> = options.iter().map(String::as_str).collect();
        Ok(self.ui.ask_select(prompt, &labels)?)
    }
}

fn to_line_ending(doc: &dyn Document, text: &str) -> String {
    match doc.line_ending() {
        "\n" => text.to_string(),
        eol => text.replace('\n', eol),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::PredicateTarget;
    use crate::index::TextIndex;
    use crate::syntax::Indicator;
    use retalk_core::host::MemoryHost;
    use retalk_core::interaction::{MessageLevel, ScriptedAdapter};

    const SRC: &str = "\
:- object(a).

\t:- public(foo/1).

\tfoo(X) :- bar(X).

:- end_object.
";

    fn target() -> RefactorAction {
        RefactorAction::AddArgument(PredicateTarget {
            uri: "a.lgt".into(),
            position: Position::new(2, 12),
            indicator: Indicator::predicate("foo", 1),
        })
    }

    mod builder_tests {
        use super::*;

        #[test]
        fn rewrite_term_claims_once() {
            let host = MemoryHost::with_files([("a.lgt", SRC)]);
            let index = TextIndex::new(&host);
            let ui = ScriptedAdapter::new(Vec::<String>::new());
            let engine = Engine::new(&host, &index, &ui);
            let mut b = EditBuilder::new(&engine);
            let doc = b.document("a.lgt").unwrap();
            let term = crate::boundary::term_range(doc.as_ref(), 4);
            assert!(b.rewrite_term(&doc, term, |t| t.replace("bar", "baz")));
            assert!(!b.rewrite_term(&doc, term, |t| t.replace("bar", "qux")));
            let outcome = b.finish().unwrap();
            assert_eq!(outcome.edit.edit_count(), 1);
            assert_eq!(outcome.edit.changes["a.lgt"][0].new_text, "\tfoo(X) :- baz(X).");
        }

        #[test]
        fn create_refuses_existing_file() {
            let host = MemoryHost::with_files([("a.lgt", SRC)]);
            let index = TextIndex::new(&host);
            let ui = ScriptedAdapter::new(Vec::<String>::new());
            let engine = Engine::new(&host, &index, &ui);
            let mut b = EditBuilder::new(&engine);
            let err = b.create("a.lgt", String::new()).unwrap_err();
            assert!(matches!(err, RefactorError::Precondition(_)));
        }

        #[test]
        fn insert_past_end_without_trailing_newline() {
            let host = MemoryHost::with_files([("a.lgt", "foo.")]);
            let index = TextIndex::new(&host);
            let ui = ScriptedAdapter::new(Vec::<String>::new());
            let engine = Engine::new(&host, &index, &ui);
            let mut b = EditBuilder::new(&engine);
            let doc = b.document("a.lgt").unwrap();
            b.insert_lines(&doc, 1, "bar.");
            let outcome = b.finish().unwrap();
            host.apply_edits(&outcome.edit).unwrap();
            assert_eq!(host.text("a.lgt").unwrap(), "foo.\nbar.");
        }
    }

    mod entry_point_tests {
        use super::*;

        #[test]
        fn execute_applies_and_reports() {
            let host = MemoryHost::with_files([("a.lgt", SRC)]);
            let index = TextIndex::new(&host);
            let ui = ScriptedAdapter::new(["Y", "2"]);
            let engine = Engine::new(&host, &index, &ui);
            engine.execute(&target()).unwrap();
            let text = host.text("a.lgt").unwrap();
            assert!(text.contains(":- public(foo/2)."));
            assert!(text.contains("foo(X, Y) :- bar(X)."));
            assert!(ui.messages().iter().any(|(l, _)| *l == MessageLevel::Success));
        }

        #[test]
        fn cancelled_prompt_applies_nothing() {
            let host = MemoryHost::with_files([("a.lgt", SRC)]);
            let index = TextIndex::new(&host);
            let ui = ScriptedAdapter::new(Vec::<String>::new());
            let engine = Engine::new(&host, &index, &ui);
            let err = engine.execute(&target()).unwrap_err();
            assert!(matches!(err, RefactorError::Cancelled));
            assert_eq!(host.text("a.lgt").unwrap(), SRC);
            assert!(ui.messages().is_empty());
        }

        #[test]
        fn host_rejection_is_reported() {
            let host = MemoryHost::with_files([("a.lgt", SRC)]);
            host.reject_applies(true);
            let index = TextIndex::new(&host);
            let ui = ScriptedAdapter::new(["Y", "2"]);
            let engine = Engine::new(&host, &index, &ui);
            let err = engine.execute(&target()).unwrap_err();
            assert!(matches!(err, RefactorError::Host(_)));
            assert_eq!(host.text("a.lgt").unwrap(), SRC);
            assert!(ui.messages().iter().any(|(l, _)| *l == MessageLevel::Error));
        }

        #[test]
        fn detect_offers_argument_actions() {
            let host = MemoryHost::with_files([("a.lgt", SRC)]);
            let index = TextIndex::new(&host);
            let ui = ScriptedAdapter::new(Vec::<String>::new());
            let engine = Engine::new(&host, &index, &ui);
            let actions = engine.detect("a.lgt", Range::point(Position::new(2, 12))).unwrap();
            let commands: Vec<_> = actions.iter().map(|a| a.command.as_str()).collect();
            assert!(commands.contains(&"logtalk.refactor.addArgument"));
            assert!(commands.contains(&"logtalk.refactor.removeArgument"));
            assert!(!commands.contains(&"logtalk.refactor.reorderArguments"));
        }
    }
}
