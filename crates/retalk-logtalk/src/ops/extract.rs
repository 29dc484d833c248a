//! Extract selected terms to a new file, a new entity or an existing entity.
//!
//! A selection qualifies when it covers whole terms: its first non-blank
//! line is a comment or the start of a term and its last code line ends a
//! term. The selected lines are deleted from the source and reinserted at
//! the destination with their indentation normalized.

use retalk_core::config::FormatConfig;
use retalk_core::document::Document;
use retalk_core::host::{join_uri, parent_uri};
use retalk_core::text::reindent;
use retalk_core::types::Range;
use tracing::{debug, warn};

use crate::action::SelectionTarget;
use crate::boundary;
use crate::engine::EditBuilder;
use crate::error::{RefactorError, RefactorResult};
use crate::scanner;
use crate::syntax::{self, EntityKind, EntityOpening};

// ============================================================================
// Selection validity
// ============================================================================

/// Lines of `range` with leading and trailing blank lines dropped.
fn selected_lines(doc: &dyn Document, range: &Range) -> Option<(usize, usize)> {
    let mut first = range.start.line as usize;
    let mut last = (range.end.line as usize).min(doc.line_count().checked_sub(1)?);
    if last > first && range.end.character == 0 {
        last -= 1;
    }
    while first <= last && doc.line(first).trim().is_empty() {
        first += 1;
    }
    while last > first && doc.line(last).trim().is_empty() {
        last -= 1;
    }
    (first <= last && !doc.line(first).trim().is_empty()).then_some((first, last))
}

/// Check that `range` covers complete terms and return its line span.
pub(crate) fn validate_selection(doc: &dyn Document, range: &Range) -> RefactorResult<(usize, usize)> {
    let (first, last) = selected_lines(doc, range).ok_or_else(|| RefactorError::not_applicable("empty selection"))?;
    let incomplete = || RefactorError::precondition("selection contains incomplete terms");
    let first_line = doc.line(first);
    if !scanner::is_blank_or_comment(first_line) && boundary::find_term_start(doc, first) != Some(first) {
        return Err(incomplete());
    }
    let code_line = (first..=last)
        .rev()
        .find(|n| !scanner::is_blank_or_comment(doc.line(*n)))
        .map(|n| scanner::strip_line_comment(doc.line(n)));
    if let Some(code) = code_line {
        if code.ends_with(',') || !code.ends_with('.') {
            return Err(incomplete());
        }
    }
    let terms = boundary::terms_in(doc, first..last + 1);
    if terms.iter().any(|t| !t.is_complete() || t.end > last) {
        return Err(incomplete());
    }
    Ok((first, last))
}

/// Whether `range` covers complete terms.
pub(crate) fn is_complete_selection(doc: &dyn Document, range: &Range) -> bool {
    validate_selection(doc, range).is_ok()
}

fn selection_contains_clauses(doc: &dyn Document, first: usize, last: usize) -> bool {
    boundary::terms_in(doc, first..last + 1).iter().any(|t| {
        let text = doc.lines_text(t.start, t.end);
        !boundary::is_directive_start(&text)
    })
}

// ============================================================================
// New entity text
// ============================================================================

/// Source of a new entity file.
pub(crate) struct NewEntity<'a> {
    pub kind: EntityKind,
    /// Identifier text, parameters included.
    pub identifier: &'a str,
    /// Relation arguments appended to the opening directive.
    pub relations: Option<String>,
    /// `comment` entry of the generated `info/1` directive.
    pub comment: String,
    /// Body lines, already indented.
    pub body: Vec<String>,
}

impl NewEntity<'_> {
    pub fn render(&self, format: &FormatConfig) -> String {
        let mut out = match &self.relations {
            Some(rel) => format!(":- {}({},\n{}{}).\n\n", self.kind, self.identifier, format.indent, rel),
            None => format!(":- {}({}).\n\n", self.kind, self.identifier),
        };
        if format.new_entity_info {
            let i2 = format!("{}{}", format.indent, format.indent);
            out.push_str(&format!("{}:- info([\n", format.indent));
            out.push_str(&format!("{}version is 1:0:0,\n", i2));
            if let Some(author) = &format.author {
                out.push_str(&format!("{}author is {},\n", i2, syntax::quote_atom(author)));
            }
            out.push_str(&format!("{}date is {},\n", i2, chrono::Local::now().format("%Y-%m-%d")));
            out.push_str(&format!("{}comment is {}\n", i2, syntax::quote_atom(&self.comment)));
            out.push_str(&format!("{}]).\n\n", format.indent));
        }
        for line in &self.body {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&format!("\n:- {}.\n", self.kind.end_directive()));
        out
    }
}

/// Ask for a file name next to `source` and return its URI.
pub(crate) fn ask_file_uri(b: &EditBuilder<'_>, source: &str, default: &str) -> RefactorResult<String> {
    let validate = |s: &str| {
        if s.trim().is_empty() {
            Some("a file name is required".to_string())
        } else if s.contains("..") {
            Some("the file must be in the same directory tree".to_string())
        } else {
            None
        }
    };
    let name = b.ui.ask_text("File name", Some(default), &validate)?;
    let name = name.trim();
    let file = if name.rsplit('/').next().is_some_and(|base| base.contains('.')) {
        name.to_string()
    } else {
        format!("{}.lgt", name)
    };
    Ok(join_uri(parent_uri(source), &file))
}

fn file_name(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap_or(uri)
}

fn selected_text(doc: &dyn Document, first: usize, last: usize, indent: &str) -> Vec<String> {
    let lines: Vec<&str> = (first..=last).map(|n| doc.line(n)).collect();
    reindent(&lines, indent)
}

// ============================================================================
// Entry points
// ============================================================================

pub(crate) fn extract_to_new_file(b: &mut EditBuilder<'_>, target: &SelectionTarget) -> RefactorResult<()> {
    let doc = b.document(&target.uri)?;
    let (first, last) = validate_selection(doc.as_ref(), &target.range)?;
    let uri = ask_file_uri(b, &target.uri, "extracted.lgt")?;
    let mut contents = selected_text(doc.as_ref(), first, last, "").join("\n");
    contents.push('\n');
    b.create(&uri, contents)?;
    b.delete_lines(&doc, first, last);
    debug!(from = %target.uri, to = %uri, lines = last - first + 1, "extracted to new file");
    Ok(())
}

pub(crate) fn extract_to_new_entity(b: &mut EditBuilder<'_>, target: &SelectionTarget) -> RefactorResult<()> {
    let doc = b.document(&target.uri)?;
    let (first, last) = validate_selection(doc.as_ref(), &target.range)?;
    let kinds: Vec<String> = EntityKind::ALL.iter().map(ToString::to_string).collect();
    let kind = EntityKind::ALL[b.ask_select("Entity type", &kinds)?];
    if kind == EntityKind::Protocol && selection_contains_clauses(doc.as_ref(), first, last) {
        return Err(RefactorError::precondition("protocols cannot contain clauses"));
    }
    let name = b.ask_atom(&format!("Name of the new {}", kind), None)?;
    let uri = ask_file_uri(b, &target.uri, &format!("{}.lgt", name.trim_matches('\'')))?;
    let entity = NewEntity {
        kind,
        identifier: &name,
        relations: None,
        comment: format!("Extracted from {}.", file_name(&target.uri)),
        body: selected_text(doc.as_ref(), first, last, &b.format.indent),
    };
    let contents = entity.render(b.format);
    b.create(&uri, contents)?;
    b.delete_lines(&doc, first, last);
    Ok(())
}

/// One entity that can receive extracted code.
struct Destination {
    uri: String,
    kind: EntityKind,
    name: String,
    end_line: usize,
}

pub(crate) fn extract_to_entity(b: &mut EditBuilder<'_>, target: &SelectionTarget) -> RefactorResult<()> {
    let doc = b.document(&target.uri)?;
    let (first, last) = validate_selection(doc.as_ref(), &target.range)?;
    let mut destinations = Vec::new();
    for uri in b.host.workspace_files() {
        let candidate = match b.document(&uri) {
            Ok(d) => d,
            Err(err) => {
                warn!(%uri, error = %err, "skipping unreadable file");
                continue;
            }
        };
        for entity in boundary::entities(candidate.as_ref()) {
            let Some(end_line) = entity.end_line else {
                continue;
            };
            let encloses = uri == target.uri && entity.opening.start <= first && last <= end_line;
            let text = candidate.lines_text(entity.opening.start, entity.opening.end);
            let (Some(opening), false) = (EntityOpening::parse(&text), encloses) else {
                continue;
            };
            destinations.push(Destination {
                uri: uri.clone(),
                kind: entity.kind,
                name: opening.identifier.to_string(),
                end_line,
            });
        }
    }
    if destinations.is_empty() {
        return Err(RefactorError::precondition("no other entity found in the workspace"));
    }
    let labels: Vec<String> = destinations
        .iter()
        .map(|d| format!("{} {} ({})", d.kind, d.name, d.uri))
        .collect();
    let dest = &destinations[b.ask_select("Destination entity", &labels)?];
    if dest.kind == EntityKind::Protocol && selection_contains_clauses(doc.as_ref(), first, last) {
        return Err(RefactorError::precondition("protocols cannot contain clauses"));
    }
    let dest_doc = b.document(&dest.uri)?;
    let mut body = selected_text(doc.as_ref(), first, last, &b.format.indent);
    if dest.end_line > 0 && !dest_doc.line(dest.end_line - 1).trim().is_empty() {
        body.insert(0, String::new());
    }
    body.push(String::new());
    b.insert_lines(&dest_doc, dest.end_line, &body.join("\n"));
    b.delete_lines(&doc, first, last);
    debug!(to = %dest.name, "extracted to existing entity");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use retalk_core::document::TextDocument;
    use retalk_core::types::Position;

    const SRC: &str = "\
:- object(a).

\tfoo(1).
\tfoo(2).

\tbar(X) :-
\t\tfoo(X),
\t\tbaz(X).

:- end_object.
";

    fn select(l1: u32, l2: u32) -> Range {
        Range::new(Position::new(l1, 0), Position::new(l2, 0))
    }

    #[test]
    fn whole_clauses_are_valid() {
        let doc = TextDocument::new("a.lgt", SRC);
        assert_eq!(validate_selection(&doc, &select(2, 4)).unwrap(), (2, 3));
        assert_eq!(validate_selection(&doc, &select(5, 8)).unwrap(), (5, 7));
    }

    #[test]
    fn trailing_comma_is_incomplete() {
        let doc = TextDocument::new("a.lgt", SRC);
        let err = validate_selection(&doc, &select(5, 7)).unwrap_err();
        assert_eq!(err.to_string(), "selection contains incomplete terms");
    }

    #[test]
    fn selection_starting_mid_clause_is_incomplete() {
        let doc = TextDocument::new("a.lgt", SRC);
        assert!(validate_selection(&doc, &select(6, 8)).is_err());
    }

    #[test]
    fn blank_selection_is_not_applicable() {
        let doc = TextDocument::new("a.lgt", SRC);
        assert!(matches!(
            validate_selection(&doc, &select(1, 2)),
            Err(RefactorError::NotApplicable(_))
        ));
    }

    #[test]
    fn new_entity_text() {
        let format = FormatConfig {
            new_entity_info: false,
            ..FormatConfig::default()
        };
        let entity = NewEntity {
            kind: EntityKind::Category,
            identifier: "helpers",
            relations: None,
            comment: String::new(),
            body: vec!["\tfoo(1).".to_string()],
        };
        assert_eq!(entity.render(&format), ":- category(helpers).\n\n\tfoo(1).\n\n:- end_category.\n");
    }
}
