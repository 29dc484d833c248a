//! Structural rewriters, one module per refactoring family.
//!
//! Every operation receives the run's [`EditBuilder`](crate::engine::EditBuilder)
//! and its typed target, prompts through the builder and records edits on it.
//! Shared clause-level helpers live here.

pub mod arguments;
pub mod convert;
pub mod extract;
pub mod include;
pub mod list_directive;
pub mod magic_number;
pub mod parameters;
pub mod protocol;
pub mod variables;

use retalk_core::document::Document;
use retalk_core::text::utf16_col_to_byte;
use retalk_core::types::Position;

use crate::boundary::{self, ClauseKind, TermRange};
use crate::error::{RefactorError, RefactorResult};
use crate::scanner::{self, CharClass};

// ============================================================================
// Clause text
// ============================================================================

/// One complete clause as `\n`-joined text.
#[derive(Debug, Clone)]
pub(crate) struct ClauseText {
    pub term: TermRange,
    pub kind: ClauseKind,
    pub text: String,
    pub classes: Vec<CharClass>,
    /// Offset of the first byte after `:-` or `-->`.
    pub body_start: Option<usize>,
    /// Offset of the terminating `.`.
    pub dot: usize,
}

impl ClauseText {
    /// Top-level goals of the body as trimmed spans.
    pub fn goals(&self) -> Vec<(usize, usize)> {
        match self.body_start {
            Some(start) => scanner::split_top_level_spans(&self.text, &self.classes, start, self.dot),
            None => Vec::new(),
        }
    }

    /// Whether `offset` lies in the body.
    pub fn in_body(&self, offset: usize) -> bool {
        self.body_start.is_some_and(|s| s <= offset && offset < self.dot)
    }
}

/// The clause covering `line`; directives and incomplete terms are rejected.
pub(crate) fn clause_at(doc: &dyn Document, line: usize) -> RefactorResult<ClauseText> {
    let term = boundary::enclosing_term(doc, line)
        .ok_or_else(|| RefactorError::not_applicable("no clause at the cursor"))?;
    let Some(dot_col) = term.dot else {
        return Err(RefactorError::not_applicable("the clause is not terminated"));
    };
    let text = doc.lines_text(term.start, term.end);
    if boundary::is_directive_start(&text) {
        return Err(RefactorError::not_applicable("the cursor is on a directive"));
    }
    let clause = boundary::get_clause_range(doc, term.start);
    let classes = scanner::classify(&text);
    let neck_len = match clause.kind {
        ClauseKind::GrammarRule => 3,
        _ => 2,
    };
    let dot = text.len() - doc.line(term.end).len() + dot_col;
    Ok(ClauseText {
        term,
        kind: clause.kind,
        body_start: clause.neck.map(|n| n + neck_len),
        text,
        classes,
        dot,
    })
}

/// Byte offset of `position` in the `\n`-joined text of `term`.
pub(crate) fn term_offset(doc: &dyn Document, term: &TermRange, position: Position) -> usize {
    let line = (position.line as usize).clamp(term.start, term.end);
    let before: usize = (term.start..line).map(|n| doc.line(n).len() + 1).sum();
    before + utf16_col_to_byte(doc.line(line), position.character)
}

/// Text to insert before goal `k` so a new goal precedes it with the same layout.
pub(crate) fn goal_prefix(text: &str, goals: &[(usize, usize)], k: usize, goal: &str) -> String {
    let start = goals[k].0;
    let line_start = text[..start].rfind('\n').map_or(0, |i| i + 1);
    if text[line_start..start].trim().is_empty() && line_start > 0 {
        format!("{},\n{}", goal, &text[line_start..start])
    } else {
        format!("{}, ", goal)
    }
}

/// Whether a term needs parentheses when substituted as an argument.
pub(crate) fn needs_parens(term: &str) -> bool {
    let term = term.trim();
    let classes = scanner::classify(term);
    let bytes = term.as_bytes();
    let mut depth = 0i32;
    for (i, b) in bytes.iter().enumerate() {
        if classes[i] != CharClass::Code {
            continue;
        }
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'-' if i == 0 => {}
            b if depth == 0 && (b.is_ascii_whitespace() || *b == b',' || *b == b'|') => return true,
            b if depth == 0 && scanner::is_symbol_byte(*b) && *b != b'.' => return true,
            b'.' if depth == 0 && !bytes.get(i + 1).is_some_and(u8::is_ascii_digit) => return true,
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use retalk_core::document::TextDocument;

    #[test]
    fn clause_goals_and_body() {
        let doc = TextDocument::new("t.lgt", "foo(X) :-\n\tY = 1,\n\tbar(X, Y).\n");
        let clause = clause_at(&doc, 1).unwrap();
        let goals: Vec<&str> = clause.goals().iter().map(|(s, e)| &clause.text[*s..*e]).collect();
        assert_eq!(goals, vec!["Y = 1", "bar(X, Y)"]);
        assert!(!clause.in_body(2));
        assert_eq!(&clause.text[clause.dot..=clause.dot], ".");
    }

    #[test]
    fn directive_is_not_a_clause() {
        let doc = TextDocument::new("t.lgt", ":- public(foo/1).\n");
        assert!(matches!(clause_at(&doc, 0), Err(RefactorError::NotApplicable(_))));
    }

    #[test]
    fn goal_prefix_follows_layout() {
        let text = "foo :-\n\tbar,\n\tbaz.";
        let goals = vec![(8, 11), (14, 17)];
        assert_eq!(goal_prefix(text, &goals, 0, "X = 1"), "X = 1,\n\t");
        let inline = "foo :- bar, baz.";
        assert_eq!(goal_prefix(inline, &[(7, 10), (12, 15)], 0, "X = 1"), "X = 1, ");
    }

    #[test]
    fn parenthesis_detection() {
        assert!(!needs_parens("foo(a, b)"));
        assert!(!needs_parens("[1, 2]"));
        assert!(!needs_parens("-1"));
        assert!(!needs_parens("3.14"));
        assert!(needs_parens("A + 1"));
        assert!(needs_parens("a-b"));
    }
}
