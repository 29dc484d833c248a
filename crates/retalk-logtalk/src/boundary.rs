//! Boundary resolver: term starts, directive/clause ranges and entity ranges.
//!
//! Ranges are line based. A range is *complete* when its terminating `.`
//! was found; otherwise it extends to the last line and callers treat it as
//! "refactoring not applicable".

use regex::Regex;
use retalk_core::document::Document;
use std::sync::LazyLock;

use crate::scanner::{self, CharClass, Classifier};
use crate::syntax::EntityKind;

/// Line range of one directive or clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermRange {
    /// First line.
    pub start: usize,
    /// Last line (inclusive).
    pub end: usize,
    /// Byte offset of the terminating `.` in the end line.
    pub dot: Option<usize>,
}

impl TermRange {
    /// Whether the terminator was found.
    pub fn is_complete(&self) -> bool {
        self.dot.is_some()
    }

    /// Whether `line` lies in the range.
    pub fn contains_line(&self, line: usize) -> bool {
        self.start <= line && line <= self.end
    }
}

/// Shape of a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseKind {
    /// `Head.`
    Fact,
    /// `Head :- Body.`
    Rule,
    /// `Head --> Body.`
    GrammarRule,
}

/// A clause range with its shape and the neck location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClauseRange {
    pub range: TermRange,
    pub kind: ClauseKind,
    /// Byte offset of `:-` or `-->` within the joined clause text.
    pub neck: Option<usize>,
}

/// Opening directive plus the matching end directive of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRange {
    pub kind: EntityKind,
    pub opening: TermRange,
    /// Line of `:- end_<kind>.`; `None` if missing.
    pub end_line: Option<usize>,
}

impl EntityRange {
    /// Lines strictly between the opening directive and the end directive.
    pub fn body_lines(&self, doc: &dyn Document) -> std::ops::Range<usize> {
        let end = self.end_line.unwrap_or(doc.line_count());
        (self.opening.end + 1)..end
    }
}

static OPENING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*:-\s*(object|protocol|category)\(").unwrap());

static END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*:-\s*end_(object|protocol|category)\s*\.").unwrap());

/// Whether the line starts a directive.
pub fn is_directive_start(line: &str) -> bool {
    line.trim_start().starts_with(":-")
}

/// Whether the code part of a line ends with a term terminator.
pub fn line_ends_term(line: &str) -> bool {
    let code = scanner::strip_line_comment(line);
    if code.is_empty() {
        return false;
    }
    let classes = scanner::classify(code);
    scanner::is_end_dot(code, &classes, code.len() - 1)
}

/// Walk backwards from `line` to the first line of the enclosing term.
///
/// Returns `None` for blank and comment lines.
pub fn find_term_start(doc: &dyn Document, line: usize) -> Option<usize> {
    if line >= doc.line_count() || scanner::is_blank_or_comment(doc.line(line)) {
        return None;
    }
    let mut start = line;
    loop {
        let mut prev = start;
        let mut found = None;
        while prev > 0 {
            prev -= 1;
            let text = doc.line(prev);
            if !scanner::is_blank_or_comment(text) {
                found = Some(prev);
                break;
            }
        }
        match found {
            None => return Some(start),
            Some(p) => {
                let text = doc.line(p);
                if line_ends_term(text)
                    || is_directive_end(text)
                    || (is_directive_start(doc.line(start)) && !ends_in_continuation(text))
                {
                    return Some(start);
                }
                start = p;
            }
        }
    }
}

fn is_directive_end(line: &str) -> bool {
    END.is_match(line)
}

/// Trailing `,`, `:-`, `-->`, `(`, `[`, `;`, `->` mean the term continues.
fn ends_in_continuation(line: &str) -> bool {
    let code = scanner::strip_line_comment(line);
    [",", ":-", "-->", "(", "[", "{", ";", "->", "|"]
        .iter()
        .any(|s| code.ends_with(s))
}

/// Extend from `start` to the line holding the terminating `.`.
pub fn term_range(doc: &dyn Document, start: usize) -> TermRange {
    let mut classifier = Classifier::new();
    let mut depth = 0i32;
    let last = doc.line_count().saturating_sub(1);
    for n in start..doc.line_count() {
        let text = format!("{}\n", doc.line(n));
        let classes = classifier.classify(&text);
        let bytes = text.as_bytes();
        for i in 0..bytes.len() {
            if classes[i] != CharClass::Code {
                continue;
            }
            match bytes[i] {
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth -= 1,
                b'.' if depth <= 0 && scanner::is_end_dot(&text, &classes, i) => {
                    return TermRange {
                        start,
                        end: n,
                        dot: Some(i),
                    };
                }
                _ => {}
            }
        }
    }
    TermRange {
        start,
        end: last.max(start),
        dot: None,
    }
}

/// Range of the directive starting at `start`.
pub fn get_directive_range(doc: &dyn Document, start: usize) -> TermRange {
    term_range(doc, start)
}

/// Range and shape of the clause starting at `start`.
pub fn get_clause_range(doc: &dyn Document, start: usize) -> ClauseRange {
    let range = term_range(doc, start);
    let text = doc.lines_text(range.start, range.end);
    let classes = scanner::classify(&text);
    let grammar = scanner::find_top_level(&text, &classes, 0, text.len(), "-->");
    let rule = scanner::find_top_level(&text, &classes, 0, text.len(), ":-");
    let (kind, neck) = match (rule, grammar) {
        (Some(r), Some(g)) if g < r => (ClauseKind::GrammarRule, Some(g)),
        (Some(r), _) => (ClauseKind::Rule, Some(r)),
        (None, Some(g)) => (ClauseKind::GrammarRule, Some(g)),
        (None, None) => (ClauseKind::Fact, None),
    };
    ClauseRange { range, kind, neck }
}

/// Range of the term (directive or clause) covering `line`.
pub fn enclosing_term(doc: &dyn Document, line: usize) -> Option<TermRange> {
    let start = find_term_start(doc, line)?;
    let range = term_range(doc, start);
    range.contains_line(line).then_some(range)
}

/// Term ranges of every term starting in `lines`, skipping blank and comment lines.
pub fn terms_in(doc: &dyn Document, lines: std::ops::Range<usize>) -> Vec<TermRange> {
    let mut out = Vec::new();
    let mut n = lines.start;
    while n < lines.end.min(doc.line_count()) {
        if scanner::is_blank_or_comment(doc.line(n)) {
            n += 1;
            continue;
        }
        let range = term_range(doc, n);
        out.push(range);
        if !range.is_complete() {
            break;
        }
        n = range.end + 1;
    }
    out
}

/// Entity enclosing `line` (or opening at `line`).
pub fn find_entity(doc: &dyn Document, line: usize) -> Option<EntityRange> {
    let mut n = line.min(doc.line_count().saturating_sub(1));
    loop {
        let text = doc.line(n);
        if let Some(caps) = OPENING.captures(text) {
            let kind = EntityKind::from_keyword(caps.get(1)?.as_str())?;
            let opening = get_directive_range(doc, n);
            let end_line = find_entity_end(doc, opening.end + 1, kind);
            if n < line && end_line.is_some_and(|e| e < line) {
                return None;
            }
            return Some(EntityRange {
                kind,
                opening,
                end_line,
            });
        }
        if n < line && is_directive_end(text) {
            return None;
        }
        if n == 0 {
            return None;
        }
        n -= 1;
    }
}

/// Entity whose opening directive covers `line`.
pub fn entity_opening_at(doc: &dyn Document, line: usize) -> Option<EntityRange> {
    let entity = find_entity(doc, line)?;
    entity.opening.contains_line(line).then_some(entity)
}

/// All entities of a document in order.
pub fn entities(doc: &dyn Document) -> Vec<EntityRange> {
    let mut out = Vec::new();
    let mut n = 0;
    while n < doc.line_count() {
        if OPENING.is_match(doc.line(n)) {
            if let Some(entity) = find_entity(doc, n) {
                n = entity.end_line.unwrap_or(entity.opening.end) + 1;
                out.push(entity);
                continue;
            }
        }
        n += 1;
    }
    out
}

fn find_entity_end(doc: &dyn Document, from: usize, kind: EntityKind) -> Option<usize> {
    (from..doc.line_count()).find(|n| {
        END
            .captures(doc.line(*n))
            .and_then(|c| c.get(1))
            .is_some_and(|m| m.as_str() == kind.keyword())
    })
}
