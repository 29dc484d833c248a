//! Read-only document snapshots.
//!
//! A [`Document`] is an ordered sequence of lines that stays immutable for the
//! duration of one refactoring. Hosts hand out [`TextDocument`] snapshots; the
//! content hash taken at open time lets the apply step detect files that
//! changed underneath the engine.

use crate::patch::ContentHash;
use crate::text::{self, byte_to_utf16_col, utf16_col_to_byte, utf16_len};
use crate::types::{Position, Range};

/// Read-only line access to a document.
pub trait Document {
    /// URI (or workspace-relative path) of the document.
    fn uri(&self) -> &str;

    /// Number of lines.
    fn line_count(&self) -> usize;

    /// Text of line `n` without its terminator; empty past the end.
    fn line(&self, n: usize) -> &str;

    /// Line terminator used when synthesizing multi-line text.
    fn line_ending(&self) -> &str {
        "\n"
    }

    /// Text covered by `range`, lines joined with `\n`.
    fn text_in(&self, range: &Range) -> String {
        let start_line = range.start.line as usize;
        let end_line = range.end.line as usize;
        if start_line >= self.line_count() {
            return String::new();
        }
        if start_line == end_line {
            let line = self.line(start_line);
            let s = utf16_col_to_byte(line, range.start.character);
            let e = utf16_col_to_byte(line, range.end.character).max(s);
            return line[s..e].to_string();
        }
        let mut out = String::new();
        let first = self.line(start_line);
        out.push_str(&first[utf16_col_to_byte(first, range.start.character)..]);
        for n in start_line + 1..end_line.min(self.line_count()) {
            out.push('\n');
            out.push_str(self.line(n));
        }
        if end_line < self.line_count() {
            out.push('\n');
            let last = self.line(end_line);
            out.push_str(&last[..utf16_col_to_byte(last, range.end.character)]);
        }
        out
    }

    /// Lines `start..=end` joined with `\n`.
    fn lines_text(&self, start: usize, end: usize) -> String {
        (start..=end.min(self.line_count().saturating_sub(1)))
            .map(|n| self.line(n))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Range covering whole lines `start..=end` (end exclusive at the end of `end`).
    fn line_span(&self, start: usize, end: usize) -> Range {
        Range::new(
            Position::line_start(start as u32),
            Position::new(end as u32, utf16_len(self.line(end))),
        )
    }

    /// Range that deletes lines `start..=end` including the final line break.
    fn whole_lines(&self, start: usize, end: usize) -> Range {
        if end + 1 < self.line_count() {
            Range::new(
                Position::line_start(start as u32),
                Position::line_start(end as u32 + 1),
            )
        } else if start > 0 {
            // last line: eat the break that precedes the block instead
            let prev = self.line(start - 1);
            Range::new(
                Position::new(start as u32 - 1, utf16_len(prev)),
                Position::new(end as u32, utf16_len(self.line(end))),
            )
        } else {
            self.line_span(start, end)
        }
    }

    /// Convert a byte offset within line `n` to a position.
    fn position_at(&self, n: usize, byte: usize) -> Position {
        Position::new(n as u32, byte_to_utf16_col(self.line(n), byte))
    }
}

/// Immutable in-memory document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
    uri: String,
    lines: Vec<String>,
    trailing_newline: bool,
    line_ending: &'static str,
    content_hash: ContentHash,
}

impl TextDocument {
    /// Create a document from full text.
    pub fn new(uri: impl Into<String>, content: &str) -> Self {
        TextDocument {
            uri: uri.into(),
            lines: text::split_lines(content),
            trailing_newline: text::ends_with_newline(content),
            line_ending: text::detect_line_ending(content),
            content_hash: ContentHash::compute(content.as_bytes()),
        }
    }

    /// Hash of the content this snapshot was created from.
    pub fn content_hash(&self) -> &ContentHash {
        &self.content_hash
    }

    /// All lines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Reassemble the full text.
    pub fn full_text(&self) -> String {
        let mut out = self.lines.join(self.line_ending);
        if self.trailing_newline {
            out.push_str(self.line_ending);
        }
        out
    }
}

impl Document for TextDocument {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line(&self, n: usize) -> &str {
        self.lines.get(n).map(String::as_str).unwrap_or("")
    }

    fn line_ending(&self) -> &str {
        self.line_ending
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> TextDocument {
        TextDocument::new("a.lgt", ":- object(a).\n\nfoo(X) :-\n\tbar(X).\n:- end_object.\n")
    }

    #[test]
    fn lines_and_full_text_roundtrip() {
        let d = doc();
        assert_eq!(d.line_count(), 5);
        assert_eq!(d.line(2), "foo(X) :-");
        assert_eq!(d.line(99), "");
        assert_eq!(
            d.full_text(),
            ":- object(a).\n\nfoo(X) :-\n\tbar(X).\n:- end_object.\n"
        );
    }

    #[test]
    fn text_in_single_and_multi_line() {
        let d = doc();
        let r = Range::new(Position::new(2, 0), Position::new(2, 6));
        assert_eq!(d.text_in(&r), "foo(X)");
        let r = Range::new(Position::new(2, 4), Position::new(3, 4));
        assert_eq!(d.text_in(&r), "X) :-\n\tbar");
    }

    #[test]
    fn whole_lines_includes_line_break() {
        let d = doc();
        let r = d.whole_lines(2, 3);
        assert_eq!(r.start, Position::new(2, 0));
        assert_eq!(r.end, Position::new(4, 0));
    }

    #[test]
    fn crlf_is_preserved() {
        let d = TextDocument::new("b.lgt", "a.\r\nb.\r\n");
        assert_eq!(d.line(0), "a.");
        assert_eq!(d.line_ending(), "\r\n");
        assert_eq!(d.full_text(), "a.\r\nb.\r\n");
    }
}
