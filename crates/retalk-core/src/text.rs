//! Text position utilities for UTF-16 column and byte offset conversions.
//!
//! Editors address text by (line, UTF-16 column) while the scanners work on
//! byte offsets into `&str`. This module converts between the two.
//!
//! ## Coordinate Conventions
//!
//! - Lines and columns are **0-indexed**
//! - Columns count **UTF-16 code units**
//! - Byte offsets are **0-indexed** into the line (or full text)
//! - Out-of-range values clamp to the end of the line or text

use crate::types::{Position, Range};

// ============================================================================
// Column Conversions (single line)
// ============================================================================

/// Length of a string in UTF-16 code units.
pub fn utf16_len(text: &str) -> u32 {
    text.chars().map(|c| c.len_utf16() as u32).sum()
}

/// Convert a byte offset within a line to a UTF-16 column.
///
/// Offsets past the end of the line clamp to the line's UTF-16 length.
/// Offsets in the middle of a multi-byte character round down.
pub fn byte_to_utf16_col(line: &str, byte: usize) -> u32 {
    let mut col = 0u32;
    for (i, ch) in line.char_indices() {
        if i >= byte {
            return col;
        }
        col += ch.len_utf16() as u32;
    }
    col
}

/// Convert a UTF-16 column to a byte offset within a line.
///
/// Columns past the end clamp to the line's byte length. A column falling
/// inside a surrogate pair resolves to the start of that character.
pub fn utf16_col_to_byte(line: &str, col: u32) -> usize {
    let mut current = 0u32;
    for (i, ch) in line.char_indices() {
        let width = ch.len_utf16() as u32;
        if current + width > col {
            return i;
        }
        current += width;
    }
    line.len()
}

/// Convert a character column (Unicode scalar values) to a UTF-16 column.
pub fn char_col_to_utf16(line: &str, char_col: u32) -> u32 {
    line.chars()
        .take(char_col as usize)
        .map(|c| c.len_utf16() as u32)
        .sum()
}

// ============================================================================
// Full-Text Conversions
// ============================================================================

/// Split text into lines, dropping `\n` and a preceding `\r`.
///
/// A trailing newline does not produce an extra empty line; use
/// [`ends_with_newline`] to preserve that fact.
pub fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split_inclusive('\n')
        .map(|l| {
            let l = l.strip_suffix('\n').unwrap_or(l);
            l.strip_suffix('\r').unwrap_or(l).to_string()
        })
        .collect()
}

/// Whether the text ends with a newline.
pub fn ends_with_newline(text: &str) -> bool {
    text.ends_with('\n')
}

/// Detect the line ending used by the text (defaults to `\n`).
pub fn detect_line_ending(text: &str) -> &'static str {
    if text.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

/// Convert a position to a byte offset into the full text.
///
/// Lines beyond the end resolve to the text length; columns beyond the end of
/// a line clamp to the end of that line (before the line terminator).
pub fn position_to_offset(text: &str, position: Position) -> usize {
    let mut line_start = 0usize;
    for _ in 0..position.line {
        match text[line_start..].find('\n') {
            Some(i) => line_start += i + 1,
            None => return text.len(),
        }
    }
    let line_end = text[line_start..]
        .find('\n')
        .map(|i| line_start + i)
        .unwrap_or(text.len());
    let mut line = &text[line_start..line_end];
    if let Some(stripped) = line.strip_suffix('\r') {
        line = stripped;
    }
    line_start + utf16_col_to_byte(line, position.character)
}

/// Convert a byte offset into the full text to a position.
pub fn offset_to_position(text: &str, offset: usize) -> Position {
    let offset = offset.min(text.len());
    let before = &text[..offset];
    let line = before.matches('\n').count() as u32;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    Position::new(line, utf16_len(&text[line_start..offset]))
}

/// Resolve a range to byte offsets `(start, end)` into the full text.
pub fn range_to_offsets(text: &str, range: &Range) -> (usize, usize) {
    let start = position_to_offset(text, range.start);
    let end = position_to_offset(text, range.end);
    (start, end.max(start))
}

/// Whether a position addresses an existing line of the text.
pub fn position_in_bounds(text: &str, position: Position) -> bool {
    let lines = line_count(text);
    position.line < lines || (position.line == lines && position.character == 0)
}

/// Count the number of lines in the content.
pub fn line_count(text: &str) -> u32 {
    let newlines = text.matches('\n').count() as u32;
    if text.is_empty() {
        0
    } else if text.ends_with('\n') {
        newlines
    } else {
        newlines + 1
    }
}

// ============================================================================
// Indentation
// ============================================================================

/// Leading whitespace of a line.
pub fn indentation(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

/// Minimum indentation width (in bytes) over the non-blank lines.
pub fn min_indentation(lines: &[&str]) -> usize {
    lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| indentation(l).len())
        .min()
        .unwrap_or(0)
}

/// Strip the common indentation from every line and prefix each non-blank
/// line with `indent`.
pub fn reindent(lines: &[&str], indent: &str) -> Vec<String> {
    let strip = min_indentation(lines);
    lines
        .iter()
        .map(|l| {
            if l.trim().is_empty() {
                String::new()
            } else {
                let cut = strip.min(indentation(l).len());
                format!("{}{}", indent, &l[cut..])
            }
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod column_tests {
        use super::*;

        #[test]
        fn ascii_columns_match_bytes() {
            let line = "foo(X) :- bar(X).";
            assert_eq!(byte_to_utf16_col(line, 4), 4);
            assert_eq!(utf16_col_to_byte(line, 4), 4);
            assert_eq!(utf16_len(line), 17);
        }

        #[test]
        fn multibyte_columns() {
            // 'é' is 2 bytes / 1 UTF-16 unit; '𝄞' is 4 bytes / 2 UTF-16 units
            let line = "é𝄞x";
            assert_eq!(utf16_len(line), 4);
            assert_eq!(byte_to_utf16_col(line, 2), 1);
            assert_eq!(byte_to_utf16_col(line, 6), 3);
            assert_eq!(utf16_col_to_byte(line, 1), 2);
            assert_eq!(utf16_col_to_byte(line, 3), 6);
            assert_eq!(utf16_col_to_byte(line, 99), line.len());
        }

        #[test]
        fn char_col_conversion() {
            assert_eq!(char_col_to_utf16("𝄞ab", 1), 2);
            assert_eq!(char_col_to_utf16("ab", 5), 2);
        }
    }

    mod full_text_tests {
        use super::*;

        #[test]
        fn split_lines_handles_crlf_and_trailing_newline() {
            assert_eq!(split_lines("a\r\nb\n"), vec!["a", "b"]);
            assert_eq!(split_lines("a\n\nb"), vec!["a", "", "b"]);
            assert!(split_lines("").is_empty());
        }

        #[test]
        fn position_offset_roundtrip() {
            let text = "line1\nline2\nline3\n";
            for offset in 0..text.len() {
                let pos = offset_to_position(text, offset);
                assert_eq!(position_to_offset(text, pos), offset, "offset {}", offset);
            }
        }

        #[test]
        fn position_beyond_text_clamps() {
            let text = "ab\ncd";
            assert_eq!(position_to_offset(text, Position::new(9, 0)), text.len());
            assert_eq!(position_to_offset(text, Position::new(0, 9)), 2);
        }

        #[test]
        fn line_count_tests() {
            assert_eq!(line_count(""), 0);
            assert_eq!(line_count("one"), 1);
            assert_eq!(line_count("one\n"), 1);
            assert_eq!(line_count("a\nb"), 2);
        }
    }

    mod indentation_tests {
        use super::*;

        #[test]
        fn reindent_strips_common_prefix() {
            let lines = ["\t\tfoo :-", "\t\t\tbar.", "", "\t\tbaz."];
            let out = reindent(&lines, "\t");
            assert_eq!(out, vec!["\tfoo :-", "\t\tbar.", "", "\tbaz."]);
        }

        #[test]
        fn min_indentation_ignores_blank_lines() {
            assert_eq!(min_indentation(&["    a", "", "  b"]), 2);
        }
    }
}
