//! Lexical scanner: quote/comment classification, bracket matching and
//! top-level argument splitting.
//!
//! Everything here works on byte offsets into `&str`. Structural characters
//! (brackets, commas, quotes, the clause terminator) are ASCII, so byte
//! scanning never splits a multi-byte character at a structural boundary.
//!
//! Quoted regions follow Logtalk lexing: `'atoms'`, `"strings"` and
//! `` `backquoted` `` text, with backslash escapes and doubled delimiters.
//! `0'c` character-code literals are not quote openers. `%` line comments
//! and `/* */` block comments are skipped.

/// Classification of one byte of source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// Plain code.
    Code,
    /// Inside a quoted atom, string, or character-code literal (delimiters included).
    Quoted,
    /// Inside a comment (delimiters included).
    Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    Quote(u8),
    CharCode,
    LineComment,
    BlockComment,
}

/// Incremental classifier; state carries over between chunks so a term can
/// be fed line by line.
#[derive(Debug, Clone)]
pub struct Classifier {
    state: State,
    prev: [u8; 2],
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    /// Start in plain code.
    pub fn new() -> Self {
        Classifier {
            state: State::Code,
            prev: [b' ', b' '],
        }
    }

    /// Whether the classifier is currently inside a quoted region or block comment.
    pub fn is_open(&self) -> bool {
        matches!(
            self.state,
            State::Quote(_) | State::BlockComment | State::CharCode
        )
    }

    /// Classify one chunk, continuing from the previous chunk's state.
    pub fn classify(&mut self, text: &str) -> Vec<CharClass> {
        let bytes = text.as_bytes();
        let mut out = vec![CharClass::Code; bytes.len()];
        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            let next = bytes.get(i + 1).copied();
            match self.state {
                State::Code => match b {
                    b'%' => {
                        self.state = State::LineComment;
                        out[i] = CharClass::Comment;
                    }
                    b'/' if next == Some(b'*') => {
                        self.state = State::BlockComment;
                        out[i] = CharClass::Comment;
                        out[i + 1] = CharClass::Comment;
                        self.push_prev(b);
                        self.push_prev(b'*');
                        i += 2;
                        continue;
                    }
                    b'\'' if self.prev[1] == b'0' && !is_ident_byte(self.prev[0]) => {
                        self.state = State::CharCode;
                        out[i] = CharClass::Quoted;
                    }
                    b'\'' | b'"' | b'`' => {
                        self.state = State::Quote(b);
                        out[i] = CharClass::Quoted;
                    }
                    _ => {}
                },
                State::Quote(q) => {
                    out[i] = CharClass::Quoted;
                    if b == b'\\' && next.is_some() {
                        out[i + 1] = CharClass::Quoted;
                        self.push_prev(b);
                        self.push_prev(bytes[i + 1]);
                        i += 2;
                        continue;
                    }
                    if b == q {
                        if next == Some(q) {
                            out[i + 1] = CharClass::Quoted;
                            self.push_prev(b);
                            self.push_prev(b);
                            i += 2;
                            continue;
                        }
                        self.state = State::Code;
                    }
                }
                State::CharCode => {
                    out[i] = CharClass::Quoted;
                    self.state = State::Code;
                    if (b == b'\\' || (b == b'\'' && next == Some(b'\''))) && next.is_some() {
                        out[i + 1] = CharClass::Quoted;
                        self.push_prev(b);
                        self.push_prev(bytes[i + 1]);
                        i += 2;
                        continue;
                    }
                }
                State::LineComment => {
                    if b == b'\n' {
                        self.state = State::Code;
                    } else {
                        out[i] = CharClass::Comment;
                    }
                }
                State::BlockComment => {
                    out[i] = CharClass::Comment;
                    if b == b'*' && next == Some(b'/') {
                        out[i + 1] = CharClass::Comment;
                        self.state = State::Code;
                        self.push_prev(b);
                        self.push_prev(b'/');
                        i += 2;
                        continue;
                    }
                }
            }
            self.push_prev(b);
            i += 1;
        }
        out
    }

    fn push_prev(&mut self, b: u8) {
        self.prev = [self.prev[1], b];
    }
}

/// Classify a complete text starting in plain code.
pub fn classify(text: &str) -> Vec<CharClass> {
    Classifier::new().classify(text)
}

// ============================================================================
// Character predicates
// ============================================================================

/// Letters, digits and underscore.
pub fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Characters that glue into symbolic atoms (`:-`, `=..`, `-->`).
pub fn is_symbol_byte(b: u8) -> bool {
    matches!(
        b,
        b'+' | b'-'
            | b'*'
            | b'/'
            | b'\\'
            | b'^'
            | b'<'
            | b'>'
            | b'='
            | b'~'
            | b':'
            | b'.'
            | b'?'
            | b'@'
            | b'#'
            | b'&'
            | b'$'
    )
}

fn closer_for(open: u8) -> Option<u8> {
    match open {
        b'(' => Some(b')'),
        b'[' => Some(b']'),
        b'{' => Some(b'}'),
        _ => None,
    }
}

fn is_open_bracket(b: u8) -> bool {
    matches!(b, b'(' | b'[' | b'{')
}

fn is_close_bracket(b: u8) -> bool {
    matches!(b, b')' | b']' | b'}')
}

/// Whether the `.` at `i` ends a term: code, followed by layout, `%` or end
/// of text, and not the tail of a symbolic atom or a float.
pub fn is_end_dot(text: &str, classes: &[CharClass], i: usize) -> bool {
    let bytes = text.as_bytes();
    if bytes.get(i) != Some(&b'.') || classes.get(i) != Some(&CharClass::Code) {
        return false;
    }
    let next_ok = match bytes.get(i + 1) {
        None => true,
        Some(b) => b.is_ascii_whitespace() || *b == b'%',
    };
    let prev_ok = i == 0 || classes[i - 1] != CharClass::Code || !is_symbol_byte(bytes[i - 1]);
    next_ok && prev_ok
}

// ============================================================================
// Bracket matching
// ============================================================================

/// Find the closer matching the bracket at `open_index`.
///
/// Nesting of all bracket kinds is tracked; quoted regions and comments are
/// ignored. Returns `None` if `open_index` is not an opening bracket or the
/// bracket is unterminated.
pub fn find_matching_close(text: &str, open_index: usize) -> Option<usize> {
    let classes = classify(text);
    find_matching_close_in(text, &classes, open_index)
}

/// [`find_matching_close`] with a precomputed classification.
pub fn find_matching_close_in(text: &str, classes: &[CharClass], open_index: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let open = *bytes.get(open_index)?;
    let close = closer_for(open)?;
    let mut depth = 0i32;
    for i in open_index..bytes.len() {
        if classes[i] != CharClass::Code {
            continue;
        }
        let b = bytes[i];
        if is_open_bracket(b) {
            depth += 1;
        } else if is_close_bracket(b) {
            depth -= 1;
            if depth == 0 {
                return (b == close).then_some(i);
            }
        }
    }
    None
}

/// Find the first code occurrence of `needle` at bracket depth 0 within
/// `start..end`.
pub fn find_top_level(text: &str, classes: &[CharClass], start: usize, end: usize, needle: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let n = needle.as_bytes();
    let mut depth = 0i32;
    let mut i = start;
    while i < end.min(bytes.len()) {
        if classes[i] == CharClass::Code {
            let b = bytes[i];
            if depth == 0 && bytes[i..].starts_with(n) && i + n.len() <= end {
                return Some(i);
            }
            if is_open_bracket(b) {
                depth += 1;
            } else if is_close_bracket(b) {
                depth -= 1;
            }
        }
        i += 1;
    }
    None
}

/// Byte mask of positions enclosed by a top-level `{ ... }` block.
pub fn brace_mask(text: &str, classes: &[CharClass]) -> Vec<bool> {
    let bytes = text.as_bytes();
    let mut mask = vec![false; bytes.len()];
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' && classes[i] == CharClass::Code {
            let end = find_matching_close_in(text, classes, i).unwrap_or(bytes.len() - 1);
            for m in mask.iter_mut().take(end + 1).skip(i) {
                *m = true;
            }
            i = end + 1;
        } else {
            i += 1;
        }
    }
    mask
}

// ============================================================================
// Argument splitting
// ============================================================================

/// Split `text[start..end]` on commas at depth 0, returning trimmed byte spans.
///
/// Empty input yields no spans. Unbalanced input is split best-effort.
pub fn split_top_level_spans(
    text: &str,
    classes: &[CharClass],
    start: usize,
    end: usize,
) -> Vec<(usize, usize)> {
    let bytes = text.as_bytes();
    let end = end.min(bytes.len());
    let mut spans = Vec::new();
    let mut depth = 0i32;
    let mut seg_start = start;
    for i in start..end {
        if classes[i] != CharClass::Code {
            continue;
        }
        let b = bytes[i];
        if is_open_bracket(b) {
            depth += 1;
        } else if is_close_bracket(b) {
            depth -= 1;
        } else if b == b',' && depth == 0 {
            spans.push(trim_span(text, classes, seg_start, i));
            seg_start = i + 1;
        }
    }
    let last = trim_span(text, classes, seg_start, end);
    if !spans.is_empty() || last.0 < last.1 {
        spans.push(last);
    }
    spans
}

/// Trim layout and comments from both ends of a span.
fn trim_span(text: &str, classes: &[CharClass], mut s: usize, mut e: usize) -> (usize, usize) {
    let bytes = text.as_bytes();
    while s < e && (bytes[s].is_ascii_whitespace() || classes[s] == CharClass::Comment) {
        s += 1;
    }
    while e > s && (bytes[e - 1].is_ascii_whitespace() || classes[e - 1] == CharClass::Comment) {
        e -= 1;
    }
    (s, e)
}

/// Split on top-level commas outside quotes, trimming each element.
///
/// `"a, b(c,d), 'e,f'"` yields `["a", "b(c,d)", "'e,f'"]`.
pub fn split_top_level_arguments(text: &str) -> Vec<String> {
    let classes = classify(text);
    split_top_level_spans(text, &classes, 0, text.len())
        .into_iter()
        .map(|(s, e)| text[s..e].to_string())
        .collect()
}

/// Code part of a single line (comment stripped, right-trimmed).
pub fn strip_line_comment(line: &str) -> &str {
    let classes = classify(line);
    let end = classes
        .iter()
        .position(|c| *c == CharClass::Comment)
        .unwrap_or(line.len());
    line[..end].trim_end()
}

/// Whether a line holds nothing but layout and comments.
pub fn is_blank_or_comment(line: &str) -> bool {
    let t = line.trim_start();
    t.is_empty() || t.starts_with('%') || t.starts_with("/*") || t.starts_with('*')
}
