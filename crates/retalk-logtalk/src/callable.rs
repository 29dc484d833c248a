//! Callable occurrences and positional argument rewriting.
//!
//! Every arity-changing refactoring funnels through [`rewrite_callables`]
//! and [`rewrite_indicators`]: the first rewrites `name(Args)` terms whose
//! argument count equals the pre-change arity, the second rewrites
//! `name/N` and `name//N` indicators. Occurrences with any other arity are
//! left untouched.

use crate::scanner::{self, is_ident_byte, CharClass};
use crate::syntax::{self, Indicator};

// ============================================================================
// Argument changes
// ============================================================================

/// A positional change to an argument (or parameter) list. Positions are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgChange {
    /// Insert a new argument so it ends up at `position`.
    Insert { position: usize },
    /// Remove the argument at `position`.
    Remove { position: usize },
    /// New order: element `k` of the result is old argument `permutation[k]`.
    Reorder { permutation: Vec<usize> },
}

impl ArgChange {
    /// Arity after the change.
    pub fn new_arity(&self, old: usize) -> usize {
        match self {
            ArgChange::Insert { .. } => old + 1,
            ArgChange::Remove { .. } => old.saturating_sub(1),
            ArgChange::Reorder { .. } => old,
        }
    }

    /// Whether the change leaves every list as it is.
    pub fn is_identity(&self) -> bool {
        match self {
            ArgChange::Reorder { permutation } => {
                permutation.iter().enumerate().all(|(k, p)| *p == k + 1)
            }
            _ => false,
        }
    }

    /// Check the change against the current arity.
    pub fn validate(&self, arity: usize) -> Result<(), String> {
        match self {
            ArgChange::Insert { position } if (1..=arity + 1).contains(position) => Ok(()),
            ArgChange::Insert { position } => Err(format!(
                "position {} is outside 1..{}",
                position,
                arity + 1
            )),
            ArgChange::Remove { position } if (1..=arity).contains(position) => Ok(()),
            ArgChange::Remove { position } => {
                Err(format!("position {} is outside 1..{}", position, arity))
            }
            ArgChange::Reorder { permutation } => {
                let mut seen = vec![false; arity];
                if permutation.len() != arity {
                    return Err(format!("expected {} positions", arity));
                }
                for p in permutation {
                    match p.checked_sub(1).and_then(|k| seen.get_mut(k)) {
                        Some(slot) if !*slot => *slot = true,
                        _ => return Err(format!("{} is not a valid position", p)),
                    }
                }
                Ok(())
            }
        }
    }

    /// Apply the change to a list, using `filler` for an inserted element.
    pub fn apply<T: Clone>(&self, items: &[T], filler: T) -> Vec<T> {
        let mut out = items.to_vec();
        match self {
            ArgChange::Insert { position } => {
                let at = position.saturating_sub(1).min(out.len());
                out.insert(at, filler);
            }
            ArgChange::Remove { position } => {
                if (1..=out.len()).contains(position) {
                    out.remove(position - 1);
                }
            }
            ArgChange::Reorder { permutation } => {
                if permutation.len() == items.len()
                    && permutation.iter().all(|p| (1..=items.len()).contains(p))
                {
                    out = permutation.iter().map(|p| items[p - 1].clone()).collect();
                }
            }
        }
        out
    }
}

/// Parse a permutation such as `3,1,2` or `3 1 2`.
pub fn parse_permutation(text: &str) -> Option<Vec<usize>> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().ok())
        .collect()
}

// ============================================================================
// Splicing
// ============================================================================

/// Replace byte spans of `text`. Spans must not overlap.
pub fn splice(text: &str, mut edits: Vec<(usize, usize, String)>) -> String {
    edits.sort_by_key(|e| (e.0, e.1));
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (s, e, new) in edits {
        if s < last {
            continue;
        }
        out.push_str(&text[last..s]);
        out.push_str(&new);
        last = e;
    }
    out.push_str(&text[last..]);
    out
}

/// Render a new element list into the slot of `spans`.
///
/// Same length keeps every original separator; otherwise the first
/// separator (or `", "`) is used throughout.
pub fn render_elements(text: &str, spans: &[(usize, usize)], items: &[String]) -> String {
    if items.len() == spans.len() {
        let mut out = String::new();
        for (k, item) in items.iter().enumerate() {
            if k > 0 {
                out.push_str(&text[spans[k - 1].1..spans[k].0]);
            }
            out.push_str(item);
        }
        return out;
    }
    let sep = match (spans.first(), spans.get(1)) {
        (Some(a), Some(b)) => &text[a.1..b.0],
        _ => ", ",
    };
    items.join(sep)
}

// ============================================================================
// Rewriting
// ============================================================================

/// What to rewrite and how.
#[derive(Debug, Clone, Copy)]
pub struct CallableRewrite<'a> {
    /// Callable name as written.
    pub name: &'a str,
    /// Pre-change arity; only occurrences with exactly this many arguments change.
    pub arity: usize,
    pub change: &'a ArgChange,
    /// Text of an inserted argument.
    pub filler: &'a str,
    /// Entity identifiers: a bare name before `::` is also an occurrence.
    pub entity: bool,
    pub receivers: Receivers<'a>,
}

/// Which occurrences belong to the symbol, judged by their `Obj::` prefix.
#[derive(Debug, Clone, Copy)]
pub enum Receivers<'a> {
    /// Every occurrence.
    Any,
    /// `Obj::name(...)` only when `Obj` is listed; unqualified or
    /// self-sent occurrences only when `local`.
    Only { entities: &'a [String], local: bool },
}

impl Receivers<'_> {
    /// Whether an occurrence with this qualifier is accepted.
    pub fn accepts(&self, qualifier: Option<Option<String>>) -> bool {
        match (self, qualifier) {
            (Receivers::Any, _) => true,
            (Receivers::Only { entities, .. }, Some(Some(q))) => entities.contains(&q),
            (Receivers::Only { local, .. }, _) => *local,
        }
    }
}

/// Rewrite every matching callable in `text`.
///
/// `mask`, when given, restricts rewriting to names at offsets where it is
/// `true`; arguments of a skipped callable are still scanned.
pub fn rewrite_callables(text: &str, spec: &CallableRewrite<'_>, mask: Option<&[bool]>) -> String {
    let classes = scanner::classify(text);
    let bytes = text.as_bytes();
    let name = spec.name.as_bytes();
    let mut out = String::with_capacity(text.len() + 16);
    let mut last = 0;
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i..].starts_with(name)
            || syntax::atom_end(text, &classes, i) != Some(i + name.len())
        {
            i += 1;
            continue;
        }
        let allowed = mask.is_none_or(|m| m.get(i).copied().unwrap_or(false))
            && spec.receivers.accepts(qualifier_before(text, &classes, i));
        let name_end = i + name.len();
        if bytes.get(name_end) == Some(&b'(') {
            let Some(close) = scanner::find_matching_close_in(text, &classes, name_end) else {
                i = name_end;
                continue;
            };
            let spans = scanner::split_top_level_spans(text, &classes, name_end + 1, close);
            if !allowed || spans.len() != spec.arity || spec.arity == 0 {
                i = name_end;
                continue;
            }
            let args: Vec<String> = spans
                .iter()
                .map(|(s, e)| rewrite_callables(&text[*s..*e], spec, mask.map(|m| &m[*s..*e])))
                .collect();
            let new_args = spec.change.apply(&args, spec.filler.to_string());
            out.push_str(&text[last..i]);
            out.push_str(spec.name);
            if !new_args.is_empty() {
                let (head, tail) = match (spans.first(), spans.last()) {
                    (Some(f), Some(l)) if new_args.len() == spans.len() => {
                        (&text[name_end + 1..f.0], &text[l.1..close])
                    }
                    _ => ("", ""),
                };
                out.push('(');
                out.push_str(head);
                out.push_str(&render_elements(text, &spans, &new_args));
                out.push_str(tail);
                out.push(')');
            }
            last = close + 1;
            i = close + 1;
            continue;
        }
        if spec.arity == 0 && allowed && is_bare_call(text, name_end, spec.entity) {
            let new_args = spec.change.apply(&[], spec.filler.to_string());
            out.push_str(&text[last..i]);
            out.push_str(spec.name);
            if !new_args.is_empty() {
                out.push('(');
                out.push_str(&new_args.join(", "));
                out.push(')');
            }
            last = name_end;
        }
        i = name_end;
    }
    out.push_str(&text[last..]);
    out
}

/// A bare name is a call unless it is part of an indicator or, for
/// predicates, the receiver of a message.
fn is_bare_call(text: &str, end: usize, entity: bool) -> bool {
    syntax::followed_by_indicator(text, end).is_none()
        && (entity || !text[end..].trim_start().starts_with("::"))
}

/// Rewrite the arity of matching `name/N` or `name//N` indicators.
pub fn rewrite_indicators(text: &str, indicator: &Indicator, new_arity: usize) -> String {
    let classes = scanner::classify(text);
    let mut edits = Vec::new();
    for start in syntax::name_occurrences(text, &classes, &indicator.name) {
        let end = start + indicator.name.len();
        if let Some((non_terminal, ds, de)) = syntax::followed_by_indicator(text, end) {
            let arity: Option<usize> = text[ds..de].parse().ok();
            if non_terminal == indicator.non_terminal && arity == Some(indicator.arity) {
                edits.push((ds, de, new_arity.to_string()));
            }
        }
    }
    splice(text, edits)
}

// ============================================================================
// Occurrences
// ============================================================================

/// How a symbol is mentioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionKind {
    /// `name/N` or `name//N`.
    Indicator,
    /// `name(Args)` or a bare `name`.
    Call,
}

/// One mention of a symbol in some text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub offset: usize,
    pub kind: MentionKind,
    /// Name of the entity in an `Obj::` prefix; `Some(None)` when the prefix is not an atom.
    pub qualifier: Option<Option<String>>,
}

/// Mentions of `indicator` in `text` with matching arity.
pub fn mentions(text: &str, indicator: &Indicator) -> Vec<Mention> {
    let classes = scanner::classify(text);
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    for start in syntax::name_occurrences(text, &classes, &indicator.name) {
        let end = start + indicator.name.len();
        let kind = if let Some((nt, ds, de)) = syntax::followed_by_indicator(text, end) {
            let arity: Option<usize> = text[ds..de].parse().ok();
            (nt == indicator.non_terminal && arity == Some(indicator.arity))
                .then_some(MentionKind::Indicator)
        } else if bytes.get(end) == Some(&b'(') {
            scanner::find_matching_close_in(text, &classes, end)
                .map(|close| scanner::split_top_level_spans(text, &classes, end + 1, close).len())
                .filter(|n| *n == indicator.arity && *n > 0)
                .map(|_| MentionKind::Call)
        } else {
            (indicator.arity == 0 && !text[end..].trim_start().starts_with("::"))
                .then_some(MentionKind::Call)
        };
        if let Some(kind) = kind {
            out.push(Mention {
                offset: start,
                kind,
                qualifier: qualifier_before(text, &classes, start),
            });
        }
    }
    out
}

/// Entity name of an `Obj::` or `Obj(...)::` prefix ending right before `at`.
pub fn qualifier_before(text: &str, classes: &[CharClass], at: usize) -> Option<Option<String>> {
    let bytes = text.as_bytes();
    let mut i = at;
    while i > 0 && bytes[i - 1].is_ascii_whitespace() {
        i -= 1;
    }
    if i < 2 || &bytes[i - 2..i] != b"::" {
        return None;
    }
    i -= 2;
    while i > 0 && bytes[i - 1].is_ascii_whitespace() {
        i -= 1;
    }
    if i == 0 {
        // `::Message` sends to self
        return Some(None);
    }
    if bytes[i - 1] == b')' && classes[i - 1] == CharClass::Code {
        let mut depth = 0i32;
        let mut j = i;
        while j > 0 {
            j -= 1;
            if classes[j] != CharClass::Code {
                continue;
            }
            match bytes[j] {
                b')' | b']' | b'}' => depth += 1,
                b'(' | b'[' | b'{' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
        }
        i = j;
    }
    let mut s = i;
    while s > 0 && is_ident_byte(bytes[s - 1]) && classes[s - 1] == CharClass::Code {
        s -= 1;
    }
    if s < i && syntax::is_atom(&text[s..i]) {
        Some(Some(text[s..i].to_string()))
    } else {
        Some(None)
    }
}
