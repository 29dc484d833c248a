//! Syntax helpers: indicators, entity identifiers, opening directives,
//! callables, tokens and variables.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::scanner::{self, is_ident_byte, CharClass};

// ============================================================================
// Entities
// ============================================================================

/// The three entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Object,
    Protocol,
    Category,
}

impl EntityKind {
    /// All kinds, in menu order.
    pub const ALL: [EntityKind; 3] = [EntityKind::Object, EntityKind::Protocol, EntityKind::Category];

    /// Opening directive keyword.
    pub fn keyword(&self) -> &'static str {
        match self {
            EntityKind::Object => "object",
            EntityKind::Protocol => "protocol",
            EntityKind::Category => "category",
        }
    }

    /// Parse an opening keyword.
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "object" => Some(EntityKind::Object),
            "protocol" => Some(EntityKind::Protocol),
            "category" => Some(EntityKind::Category),
            _ => None,
        }
    }

    /// Closing directive name (`end_object`, ...).
    pub fn end_directive(&self) -> String {
        format!("end_{}", self.keyword())
    }

    /// Relations valid in this kind's opening directive.
    pub fn valid_relations(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Object => &[
                "implements",
                "imports",
                "extends",
                "instantiates",
                "specializes",
            ],
            EntityKind::Protocol => &["extends"],
            EntityKind::Category => &["implements", "extends", "complements"],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// Entity name plus its (possibly empty) parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityIdentifier {
    pub name: String,
    pub parameters: Vec<String>,
}

impl EntityIdentifier {
    /// Parse `name` or `name(P1, P2)`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let classes = scanner::classify(text);
        let callable = parse_callable_at(text, &classes, 0)?;
        if callable.end != text.len() {
            return None;
        }
        Some(EntityIdentifier {
            name: callable.name.clone(),
            parameters: callable.arg_texts(text),
        })
    }

    /// Number of parameters.
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// Whether the entity is parametric.
    pub fn is_parametric(&self) -> bool {
        !self.parameters.is_empty()
    }
}

impl fmt::Display for EntityIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parameters.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}({})", self.name, self.parameters.join(", "))
        }
    }
}

/// One relation argument of an opening directive (`implements(p)`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub name: String,
    /// Argument text as written.
    pub argument: String,
    /// Span of the whole relation in the directive text.
    pub span: (usize, usize),
}

impl Relation {
    /// Entity names mentioned by the relation (list and conjunction forms included).
    pub fn targets(&self) -> Vec<String> {
        let inner = self.argument.trim();
        let inner = inner
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .or_else(|| inner.strip_prefix('(').and_then(|s| s.strip_suffix(')')))
            .unwrap_or(inner);
        scanner::split_top_level_arguments(inner)
            .into_iter()
            .map(|t| {
                // scope prefixes: public::p
                let t = t.rsplit("::").next().unwrap_or(&t).to_string();
                match EntityIdentifier::parse(&t) {
                    Some(id) => id.name,
                    None => t,
                }
            })
            .collect()
    }
}

/// A parsed entity opening directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityOpening {
    pub kind: EntityKind,
    pub identifier: EntityIdentifier,
    pub relations: Vec<Relation>,
    /// Byte offset of the keyword in the directive text.
    pub keyword_start: usize,
    /// Offsets of the keyword's `(` and `)`.
    pub open: usize,
    pub close: usize,
    /// Spans of all top-level arguments (identifier first).
    pub args: Vec<(usize, usize)>,
}

impl EntityOpening {
    /// Parse `:- object(Id, Relations...).`
    pub fn parse(directive: &str) -> Option<Self> {
        let classes = scanner::classify(directive);
        let trimmed = directive.trim_start();
        if !trimmed.starts_with(":-") {
            return None;
        }
        let start = directive.len() - trimmed.len() + 2;
        let keyword_start = start
            + directive[start..]
                .find(|c: char| !c.is_whitespace())?;
        let callable = parse_callable_at(directive, &classes, keyword_start)?;
        let kind = EntityKind::from_keyword(&callable.name)?;
        let (open, close) = (callable.open?, callable.close?);
        let first = *callable.args.first()?;
        let identifier = EntityIdentifier::parse(&directive[first.0..first.1])?;
        let mut relations = Vec::new();
        for span in callable.args.iter().skip(1) {
            let text = &directive[span.0..span.1];
            let rc = scanner::classify(text);
            if let Some(rel) = parse_callable_at(text, &rc, 0) {
                let argument = rel
                    .args
                    .first()
                    .map(|(s, e)| text[*s..*e].to_string())
                    .unwrap_or_default();
                relations.push(Relation {
                    name: rel.name,
                    argument,
                    span: *span,
                });
            }
        }
        Some(EntityOpening {
            kind,
            identifier,
            relations,
            keyword_start,
            open,
            close,
            args: callable.args,
        })
    }

    /// Separator used between arguments (", " when there is only one).
    pub fn separator<'a>(&self, directive: &'a str) -> &'a str {
        match (self.args.first(), self.args.get(1)) {
            (Some(a), Some(b)) => &directive[a.1..b.0],
            _ => ", ",
        }
    }

    /// Relation by name.
    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name == name)
    }
}

// ============================================================================
// Indicators
// ============================================================================

/// `Name/Arity` or `Name//Arity`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Indicator {
    /// Name as written (quoted if it needs quotes).
    pub name: String,
    pub arity: usize,
    /// `//` separator.
    pub non_terminal: bool,
}

impl Indicator {
    /// Create a predicate indicator.
    pub fn predicate(name: impl Into<String>, arity: usize) -> Self {
        Indicator {
            name: name.into(),
            arity,
            non_terminal: false,
        }
    }

    /// Create a non-terminal indicator.
    pub fn non_terminal(name: impl Into<String>, arity: usize) -> Self {
        Indicator {
            name: name.into(),
            arity,
            non_terminal: true,
        }
    }

    /// Parse `name/N` or `name//N`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let slash = text.rfind('/')?;
        let arity: usize = text[slash + 1..].trim().parse().ok()?;
        let (name, non_terminal) = match text[..slash].strip_suffix('/') {
            Some(rest) => (rest.trim(), true),
            None => (text[..slash].trim(), false),
        };
        if !is_atom(name) {
            return None;
        }
        Some(Indicator {
            name: name.to_string(),
            arity,
            non_terminal,
        })
    }

    /// `/` or `//`.
    pub fn separator(&self) -> &'static str {
        if self.non_terminal {
            "//"
        } else {
            "/"
        }
    }

    /// Same name and kind with a different arity.
    pub fn with_arity(&self, arity: usize) -> Self {
        Indicator {
            arity,
            ..self.clone()
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.name, self.separator(), self.arity)
    }
}

/// Whether the text is an atom (unquoted identifier or quoted atom).
pub fn is_atom(text: &str) -> bool {
    let b = text.as_bytes();
    match b.first() {
        Some(c) if c.is_ascii_lowercase() => b.iter().all(|c| is_ident_byte(*c)),
        Some(b'\'') => text.len() >= 2 && text.ends_with('\''),
        _ => false,
    }
}

/// Whether the text is a variable name.
pub fn is_variable(text: &str) -> bool {
    let b = text.as_bytes();
    match b.first() {
        Some(c) if c.is_ascii_uppercase() || *c == b'_' => b.iter().all(|c| is_ident_byte(*c)),
        _ => false,
    }
}

/// Quote an atom if it needs quotes.
pub fn quote_atom(name: &str) -> String {
    let b = name.as_bytes();
    let plain = b.first().is_some_and(|c| c.is_ascii_lowercase()) && b.iter().all(|c| is_ident_byte(*c));
    if plain || (name.starts_with('\'') && name.ends_with('\'') && name.len() >= 2) {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}

/// Parameter variable form `_Name_` of a user-supplied name.
pub fn parameter_variable(name: &str) -> String {
    let core = name.trim_matches('_');
    format!("_{}_", core)
}

/// Whether a variable is in parameter variable form.
pub fn is_parameter_variable(name: &str) -> bool {
    name.len() > 2 && name.starts_with('_') && name.ends_with('_') && is_variable(name)
}

/// `max_size` -> `MaxSize`.
pub fn camel_case(name: &str) -> String {
    name.trim_matches('\'')
        .split(|c: char| c == '_' || !c.is_ascii_alphanumeric())
        .filter(|p| !p.is_empty())
        .map(|p| {
            let mut cs = p.chars();
            match cs.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + cs.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

// ============================================================================
// Callables
// ============================================================================

/// A callable term `name` or `name(Args)` located in some text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callable {
    pub name: String,
    /// Offset of the name.
    pub start: usize,
    /// Offset just past the name.
    pub name_end: usize,
    /// Offsets of `(` and `)` when there are arguments.
    pub open: Option<usize>,
    pub close: Option<usize>,
    /// Trimmed argument spans.
    pub args: Vec<(usize, usize)>,
    /// Offset just past the callable.
    pub end: usize,
}

impl Callable {
    /// Number of arguments.
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Argument texts.
    pub fn arg_texts(&self, text: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|(s, e)| text[*s..*e].to_string())
            .collect()
    }

    /// Separator between the first two arguments, `", "` by default.
    pub fn separator<'a>(&self, text: &'a str) -> &'a str {
        match (self.args.first(), self.args.get(1)) {
            (Some(a), Some(b)) => &text[a.1..b.0],
            _ => ", ",
        }
    }
}

/// End of the atom token starting at `i` (unquoted or quoted), if any.
pub fn atom_end(text: &str, classes: &[CharClass], i: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let b = *bytes.get(i)?;
    if classes[i] == CharClass::Code && b.is_ascii_lowercase() {
        if i > 0 && classes[i - 1] == CharClass::Code && is_ident_byte(bytes[i - 1]) {
            return None;
        }
        let mut e = i + 1;
        while e < bytes.len() && is_ident_byte(bytes[e]) {
            e += 1;
        }
        return Some(e);
    }
    if b == b'\'' && classes[i] == CharClass::Quoted && (i == 0 || classes[i - 1] != CharClass::Quoted) {
        let mut e = i + 1;
        while e < bytes.len() && classes[e] == CharClass::Quoted {
            if bytes[e] == b'\'' && bytes.get(e + 1) != Some(&b'\'') && (e + 1 >= bytes.len() || classes[e + 1] != CharClass::Quoted) {
                return Some(e + 1);
            }
            e += 1;
        }
        return (e > i + 1 && bytes[e - 1] == b'\'').then_some(e);
    }
    None
}

/// Parse the callable whose name starts at `i`.
pub fn parse_callable_at(text: &str, classes: &[CharClass], i: usize) -> Option<Callable> {
    let name_end = atom_end(text, classes, i)?;
    let name = text[i..name_end].to_string();
    if text.as_bytes().get(name_end) == Some(&b'(') {
        let close = scanner::find_matching_close_in(text, classes, name_end)?;
        let args = scanner::split_top_level_spans(text, classes, name_end + 1, close);
        Some(Callable {
            name,
            start: i,
            name_end,
            open: Some(name_end),
            close: Some(close),
            args,
            end: close + 1,
        })
    } else {
        Some(Callable {
            name,
            start: i,
            name_end,
            open: None,
            close: None,
            args: Vec::new(),
            end: name_end,
        })
    }
}

/// Whether the bare atom ending at `name_end` is followed by `/N` or `//N`.
pub fn followed_by_indicator(text: &str, name_end: usize) -> Option<(bool, usize, usize)> {
    let rest = &text[name_end..];
    let trimmed = rest.trim_start();
    let offset = name_end + (rest.len() - trimmed.len());
    let (non_terminal, after) = if let Some(r) = trimmed.strip_prefix("//") {
        (true, r)
    } else if let Some(r) = trimmed.strip_prefix('/') {
        (false, r)
    } else {
        return None;
    };
    if after.starts_with('/') || after.starts_with('*') {
        return None;
    }
    let sep_len = if non_terminal { 2 } else { 1 };
    let after_trim = after.trim_start();
    let digits_start = offset + sep_len + (after.len() - after_trim.len());
    let digits = after_trim.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    Some((non_terminal, digits_start, digits_start + digits))
}

/// Offsets of whole-token occurrences of `name` in code (or as a quoted atom).
pub fn name_occurrences(text: &str, classes: &[CharClass], name: &str) -> Vec<usize> {
    let mut out = Vec::new();
    let mut from = 0;
    while let Some(rel) = text[from..].find(name) {
        let i = from + rel;
        from = i + name.len().max(1);
        if atom_end(text, classes, i) == Some(i + name.len()) {
            out.push(i);
        }
    }
    out
}

// ============================================================================
// Tokens and variables
// ============================================================================

/// Token kinds recognised under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Atom,
    Variable,
    Number,
}

/// A token under the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Token covering byte `at` (or ending at it).
pub fn token_at(text: &str, classes: &[CharClass], at: usize) -> Option<Token> {
    let bytes = text.as_bytes();
    if at > bytes.len() {
        return None;
    }
    let inside = |i: usize| i < bytes.len() && classes[i] == CharClass::Code && is_ident_byte(bytes[i]);
    let mut probe = at;
    if !inside(probe) {
        if probe > 0 && inside(probe - 1) {
            probe -= 1;
        } else if probe < bytes.len() && classes[probe] == CharClass::Quoted {
            // quoted atom under the cursor
            let mut s = probe;
            while s > 0 && classes[s - 1] == CharClass::Quoted {
                s -= 1;
            }
            let e = atom_end(text, classes, s)?;
            return Some(Token {
                kind: TokenKind::Atom,
                start: s,
                end: e,
                text: text[s..e].to_string(),
            });
        } else {
            return None;
        }
    }
    let mut s = probe;
    while s > 0 && inside(s - 1) {
        s -= 1;
    }
    let mut e = probe + 1;
    while inside(e) {
        e += 1;
    }
    let first = bytes[s];
    let kind = if first.is_ascii_digit() {
        // floats: 1.5, 2.0e3
        if bytes.get(e) == Some(&b'.') && bytes.get(e + 1).is_some_and(u8::is_ascii_digit) {
            e += 1;
            while e < bytes.len() && (bytes[e].is_ascii_alphanumeric()) {
                e += 1;
            }
        }
        TokenKind::Number
    } else if first.is_ascii_uppercase() || first == b'_' {
        TokenKind::Variable
    } else {
        TokenKind::Atom
    };
    // the fractional part of a float under the cursor
    if kind == TokenKind::Number && s >= 2 && bytes[s - 1] == b'.' && bytes[s - 2].is_ascii_digit() {
        let mut fs = s - 1;
        while fs > 0 && bytes[fs - 1].is_ascii_digit() {
            fs -= 1;
        }
        s = fs;
    }
    Some(Token {
        kind,
        start: s,
        end: e,
        text: text[s..e].to_string(),
    })
}

/// Offsets of whole-word occurrences of variable `name` in code.
pub fn variable_occurrences(text: &str, classes: &[CharClass], name: &str) -> Vec<usize> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut from = 0;
    while let Some(rel) = text[from..].find(name) {
        let i = from + rel;
        from = i + name.len().max(1);
        let end = i + name.len();
        let before_ok = i == 0 || !is_ident_byte(bytes[i - 1]);
        let after_ok = end >= bytes.len() || !is_ident_byte(bytes[end]);
        if before_ok && after_ok && classes[i] == CharClass::Code {
            out.push(i);
        }
    }
    out
}

/// Distinct variable names in code, in order of first occurrence.
pub fn variables(text: &str, classes: &[CharClass]) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut out: Vec<String> = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if classes[i] == CharClass::Code && is_ident_byte(b) {
            let s = i;
            while i < bytes.len() && is_ident_byte(bytes[i]) && classes[i] == CharClass::Code {
                i += 1;
            }
            let word = &text[s..i];
            if is_variable(word) && word != "_" && !out.iter().any(|v| v == word) {
                out.push(word.to_string());
            }
        } else {
            i += 1;
        }
    }
    out
}

/// Replace whole-word occurrences of variables according to `map`.
pub fn rename_variables(text: &str, map: &dyn Fn(&str) -> Option<String>) -> String {
    let classes = scanner::classify(text);
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut i = 0;
    while i < bytes.len() {
        if classes[i] == CharClass::Code && is_ident_byte(bytes[i]) {
            let s = i;
            while i < bytes.len() && is_ident_byte(bytes[i]) && classes[i] == CharClass::Code {
                i += 1;
            }
            let word = &text[s..i];
            if is_variable(word) {
                if let Some(new) = map(word) {
                    out.push_str(&text[last..s]);
                    out.push_str(&new);
                    last = i;
                }
            }
        } else {
            i += 1;
        }
    }
    out.push_str(&text[last..]);
    out
}
