//! Symbol under the cursor.
//!
//! Works on the enclosing term only: a token is classified as an entity
//! (opening directive identifier, relation argument, `Obj::` receiver) or
//! as a predicate/non-terminal indicator derived from how it is written.

use retalk_core::document::Document;
use retalk_core::text::utf16_col_to_byte;
use retalk_core::types::Position;

use crate::boundary::{self, TermRange};
use crate::callable;
use crate::directives;
use crate::scanner::{self, CharClass};
use crate::syntax::{self, EntityOpening, Indicator, TokenKind};

/// What the cursor points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    /// A predicate or non-terminal.
    Predicate(Indicator),
    /// An entity name with the number of parameters it was written with.
    Entity { name: String, arity: usize },
}

/// A symbol plus where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolAt {
    pub symbol: Symbol,
    /// Enclosing term.
    pub term: TermRange,
    /// Byte offset of the token in the `\n`-joined term text.
    pub offset: usize,
    /// Entity qualifier written before the token (`Obj::name`).
    pub qualifier: Option<String>,
}

/// The term text containing `position` and the byte offset of the position in it.
pub fn term_text_at(doc: &dyn Document, position: Position) -> Option<(TermRange, String, usize)> {
    let line = position.line as usize;
    let term = boundary::enclosing_term(doc, line)?;
    let text = doc.lines_text(term.start, term.end);
    let before: usize = (term.start..line).map(|n| doc.line(n).len() + 1).sum();
    let offset = before + utf16_col_to_byte(doc.line(line), position.character);
    Some((term, text, offset))
}

/// Convert a byte offset of a `\n`-joined term text back to a position.
pub fn offset_position(doc: &dyn Document, term_start: usize, text: &str, offset: usize) -> Position {
    let prefix = &text[..offset.min(text.len())];
    let line = term_start + prefix.matches('\n').count();
    let col = prefix.rfind('\n').map_or(offset, |i| offset - i - 1);
    doc.position_at(line, col)
}

/// Resolve the symbol at `position`.
pub fn symbol_at(doc: &dyn Document, position: Position) -> Option<SymbolAt> {
    let (term, text, offset) = term_text_at(doc, position)?;
    let classes = scanner::classify(&text);
    let token = syntax::token_at(&text, &classes, offset)?;
    if token.kind != TokenKind::Atom {
        return None;
    }
    let callable = syntax::parse_callable_at(&text, &classes, token.start)?;
    let qualifier = callable::qualifier_before(&text, &classes, token.start).flatten();
    let at = |symbol| {
        Some(SymbolAt {
            symbol,
            term,
            offset: token.start,
            qualifier: qualifier.clone(),
        })
    };

    if let Some(opening) = EntityOpening::parse(&text) {
        if let Some(symbol) = entity_in_opening(&opening, &callable, token.start) {
            return at(symbol);
        }
        return None;
    }
    if text[callable.end..].trim_start().starts_with("::") {
        return at(Symbol::Entity {
            name: callable.name.clone(),
            arity: callable.arity(),
        });
    }

    let is_directive = boundary::is_directive_start(&text);
    if is_directive && directives::body_start(&text) == Some(token.start) {
        return None;
    }
    if let Some((non_terminal, ds, de)) = syntax::followed_by_indicator(&text, token.end) {
        let arity = text[ds..de].parse().ok()?;
        return at(Symbol::Predicate(Indicator {
            name: callable.name,
            arity,
            non_terminal,
        }));
    }
    let non_terminal = if is_directive {
        directives::directive_name(&text).as_deref() == Some("meta_non_terminal")
    } else {
        in_grammar_body_or_head(&text, &classes, token.start)
    };
    at(Symbol::Predicate(Indicator {
        name: callable.name.clone(),
        arity: callable.arity(),
        non_terminal,
    }))
}

fn entity_in_opening(opening: &EntityOpening, callable: &syntax::Callable, start: usize) -> Option<Symbol> {
    let first = opening.args.first()?;
    if start == first.0 {
        return Some(Symbol::Entity {
            name: opening.identifier.name.clone(),
            arity: opening.identifier.arity(),
        });
    }
    let inside_relation = opening
        .relations
        .iter()
        .any(|r| r.span.0 < start && start < r.span.1);
    inside_relation.then(|| Symbol::Entity {
        name: callable.name.clone(),
        arity: callable.arity(),
    })
}

/// Outside `{}` in a grammar rule, callables are non-terminals.
fn in_grammar_body_or_head(text: &str, classes: &[CharClass], at: usize) -> bool {
    if scanner::find_top_level(text, classes, 0, text.len(), "-->").is_none() {
        return false;
    }
    let braces = scanner::brace_mask(text, classes);
    !braces.get(at).copied().unwrap_or(false)
}
