//! Refactoring detection.
//!
//! Given a cursor or a selection, decide which refactorings apply. Detection
//! never fails: anything that does not match a known shape yields no action.

use retalk_core::document::Document;
use retalk_core::types::{Position, Range};

use crate::action::{
    ConvertTarget, DirectiveTarget, EntityTarget, NumberTarget, PredicateTarget, RefactorAction, SelectionTarget,
    VariableTarget,
};
use crate::boundary::{self, TermRange};
use crate::directives;
use crate::ops::extract::is_complete_selection;
use crate::ops::include::include_path;
use crate::ops::list_directive::ListDirective;
use crate::ops::variables::{binding_goal, selects_body_term, split_numbered};
use crate::ops::clause_at;
use crate::scanner;
use crate::symbol::{self, Symbol};
use crate::syntax::{self, EntityKind, EntityOpening, TokenKind};

/// Actions applicable at `range` of `doc`.
pub fn detect(doc: &dyn Document, range: Range) -> Vec<RefactorAction> {
    if range.is_empty() {
        detect_at_point(doc, range.start)
    } else {
        detect_in_selection(doc, range)
    }
}

fn detect_in_selection(doc: &dyn Document, range: Range) -> Vec<RefactorAction> {
    let target = SelectionTarget {
        uri: doc.uri().to_string(),
        range,
    };
    if is_complete_selection(doc, &range) {
        return vec![
            RefactorAction::ExtractToEntity(target.clone()),
            RefactorAction::ExtractToNewEntity(target.clone()),
            RefactorAction::ExtractToNewFile(target.clone()),
            RefactorAction::ReplaceWithInclude(target),
        ];
    }
    if selects_body_term(doc, &range) {
        return vec![RefactorAction::UnifyWithNewVariable(target)];
    }
    Vec::new()
}

fn detect_at_point(doc: &dyn Document, position: Position) -> Vec<RefactorAction> {
    let Some((term, text, offset)) = symbol::term_text_at(doc, position) else {
        return Vec::new();
    };
    if let Some(opening) = EntityOpening::parse(&text) {
        return entity_actions(doc, term, &text, &opening);
    }
    let mut actions = Vec::new();
    if boundary::is_directive_start(&text) && term.is_complete() {
        actions.extend(directive_actions(doc, term, &text));
    }
    let classes = scanner::classify(&text);
    let Some(token) = syntax::token_at(&text, &classes, offset) else {
        return actions;
    };
    match token.kind {
        TokenKind::Variable if token.text != "_" => actions.extend(variable_actions(doc, position, &token.text)),
        TokenKind::Number => actions.extend(number_action(doc, term, &text, token.start, &token.text)),
        TokenKind::Atom => actions.extend(predicate_actions(doc, position)),
        _ => {}
    }
    actions
}

fn entity_actions(doc: &dyn Document, term: TermRange, text: &str, opening: &EntityOpening) -> Vec<RefactorAction> {
    let Some(identifier) = opening.args.first() else {
        return Vec::new();
    };
    let position = symbol::offset_position(doc, term.start, text, identifier.0);
    let arity = opening.identifier.arity();
    let target = EntityTarget {
        uri: doc.uri().to_string(),
        position,
        kind: opening.kind,
        entity: opening.identifier.clone(),
    };
    let mut actions = vec![RefactorAction::AddParameter(target.clone())];
    if arity > 0 {
        actions.push(RefactorAction::RemoveParameter(target.clone()));
    }
    if arity > 1 {
        actions.push(RefactorAction::ReorderParameters(target.clone()));
    }
    if opening.kind != EntityKind::Protocol {
        actions.push(RefactorAction::ExtractProtocol(target));
    }
    for to in EntityKind::ALL {
        if to == opening.kind || (to == EntityKind::Protocol && opening.identifier.is_parametric()) {
            continue;
        }
        actions.push(RefactorAction::ConvertEntity(ConvertTarget {
            uri: doc.uri().to_string(),
            position,
            from: opening.kind,
            to,
        }));
    }
    actions
}

fn directive_actions(doc: &dyn Document, term: TermRange, text: &str) -> Vec<RefactorAction> {
    let Some(name) = directives::directive_name(text) else {
        return Vec::new();
    };
    let target = DirectiveTarget {
        uri: doc.uri().to_string(),
        line: term.start as u32,
        directive: name,
    };
    if include_path(text).is_some() {
        return vec![RefactorAction::IncludeFileContents(target)];
    }
    let classes = scanner::classify(text);
    match ListDirective::parse(text, &classes) {
        Some(list) if list.elements.len() > 1 => vec![
            RefactorAction::SplitListDirective(target.clone()),
            RefactorAction::SortListDirective(target),
        ],
        _ => Vec::new(),
    }
}

fn variable_actions(doc: &dyn Document, position: Position, variable: &str) -> Vec<RefactorAction> {
    let target = VariableTarget {
        uri: doc.uri().to_string(),
        position,
        variable: variable.to_string(),
    };
    let mut actions = Vec::new();
    if clause_at(doc, position.line as usize).is_ok_and(|c| binding_goal(&c, variable).is_some()) {
        actions.push(RefactorAction::InlineVariable(target.clone()));
    }
    if let Some((_, n)) = split_numbered(variable) {
        actions.push(RefactorAction::IncrementNumberedVariables(target.clone()));
        if n > 0 {
            actions.push(RefactorAction::DecrementNumberedVariables(target));
        }
    }
    actions
}

fn number_action(doc: &dyn Document, term: TermRange, text: &str, start: usize, number: &str) -> Option<RefactorAction> {
    let clause = clause_at(doc, term.start).ok()?;
    clause.in_body(start).then(|| {
        RefactorAction::ReplaceMagicNumber(NumberTarget {
            uri: doc.uri().to_string(),
            position: symbol::offset_position(doc, term.start, text, start),
            number: number.to_string(),
        })
    })
}

fn predicate_actions(doc: &dyn Document, position: Position) -> Vec<RefactorAction> {
    let Some(found) = symbol::symbol_at(doc, position) else {
        return Vec::new();
    };
    let Symbol::Predicate(indicator) = found.symbol else {
        return Vec::new();
    };
    let text = doc.lines_text(found.term.start, found.term.end);
    let target = PredicateTarget {
        uri: doc.uri().to_string(),
        position: symbol::offset_position(doc, found.term.start, &text, found.offset),
        indicator,
    };
    let arity = target.indicator.arity;
    let mut actions = vec![RefactorAction::AddArgument(target.clone())];
    if arity > 0 {
        actions.push(RefactorAction::RemoveArgument(target.clone()));
    }
    if arity > 1 {
        actions.push(RefactorAction::ReorderArguments(target));
    }
    actions
}
