//! Convert an entity between object, protocol and category.

use retalk_core::document::Document;
use tracing::debug;

use crate::action::ConvertTarget;
use crate::boundary;
use crate::callable::splice;
use crate::engine::EditBuilder;
use crate::error::{RefactorError, RefactorResult};
use crate::syntax::{EntityKind, EntityOpening};

/// Relation name to use after converting `from` into `to`; `None` drops it.
pub(crate) fn map_relation(from: EntityKind, to: EntityKind, name: &str) -> Option<&'static str> {
    use EntityKind::*;
    match (from, to, name) {
        (_, Protocol, "implements") => Some("extends"),
        (_, Protocol, _) => None,
        (Protocol, _, "extends") => Some("implements"),
        (Category, Object, "extends") => Some("imports"),
        (Object, Category, "imports") => Some("extends"),
        (_, _, "implements") => Some("implements"),
        _ => None,
    }
}

/// Rewritten opening directive and the relations that were dropped.
pub(crate) fn convert_opening(text: &str, to: EntityKind) -> Option<(String, Vec<String>)> {
    let opening = EntityOpening::parse(text)?;
    let from = opening.kind;
    let mut edits = vec![(
        opening.keyword_start,
        opening.keyword_start + from.keyword().len(),
        to.keyword().to_string(),
    )];
    let mut dropped = Vec::new();
    for rel in &opening.relations {
        let k = opening.args.iter().position(|a| *a == rel.span)?;
        match map_relation(from, to, &rel.name) {
            Some(name) if name == rel.name => {}
            Some(name) => edits.push((rel.span.0, rel.span.0 + rel.name.len(), name.to_string())),
            None => {
                edits.push((opening.args[k - 1].1, rel.span.1, String::new()));
                dropped.push(text[rel.span.0..rel.span.1].to_string());
            }
        }
    }
    Some((splice(text, edits), dropped))
}

pub(crate) fn convert_entity(b: &mut EditBuilder<'_>, target: &ConvertTarget) -> RefactorResult<()> {
    if target.from == target.to {
        return Err(RefactorError::not_applicable(format!("the entity is already a {}", target.to)));
    }
    let doc = b.document(&target.uri)?;
    let entity = boundary::entity_opening_at(doc.as_ref(), target.position.line as usize)
        .ok_or_else(|| RefactorError::not_applicable("no entity opening directive at the cursor"))?;
    let Some(end_line) = entity.end_line else {
        return Err(RefactorError::precondition(format!(
            "missing {} directive",
            entity.kind.end_directive()
        )));
    };
    if entity.kind != target.from {
        return Err(RefactorError::precondition(format!("the entity is a {}", entity.kind)));
    }
    let text = doc.lines_text(entity.opening.start, entity.opening.end);
    if target.to == EntityKind::Protocol {
        let opening = EntityOpening::parse(&text)
            .ok_or_else(|| RefactorError::precondition("cannot parse the entity opening directive"))?;
        if opening.identifier.is_parametric() {
            return Err(RefactorError::precondition("protocols cannot be parametric"));
        }
        let has_clauses = boundary::terms_in(doc.as_ref(), entity.body_lines(doc.as_ref()))
            .iter()
            .any(|t| !boundary::is_directive_start(doc.line(t.start)));
        if has_clauses {
            return Err(RefactorError::precondition("protocols cannot contain clauses"));
        }
    }

    let (new_opening, dropped) = convert_opening(&text, target.to)
        .ok_or_else(|| RefactorError::precondition("cannot parse the entity opening directive"))?;
    for relation in dropped {
        b.warn(format!("{} is not valid for a {} and was removed", relation, target.to));
    }
    b.rewrite_term(&doc, entity.opening, |_| new_opening);

    let end = doc.line(end_line);
    let new_end = end.replacen(&target.from.end_directive(), &target.to.end_directive(), 1);
    b.replace_lines(&doc, end_line, end_line, &new_end);
    debug!(from = %target.from, to = %target.to, "entity converted");
    Ok(())
}
