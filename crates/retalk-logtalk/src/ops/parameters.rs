//! Add, remove and reorder entity parameters.
//!
//! The identifier in the opening directive gets the change with a `_Name_`
//! parameter variable, the entity `info/1` directive gets its `parnames`
//! or `parameters` list updated, and every `Entity(...)` reference found
//! by the locator is rewritten within its own term.

use retalk_core::document::{Document, TextDocument};
use tracing::debug;

use crate::action::EntityTarget;
use crate::boundary::{self, EntityRange};
use crate::callable::{self, ArgChange, CallableRewrite, Receivers};
use crate::directives::{self, InfoRewrite, ListKey};
use crate::engine::EditBuilder;
use crate::error::{RefactorError, RefactorResult};
use crate::locator;
use crate::scanner;
use crate::syntax::{self, EntityOpening};

pub(crate) fn add_parameter(b: &mut EditBuilder<'_>, target: &EntityTarget) -> RefactorResult<()> {
    let arity = target.entity.arity();
    let name = b.ask_variable(&format!("Name of the new parameter of {}", target.entity.name), None)?;
    let name = name.trim_matches('_').to_string();
    if name.is_empty() || !syntax::is_variable(&name) {
        return Err(RefactorError::precondition("parameter names must start with an uppercase letter"));
    }
    let position = b.ask_position(
        &format!("Position of {} (1-{})", name, arity + 1),
        arity + 1,
        arity + 1,
    )?;
    rewrite_entity(b, target, &ArgChange::Insert { position }, &name)
}

pub(crate) fn remove_parameter(b: &mut EditBuilder<'_>, target: &EntityTarget) -> RefactorResult<()> {
    let arity = target.entity.arity();
    if arity == 0 {
        return Err(RefactorError::not_applicable(format!("{} has no parameters", target.entity.name)));
    }
    let position = if arity == 1 {
        1
    } else {
        b.ask_position(
            &format!("Parameter of {} to remove (1-{})", target.entity.name, arity),
            arity,
            arity,
        )?
    };
    rewrite_entity(b, target, &ArgChange::Remove { position }, "")
}

/// Fewer than two parameters is a no-op; two parameters are swapped without asking.
pub(crate) fn reorder_parameters(b: &mut EditBuilder<'_>, target: &EntityTarget) -> RefactorResult<()> {
    let arity = target.entity.arity();
    if arity < 2 {
        debug!(entity = %target.entity.name, arity, "nothing to reorder");
        return Ok(());
    }
    let permutation = if arity == 2 {
        vec![2, 1]
    } else {
        b.ask_permutation(&format!("New order of the parameters of {}", target.entity.name), arity)?
    };
    let change = ArgChange::Reorder { permutation };
    if change.is_identity() {
        return Ok(());
    }
    rewrite_entity(b, target, &change, "")
}

fn rewrite_entity(b: &mut EditBuilder<'_>, target: &EntityTarget, change: &ArgChange, name: &str) -> RefactorResult<()> {
    let arity = target.entity.arity();
    change.validate(arity).map_err(RefactorError::precondition)?;
    let doc = b.document(&target.uri)?;
    let line = target.position.line as usize;
    let entity = boundary::entity_opening_at(doc.as_ref(), line)
        .ok_or_else(|| RefactorError::not_applicable("no entity opening directive at the cursor"))?;
    if !entity.opening.is_complete() {
        return Err(RefactorError::precondition("the entity opening directive is not terminated"));
    }

    let variable = syntax::parameter_variable(name);
    let opening = CallableRewrite {
        name: &target.entity.name,
        arity,
        change,
        filler: &variable,
        entity: true,
        receivers: Receivers::Any,
    };
    let opening_text = doc.lines_text(entity.opening.start, entity.opening.end);
    let new_opening = rewrite_identifier(&opening_text, &opening)
        .ok_or_else(|| RefactorError::precondition("cannot parse the entity identifier"))?;
    b.rewrite_term(&doc, entity.opening, |_| new_opening);

    rewrite_entity_info(b, &doc, &entity, change, arity, name);
    if let ArgChange::Remove { position } = change {
        if let Some(parameter) = target.entity.parameters.get(position - 1) {
            warn_if_still_used(b, &doc, &entity, parameter);
        }
    }

    let references = CallableRewrite {
        name: &target.entity.name,
        arity,
        change,
        filler: "_",
        entity: true,
        receivers: Receivers::Any,
    };
    let locations = locator::locate(b.host, b.symbols, b.cancel, doc.as_ref(), target.position)?;
    debug!(entity = %target.entity.name, count = locations.len(), "entity references");
    for tagged in locations {
        let doc = b.document(&tagged.location.uri)?;
        let Some(term) = boundary::enclosing_term(doc.as_ref(), tagged.location.range.start.line as usize) else {
            continue;
        };
        if !term.is_complete() {
            continue;
        }
        b.rewrite_term(&doc, term, |text| callable::rewrite_callables(text, &references, None));
    }
    Ok(())
}

/// Apply the change to the identifier argument of an opening directive only.
fn rewrite_identifier(text: &str, rewrite: &CallableRewrite<'_>) -> Option<String> {
    let opening = EntityOpening::parse(text)?;
    let (s, e) = *opening.args.first()?;
    let new = callable::rewrite_callables(&text[s..e], rewrite, None);
    Some(callable::splice(text, vec![(s, e, new)]))
}

/// `parnames` and `parameters` of the entity `info/1` directive.
fn rewrite_entity_info(
    b: &mut EditBuilder<'_>,
    doc: &TextDocument,
    entity: &EntityRange,
    change: &ArgChange,
    arity: usize,
    name: &str,
) {
    let info = boundary::terms_in(doc, entity.body_lines(doc)).into_iter().find(|term| {
        let text = doc.lines_text(term.start, term.end);
        let classes = scanner::classify(&text);
        term.is_complete()
            && directives::directive_call(&text, &classes).is_some_and(|c| c.name == "info" && c.arity() == 1)
    });
    let Some(info) = info else {
        return;
    };
    let quoted = format!("'{}'", name);
    let synthesize = match change {
        ArgChange::Insert { .. } if arity == 0 => Some(("parnames", format!("[{}]", quoted))),
        _ => None,
    };
    let keep = |value: &str| value.to_string();
    b.rewrite_term(doc, info, |text| {
        let Some((open, close)) = directives::info_list(text) else {
            return text.to_string();
        };
        let rw = InfoRewrite {
            change,
            keys: vec![
                ListKey {
                    key: "parnames",
                    filler: quoted.clone(),
                },
                ListKey {
                    key: "parameters",
                    filler: format!("{} - ''", quoted),
                },
            ],
            rewrite_keys: &[],
            entry_rewrite: &keep,
            synthesize,
        };
        directives::rewrite_info_list(text, open, close, &rw)
    });
}

fn warn_if_still_used(b: &mut EditBuilder<'_>, doc: &TextDocument, entity: &EntityRange, parameter: &str) {
    let parameter = parameter.trim();
    if !syntax::is_parameter_variable(parameter) {
        return;
    }
    let used = boundary::terms_in(doc, entity.body_lines(doc)).iter().any(|term| {
        let text = doc.lines_text(term.start, term.end);
        let classes = scanner::classify(&text);
        !syntax::variable_occurrences(&text, &classes, parameter).is_empty()
    });
    if used {
        b.warn(format!("parameter variable {} is still used in the entity body", parameter));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identifier(text: &str, name: &str, arity: usize, change: ArgChange, filler: &str) -> Option<String> {
        let rw = CallableRewrite {
            name,
            arity,
            change: &change,
            filler,
            entity: true,
            receivers: Receivers::Any,
        };
        rewrite_identifier(text, &rw)
    }

    #[test]
    fn identifier_only_in_opening_directive() {
        let out = identifier(
            ":- object(stack(_T_),\n\textends(stack(_T_))).",
            "stack",
            1,
            ArgChange::Insert { position: 2 },
            "_Size_",
        );
        assert_eq!(out.as_deref(), Some(":- object(stack(_T_, _Size_),\n\textends(stack(_T_)))."));
    }

    #[test]
    fn first_parameter_gains_parentheses() {
        let out = identifier(":- object(stack).", "stack", 0, ArgChange::Insert { position: 1 }, "_T_");
        assert_eq!(out.as_deref(), Some(":- object(stack(_T_))."));
    }

    #[test]
    fn last_parameter_removed() {
        let out = identifier(
            ":- category(cache(_K_), implements(p)).",
            "cache",
            1,
            ArgChange::Remove { position: 1 },
            "",
        );
        assert_eq!(out.as_deref(), Some(":- category(cache, implements(p))."));
    }
}
