//! Replace a numeric literal in a rule body with a named constant fact.

use retalk_core::text::indentation;
use tracing::debug;

use crate::action::NumberTarget;
use crate::boundary::ClauseKind;
use crate::callable::splice;
use crate::engine::EditBuilder;
use crate::error::{RefactorError, RefactorResult};
use crate::ops::{clause_at, goal_prefix, term_offset, ClauseText};
use crate::syntax::{self, TokenKind};

/// Number token under `offset`, which must lie in the clause body.
fn number_at(clause: &ClauseText, offset: usize) -> RefactorResult<(usize, usize)> {
    let token = syntax::token_at(&clause.text, &clause.classes, offset)
        .filter(|t| t.kind == TokenKind::Number)
        .ok_or_else(|| RefactorError::not_applicable("no number at the cursor"))?;
    if !clause.in_body(token.start) {
        return Err(RefactorError::not_applicable("the number is not in a rule body"));
    }
    Ok((token.start, token.end))
}

/// The constant fact, a blank line and the rewritten clause.
fn replace_in_clause(clause: &ClauseText, number: (usize, usize), name: &str, variable: &str) -> RefactorResult<String> {
    let text = &clause.text;
    if syntax::variables(text, &clause.classes).iter().any(|v| v == variable) {
        return Err(RefactorError::precondition(format!("{} already occurs in the clause", variable)));
    }
    let goals = clause.goals();
    let first = goals
        .first()
        .ok_or_else(|| RefactorError::not_applicable("the clause has no body"))?;
    let call = match clause.kind {
        ClauseKind::GrammarRule => format!("{{{}({})}}", name, variable),
        _ => format!("{}({})", name, variable),
    };
    let rewritten = splice(
        text,
        vec![
            (first.0, first.0, goal_prefix(text, &goals, 0, &call)),
            (number.0, number.1, variable.to_string()),
        ],
    );
    let indent = indentation(text);
    Ok(format!("{}{}({}).\n\n{}", indent, name, &text[number.0..number.1], rewritten))
}

pub(crate) fn replace_magic_number(b: &mut EditBuilder<'_>, target: &NumberTarget) -> RefactorResult<()> {
    let doc = b.document(&target.uri)?;
    let clause = clause_at(doc.as_ref(), target.position.line as usize)?;
    let offset = term_offset(doc.as_ref(), &clause.term, target.position);
    let number = number_at(&clause, offset)?;

    let name = b.ask_atom(&format!("Name of the predicate holding {}", target.number), None)?;
    let suggested = syntax::camel_case(&name);
    let default = if syntax::is_variable(&suggested) { suggested } else { "Value".to_string() };
    let variable = b.ask_variable("Name of the variable", Some(&default))?;
    let new = replace_in_clause(&clause, number, &name, variable.trim())?;
    b.rewrite_term(&doc, clause.term, |_| new);
    debug!(number = %target.number, predicate = %name, "magic number replaced");
    Ok(())
}
