//! Clause-local variable refactorings: inline, introduce and renumber.

use retalk_core::document::Document;
use retalk_core::types::Range;
use tracing::debug;

use crate::action::{SelectionTarget, VariableTarget};
use crate::boundary;
use crate::callable::splice;
use crate::engine::EditBuilder;
use crate::error::{RefactorError, RefactorResult};
use crate::ops::{clause_at, goal_prefix, needs_parens, term_offset, ClauseText};
use crate::scanner::{self, CharClass};
use crate::syntax;

// ============================================================================
// Unification goals
// ============================================================================

/// Sides of a top-level `Left = Right` goal.
pub(crate) fn unification(text: &str, classes: &[CharClass], span: (usize, usize)) -> Option<((usize, usize), (usize, usize))> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    for i in span.0..span.1 {
        if classes[i] != CharClass::Code {
            continue;
        }
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'=' if depth == 0 => {
                let before = i > span.0 && scanner::is_symbol_byte(bytes[i - 1]);
                let after = i + 1 < span.1 && scanner::is_symbol_byte(bytes[i + 1]);
                if before || after {
                    return None;
                }
                let left = trim(text, span.0, i);
                let right = trim(text, i + 1, span.1);
                return (left.0 < left.1 && right.0 < right.1).then_some((left, right));
            }
            _ => {}
        }
    }
    None
}

fn trim(text: &str, s: usize, e: usize) -> (usize, usize) {
    let slice = &text[s..e];
    let lead = slice.len() - slice.trim_start().len();
    (s + lead, s + lead + slice.trim().len())
}

/// First body goal binding `variable`, with the span of the bound term.
pub(crate) fn binding_goal(clause: &ClauseText, variable: &str) -> Option<(usize, (usize, usize))> {
    clause.goals().iter().enumerate().find_map(|(k, goal)| {
        let (left, right) = unification(&clause.text, &clause.classes, *goal)?;
        if &clause.text[left.0..left.1] == variable {
            Some((k, right))
        } else if &clause.text[right.0..right.1] == variable {
            Some((k, left))
        } else {
            None
        }
    })
}

// ============================================================================
// Inline variable
// ============================================================================

fn inline_in_clause(clause: &ClauseText, variable: &str) -> RefactorResult<String> {
    let (k, term) = binding_goal(clause, variable)
        .ok_or_else(|| RefactorError::not_applicable(format!("no unification of {} in the clause", variable)))?;
    let text = &clause.text;
    let value = &text[term.0..term.1];
    if !syntax::variable_occurrences(value, &scanner::classify(value), variable).is_empty() {
        return Err(RefactorError::precondition(format!("{} occurs in its own binding", variable)));
    }
    let goals = clause.goals();
    let goal = goals[k];
    let replacement = if needs_parens(value) {
        format!("({})", value)
    } else {
        value.to_string()
    };
    let mut edits: Vec<(usize, usize, String)> = syntax::variable_occurrences(text, &clause.classes, variable)
        .into_iter()
        .filter(|at| *at < goal.0 || *at >= goal.1)
        .map(|at| (at, at + variable.len(), replacement.clone()))
        .collect();
    let removal = match (goals.len(), goals.get(k + 1)) {
        (1, _) => (goal.0, goal.1, "true".to_string()),
        (_, Some(next)) => (goal.0, next.0, String::new()),
        (_, None) => (goals[k - 1].1, goal.1, String::new()),
    };
    edits.push(removal);
    Ok(splice(text, edits))
}

pub(crate) fn inline_variable(b: &mut EditBuilder<'_>, target: &VariableTarget) -> RefactorResult<()> {
    let doc = b.document(&target.uri)?;
    let clause = clause_at(doc.as_ref(), target.position.line as usize)?;
    let new = inline_in_clause(&clause, &target.variable)?;
    b.rewrite_term(&doc, clause.term, |_| new);
    debug!(variable = %target.variable, "variable inlined");
    Ok(())
}

// ============================================================================
// Unify with new variable
// ============================================================================

fn is_single_term(text: &str) -> bool {
    let classes = scanner::classify(text);
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    for (i, b) in bytes.iter().enumerate() {
        if classes[i] != CharClass::Code {
            continue;
        }
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            b',' | b'.' if depth == 0 && (*b == b',' || scanner::is_end_dot(text, &classes, i)) => return false,
            _ => {}
        }
    }
    depth == 0 && classes.last().is_some_and(|c| *c != CharClass::Quoted) && !text.is_empty()
}

fn unify_in_clause(clause: &ClauseText, start: usize, end: usize, variable: &str) -> RefactorResult<String> {
    let text = &clause.text;
    let (s, e) = trim(text, start, end);
    if s >= e || !clause.in_body(s) || e > clause.dot {
        return Err(RefactorError::not_applicable("the selection is not in a clause body"));
    }
    let selected = &text[s..e];
    if !is_single_term(selected) {
        return Err(RefactorError::precondition("the selection is not a single term"));
    }
    if syntax::variables(text, &clause.classes).iter().any(|v| v == variable) {
        return Err(RefactorError::precondition(format!("{} already occurs in the clause", variable)));
    }
    let goals = clause.goals();
    let k = goals
        .iter()
        .position(|(gs, ge)| *gs <= s && e <= *ge)
        .ok_or_else(|| RefactorError::precondition("the selection spans several goals"))?;
    let goal = format!("{} = {}", variable, selected);
    Ok(splice(
        text,
        vec![
            (goals[k].0, goals[k].0, goal_prefix(text, &goals, k, &goal)),
            (s, e, variable.to_string()),
        ],
    ))
}

fn is_body_term(clause: &ClauseText, start: usize, end: usize) -> bool {
    let (s, e) = trim(&clause.text, start, end);
    s < e && clause.in_body(s) && e <= clause.dot && is_single_term(&clause.text[s..e])
}

/// Whether `range` selects a single term inside a clause body.
pub(crate) fn selects_body_term(doc: &dyn Document, range: &Range) -> bool {
    let Ok(clause) = clause_at(doc, range.start.line as usize) else {
        return false;
    };
    clause.term.contains_line(range.end.line as usize)
        && is_body_term(
            &clause,
            term_offset(doc, &clause.term, range.start),
            term_offset(doc, &clause.term, range.end),
        )
}

pub(crate) fn unify_with_new_variable(b: &mut EditBuilder<'_>, target: &SelectionTarget) -> RefactorResult<()> {
    let doc = b.document(&target.uri)?;
    let clause = clause_at(doc.as_ref(), target.range.start.line as usize)?;
    if !clause.term.contains_line(target.range.end.line as usize) {
        return Err(RefactorError::not_applicable("the selection spans several clauses"));
    }
    let start = term_offset(doc.as_ref(), &clause.term, target.range.start);
    let end = term_offset(doc.as_ref(), &clause.term, target.range.end);
    if !is_body_term(&clause, start, end) {
        return Err(RefactorError::not_applicable("the selection is not a term in a clause body"));
    }
    let variable = b.ask_variable("Name of the new variable", None)?;
    let new = unify_in_clause(&clause, start, end, variable.trim())?;
    b.rewrite_term(&doc, clause.term, |_| new);
    Ok(())
}

// ============================================================================
// Numbered variables
// ============================================================================

/// `Prefix` and number of a numbered variable such as `S0` or `Acc12`.
pub(crate) fn split_numbered(variable: &str) -> Option<(&str, u32)> {
    let prefix = variable.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &variable[prefix.len()..];
    if prefix.is_empty() || digits.is_empty() || !syntax::is_variable(prefix) {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    Some((prefix, digits.parse().ok()?))
}

fn shift_in_text(text: &str, classes: &[CharClass], variable: &str, delta: i32) -> RefactorResult<String> {
    let (prefix, n) = split_numbered(variable)
        .ok_or_else(|| RefactorError::not_applicable(format!("{} is not a numbered variable", variable)))?;
    if delta < 0 {
        if n == 0 {
            return Err(RefactorError::precondition(format!("{} cannot be decremented", variable)));
        }
        let previous = format!("{}{}", prefix, n - 1);
        if syntax::variables(text, classes).contains(&previous) {
            return Err(RefactorError::precondition(format!("{} already occurs in the clause", previous)));
        }
    }
    let shift = |word: &str| {
        let (p, m) = split_numbered(word)?;
        (p == prefix && m >= n).then(|| format!("{}{}", prefix, i64::from(m) + i64::from(delta)))
    };
    Ok(syntax::rename_variables(text, &shift))
}

/// Renumber `PrefixM` for every `M >= N` by `delta`.
pub(crate) fn shift_numbered_variables(b: &mut EditBuilder<'_>, target: &VariableTarget, delta: i32) -> RefactorResult<()> {
    let doc = b.document(&target.uri)?;
    let term = boundary::enclosing_term(doc.as_ref(), target.position.line as usize)
        .filter(|t| t.is_complete())
        .ok_or_else(|| RefactorError::not_applicable("no clause at the cursor"))?;
    let text = doc.lines_text(term.start, term.end);
    let classes = scanner::classify(&text);
    let new = shift_in_text(&text, &classes, &target.variable, delta)?;
    b.rewrite_term(&doc, term, |_| new);
    debug!(variable = %target.variable, delta, "numbered variables shifted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use retalk_core::document::TextDocument;

    fn clause(src: &str) -> ClauseText {
        let doc = TextDocument::new("t.lgt", src);
        clause_at(&doc, 0).unwrap()
    }

    mod inline_tests {
        use super::*;

        #[test]
        fn binding_is_removed_and_substituted() {
            let c = clause("foo(X) :-\n\tY = bar(X),\n\tbaz(Y, Y).");
            assert_eq!(inline_in_clause(&c, "Y").unwrap(), "foo(X) :-\n\tbaz(bar(X), bar(X)).");
        }

        #[test]
        fn operator_terms_are_parenthesized() {
            let c = clause("foo(X, Z) :- Y = X + 1, Z is Y * 2.");
            assert_eq!(inline_in_clause(&c, "Y").unwrap(), "foo(X, Z) :- Z is (X + 1) * 2.");
        }

        #[test]
        fn last_goal_binding() {
            let c = clause("foo(Y) :- bar, 1 = Y.");
            assert_eq!(inline_in_clause(&c, "Y").unwrap(), "foo(1) :- bar.");
        }

        #[test]
        fn only_goal_becomes_true() {
            let c = clause("foo(Y) :- Y = a.");
            assert_eq!(inline_in_clause(&c, "Y").unwrap(), "foo(a) :- true.");
        }

        #[test]
        fn comparisons_are_not_bindings() {
            let c = clause("foo(Y) :- Y == a, Y =.. L, bar(L).");
            assert!(matches!(inline_in_clause(&c, "Y"), Err(RefactorError::NotApplicable(_))));
        }

        #[test]
        fn cyclic_binding_is_refused() {
            let c = clause("foo(Y) :- Y = f(Y).");
            assert!(matches!(inline_in_clause(&c, "Y"), Err(RefactorError::Precondition(_))));
        }
    }

    mod unify_tests {
        use super::*;

        #[test]
        fn new_goal_precedes_the_selection() {
            let src = "area(R, A) :-\n\tA is 3.14159 * R * R.";
            let c = clause(src);
            let s = src.find("3.14159").unwrap();
            let out = unify_in_clause(&c, s, s + 7, "Pi").unwrap();
            assert_eq!(out, "area(R, A) :-\n\tPi = 3.14159,\n\tA is Pi * R * R.");
        }

        #[test]
        fn existing_variable_is_refused() {
            let src = "foo(X) :- bar(f(X)).";
            let c = clause(src);
            let s = src.find("f(X)").unwrap();
            assert!(unify_in_clause(&c, s, s + 4, "X").is_err());
        }

        #[test]
        fn selection_across_goals_is_refused() {
            let src = "foo :- bar, baz.";
            let c = clause(src);
            let s = src.find("bar").unwrap();
            assert!(unify_in_clause(&c, s, s + 8, "G").is_err());
        }
    }

    mod numbered_tests {
        use super::*;

        fn shift(text: &str, variable: &str, delta: i32) -> RefactorResult<String> {
            shift_in_text(text, &scanner::classify(text), variable, delta)
        }

        #[test]
        fn split() {
            assert_eq!(split_numbered("S0"), Some(("S", 0)));
            assert_eq!(split_numbered("Acc12"), Some(("Acc", 12)));
            assert_eq!(split_numbered("S"), None);
            assert_eq!(split_numbered("S01"), None);
        }

        #[test]
        fn increment_shifts_from_the_cursor_variable() {
            let text = "p(S0, S) :- q(S0, S1), r(S1, S2), s(S2, S).";
            assert_eq!(
                shift(text, "S1", 1).unwrap(),
                "p(S0, S) :- q(S0, S2), r(S2, S3), s(S3, S)."
            );
        }

        #[test]
        fn decrement_refuses_collisions() {
            let text = "p(S0, S) :- q(S0, S1), r(S1, S).";
            assert!(shift(text, "S1", -1).is_err());
            assert!(shift(text, "S0", -1).is_err());
            let gap = "p(S0, S) :- q(S0, S2), r(S2, S).";
            assert_eq!(shift(gap, "S2", -1).unwrap(), "p(S0, S) :- q(S0, S1), r(S1, S).");
        }
    }
}
