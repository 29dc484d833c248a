//! Add, remove and reorder predicate (or non-terminal) arguments.
//!
//! Each location returned by the locator is classified and rewritten once:
//!
//! 1. Declarations: the scope directive, then the run of related
//!    directives that follows it (`mode`, `info`, `meta_predicate`, ...).
//! 2. Definitions and implementations: the chain of consecutive clauses
//!    whose head is the predicate.
//! 3. References: the enclosing clause or directive.
//!
//! Only callables written with exactly the pre-change arity are touched.
//! A call sent to another entity (`Obj::name(...)`) is touched only when the
//! located occurrences send to `Obj` too, and an unqualified call in a
//! referencing term only when the locator found an unqualified one there.

use std::collections::HashSet;

use retalk_core::document::{Document, TextDocument};
use retalk_core::types::{LocationKind, TaggedLocation};
use tracing::debug;

use crate::action::PredicateTarget;
use crate::boundary::{self, ClauseKind, TermRange};
use crate::callable::{self, ArgChange, CallableRewrite, Receivers};
use crate::directives::{self, InfoRewrite, ListKey, ScanStep};
use crate::engine::EditBuilder;
use crate::error::{RefactorError, RefactorResult};
use crate::index::head_offset;
use crate::locator;
use crate::scanner;
use crate::symbol;
use crate::syntax::{EntityOpening, Indicator};

/// One arity change of one predicate.
pub(crate) struct ArgumentPlan<'a> {
    pub indicator: &'a Indicator,
    pub change: &'a ArgChange,
    /// Variable name of an inserted argument.
    pub name: &'a str,
}

impl ArgumentPlan<'_> {
    fn callables<'s>(&'s self, filler: &'s str, receivers: Receivers<'s>) -> CallableRewrite<'s> {
        CallableRewrite {
            name: &self.indicator.name,
            arity: self.indicator.arity,
            change: self.change,
            filler,
            entity: false,
            receivers,
        }
    }

    fn new_arity(&self) -> usize {
        self.change.new_arity(self.indicator.arity)
    }
}

// ============================================================================
// Entry points
// ============================================================================

pub(crate) fn add_argument(b: &mut EditBuilder<'_>, target: &PredicateTarget) -> RefactorResult<()> {
    let arity = target.indicator.arity;
    let name = b.ask_variable(&format!("Name of the new argument of {}", target.indicator), None)?;
    let position = b.ask_position(
        &format!("Position of {} (1-{})", name, arity + 1),
        arity + 1,
        arity + 1,
    )?;
    let change = ArgChange::Insert { position };
    rewrite_predicate(b, target, &ArgumentPlan {
        indicator: &target.indicator,
        change: &change,
        name: &name,
    })
}

pub(crate) fn remove_argument(b: &mut EditBuilder<'_>, target: &PredicateTarget) -> RefactorResult<()> {
    let arity = target.indicator.arity;
    if arity == 0 {
        return Err(RefactorError::not_applicable(format!("{} has no arguments", target.indicator)));
    }
    let position = if arity == 1 {
        1
    } else {
        b.ask_position(&format!("Argument of {} to remove (1-{})", target.indicator, arity), arity, arity)?
    };
    let change = ArgChange::Remove { position };
    rewrite_predicate(b, target, &ArgumentPlan {
        indicator: &target.indicator,
        change: &change,
        name: "",
    })
}

pub(crate) fn reorder_arguments(b: &mut EditBuilder<'_>, target: &PredicateTarget) -> RefactorResult<()> {
    let arity = target.indicator.arity;
    if arity < 2 {
        return Err(RefactorError::not_applicable(format!(
            "{} has fewer than two arguments",
            target.indicator
        )));
    }
    // with two arguments the only other order is the swap
    let permutation = if arity == 2 {
        vec![2, 1]
    } else {
        b.ask_permutation(&format!("New order of the arguments of {}", target.indicator), arity)?
    };
    let change = ArgChange::Reorder { permutation };
    if change.is_identity() {
        debug!(indicator = %target.indicator, "identity permutation");
        return Ok(());
    }
    rewrite_predicate(b, target, &ArgumentPlan {
        indicator: &target.indicator,
        change: &change,
        name: "",
    })
}

// ============================================================================
// Location dispatch
// ============================================================================

fn rewrite_predicate(b: &mut EditBuilder<'_>, target: &PredicateTarget, plan: &ArgumentPlan<'_>) -> RefactorResult<()> {
    plan.change
        .validate(plan.indicator.arity)
        .map_err(RefactorError::precondition)?;
    let doc = b.document(&target.uri)?;
    let locations = locator::locate(b.host, b.symbols, b.cancel, doc.as_ref(), target.position)?;
    if locations.is_empty() {
        return Err(RefactorError::precondition("no locations found"));
    }
    let scope = ReferenceScope::collect(b, &locations, plan.indicator)?;
    debug!(receivers = ?scope.receivers, "reference scope");
    for tagged in locations {
        let doc = b.document(&tagged.location.uri)?;
        let line = tagged.location.range.start.line as usize;
        match tagged.kind {
            LocationKind::Declaration => rewrite_declaration(b, &doc, line, plan)?,
            LocationKind::Definition | LocationKind::Implementation => {
                rewrite_definitions(b, &doc, line, plan, &scope)?
            }
            LocationKind::Reference => rewrite_reference(b, &doc, line, plan, &scope)?,
        }
    }
    Ok(())
}

/// What the located occurrences say about receivers.
#[derive(Debug, Default)]
struct ReferenceScope {
    /// Entities the predicate is declared, defined or called in.
    receivers: Vec<String>,
    /// `(uri, term start)` of terms holding a located unqualified occurrence.
    local_terms: HashSet<(String, usize)>,
}

impl ReferenceScope {
    fn collect(b: &mut EditBuilder<'_>, locations: &[TaggedLocation], indicator: &Indicator) -> RefactorResult<Self> {
        let mut scope = ReferenceScope::default();
        for tagged in locations {
            let doc = b.document(&tagged.location.uri)?;
            let Some((term, text, offset)) = symbol::term_text_at(doc.as_ref(), tagged.location.range.start) else {
                continue;
            };
            let key = (doc.uri().to_string(), term.start);
            if tagged.kind != LocationKind::Reference {
                if let Some(name) = entity_name(&doc, term.start) {
                    scope.add_receiver(name);
                }
                scope.local_terms.insert(key);
                continue;
            }
            let found = callable::mentions(&text, indicator);
            let mention = found
                .iter()
                .find(|m| (m.offset..=m.offset + indicator.name.len()).contains(&offset))
                .or(found.first());
            match mention.map(|m| m.qualifier.clone()) {
                Some(Some(Some(receiver))) => scope.add_receiver(receiver),
                Some(_) => {
                    scope.local_terms.insert(key);
                }
                None => {}
            }
        }
        Ok(scope)
    }

    fn add_receiver(&mut self, name: String) {
        if !self.receivers.contains(&name) {
            self.receivers.push(name);
        }
    }

    fn receivers(&self, local: bool) -> Receivers<'_> {
        Receivers::Only {
            entities: &self.receivers,
            local,
        }
    }

    fn is_local(&self, doc: &TextDocument, term: &TermRange) -> bool {
        self.local_terms.contains(&(doc.uri().to_string(), term.start))
    }
}

fn entity_name(doc: &TextDocument, line: usize) -> Option<String> {
    let entity = boundary::find_entity(doc, line)?;
    let text = doc.lines_text(entity.opening.start, entity.opening.end);
    EntityOpening::parse(&text).map(|opening| opening.identifier.name)
}

fn complete_term(doc: &TextDocument, line: usize) -> RefactorResult<Option<TermRange>> {
    let Some(term) = boundary::enclosing_term(doc, line) else {
        return Ok(None);
    };
    if !term.is_complete() {
        return Err(RefactorError::precondition(format!(
            "unterminated term at {}:{}",
            doc.uri(),
            term.start + 1
        )));
    }
    Ok(Some(term))
}

/// Scope directive plus the related directives that follow it.
fn rewrite_declaration(b: &mut EditBuilder<'_>, doc: &TextDocument, line: usize, plan: &ArgumentPlan<'_>) -> RefactorResult<()> {
    let Some(term) = complete_term(doc, line)? else {
        return Ok(());
    };
    b.rewrite_term(doc, term, |text| rewrite_directive_text(text, plan));
    let related = directives::scan_consecutive_directives(doc, term.end + 1, |name, text| {
        if !directives::is_related_directive(name) {
            ScanStep::Stop
        } else if callable::mentions(text, plan.indicator).is_empty() {
            ScanStep::Skip
        } else {
            ScanStep::Take
        }
    });
    debug!(count = related.len(), "related directives");
    for range in related {
        b.rewrite_term(doc, range, |text| rewrite_directive_text(text, plan));
    }
    Ok(())
}

/// The chain of consecutive clauses defining the predicate.
fn rewrite_definitions(
    b: &mut EditBuilder<'_>,
    doc: &TextDocument,
    line: usize,
    plan: &ArgumentPlan<'_>,
    scope: &ReferenceScope,
) -> RefactorResult<()> {
    let Some(first) = complete_term(doc, line)? else {
        return Ok(());
    };
    let first_text = doc.lines_text(first.start, first.end);
    if boundary::is_directive_start(&first_text) || head_offset(doc, &first, &first_text, plan.indicator).is_none() {
        debug!(uri = doc.uri(), line, "definition head does not match, treating as reference");
        return rewrite_reference(b, doc, line, plan, scope);
    }
    let mut n = first.start;
    while n < doc.line_count() {
        if scanner::is_blank_or_comment(doc.line(n)) {
            n += 1;
            continue;
        }
        let term = boundary::term_range(doc, n);
        let text = doc.lines_text(term.start, term.end);
        if !term.is_complete()
            || boundary::is_directive_start(&text)
            || head_offset(doc, &term, &text, plan.indicator).is_none()
        {
            break;
        }
        let kind = boundary::get_clause_range(doc, term.start).kind;
        b.rewrite_term(doc, term, |text| rewrite_clause_text(text, kind, plan, scope.receivers(true)));
        n = term.end + 1;
    }
    Ok(())
}

fn rewrite_reference(
    b: &mut EditBuilder<'_>,
    doc: &TextDocument,
    line: usize,
    plan: &ArgumentPlan<'_>,
    scope: &ReferenceScope,
) -> RefactorResult<()> {
    let Some(term) = complete_term(doc, line)? else {
        return Ok(());
    };
    let text = doc.lines_text(term.start, term.end);
    if boundary::is_directive_start(&text) {
        let scope = directives::directive_name(&text).is_some_and(|n| directives::is_scope_directive(&n));
        if scope {
            return rewrite_declaration(b, doc, line, plan);
        }
        b.rewrite_term(doc, term, |text| rewrite_directive_text(text, plan));
    } else {
        let kind = boundary::get_clause_range(doc, term.start).kind;
        let receivers = scope.receivers(scope.is_local(doc, &term));
        b.rewrite_term(doc, term, |text| rewrite_clause_text(text, kind, plan, receivers));
    }
    Ok(())
}

// ============================================================================
// Text rewriting
// ============================================================================

/// Rewrite a clause: head, recursive calls and other calls of the predicate.
///
/// In grammar rules non-terminals are only rewritten outside `{}` and
/// predicates only inside.
pub(crate) fn rewrite_clause_text(text: &str, kind: ClauseKind, plan: &ArgumentPlan<'_>, receivers: Receivers<'_>) -> String {
    let mask = (kind == ClauseKind::GrammarRule).then(|| {
        let classes = scanner::classify(text);
        let braces = scanner::brace_mask(text, &classes);
        if plan.indicator.non_terminal {
            braces.iter().map(|inside| !inside).collect::<Vec<_>>()
        } else {
            braces
        }
    });
    let out = callable::rewrite_callables(text, &plan.callables(plan.name, receivers), mask.as_deref());
    callable::rewrite_indicators(&out, plan.indicator, plan.new_arity())
}

/// Rewrite a directive mentioning the predicate.
pub(crate) fn rewrite_directive_text(text: &str, plan: &ArgumentPlan<'_>) -> String {
    let out = callable::rewrite_indicators(text, plan.indicator, plan.new_arity());
    let name = directives::directive_name(&out).unwrap_or_default();
    match name.as_str() {
        "info" => rewrite_info_text(&out, plan),
        "mode" => callable::rewrite_callables(&out, &plan.callables("?term", Receivers::Any), None),
        "meta_predicate" | "meta_non_terminal" => callable::rewrite_callables(&out, &plan.callables("*", Receivers::Any), None),
        "coinductive" => callable::rewrite_callables(&out, &plan.callables("-", Receivers::Any), None),
        _ => callable::rewrite_callables(&out, &plan.callables("_", Receivers::Any), None),
    }
}

/// `info/2`: `argnames`, `arguments` and `examples`.
fn rewrite_info_text(text: &str, plan: &ArgumentPlan<'_>) -> String {
    let classes = scanner::classify(text);
    let is_info2 = directives::directive_call(text, &classes).is_some_and(|c| c.arity() == 2);
    let Some((open, close)) = directives::info_list(text).filter(|_| is_info2) else {
        return text.to_string();
    };
    let quoted = format!("'{}'", plan.name);
    let examples = |value: &str| callable::rewrite_callables(value, &plan.callables("_", Receivers::Any), None);
    let synthesize = match plan.change {
        ArgChange::Insert { .. } if plan.indicator.arity == 0 => Some(("argnames", format!("[{}]", quoted))),
        _ => None,
    };
    let rw = InfoRewrite {
        change: plan.change,
        keys: vec![
            ListKey {
                key: "argnames",
                filler: quoted.clone(),
            },
            ListKey {
                key: "arguments",
                filler: format!("{} - ''", quoted),
            },
        ],
        rewrite_keys: &["examples"],
        entry_rewrite: &examples,
        synthesize,
    };
    directives::rewrite_info_list(text, open, close, &rw)
}
