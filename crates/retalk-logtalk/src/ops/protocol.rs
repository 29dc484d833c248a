//! Extract the predicate declarations of an object or category into a new protocol.

use retalk_core::document::{Document, TextDocument};
use retalk_core::text::reindent;
use tracing::debug;

use crate::action::EntityTarget;
use crate::boundary::{self, EntityRange, TermRange};
use crate::callable::{self, splice};
use crate::directives::{self, ScanStep};
use crate::engine::EditBuilder;
use crate::error::{RefactorError, RefactorResult};
use crate::ops::extract::{ask_file_uri, NewEntity};
use crate::scanner;
use crate::syntax::{EntityKind, EntityOpening};

/// Directives that travel with a scope directive into the protocol.
const DECLARATION_DIRECTIVES: &[&str] = &["mode", "info", "meta_predicate", "meta_non_terminal"];

/// Scope directive runs of the entity body: each scope directive with the
/// following declaration directives that mention a predicate it declares.
fn declaration_runs(doc: &dyn Document, entity: &EntityRange) -> Vec<Vec<TermRange>> {
    let mut runs = Vec::new();
    for term in boundary::terms_in(doc, entity.body_lines(doc)) {
        if !term.is_complete() {
            break;
        }
        let text = doc.lines_text(term.start, term.end);
        if !directives::directive_name(&text).is_some_and(|n| directives::is_scope_directive(&n)) {
            continue;
        }
        let declared = directives::declared_indicators(&text);
        let mut run = vec![term];
        run.extend(directives::scan_consecutive_directives(doc, term.end + 1, |name, text| {
            let mentioned = declared.iter().any(|i| !callable::mentions(text, i).is_empty());
            if DECLARATION_DIRECTIVES.contains(&name) && mentioned {
                ScanStep::Take
            } else if directives::is_related_directive(name) {
                ScanStep::Skip
            } else {
                ScanStep::Stop
            }
        }));
        runs.push(run);
    }
    runs
}

/// Merge term ranges separated only by blank lines into line blocks.
fn blocks(doc: &dyn Document, terms: &[TermRange]) -> Vec<(usize, usize)> {
    let mut out: Vec<(usize, usize)> = Vec::new();
    for term in terms {
        match out.last_mut() {
            Some((_, end)) if (*end + 1..term.start).all(|n| doc.line(n).trim().is_empty()) => *end = term.end,
            _ => out.push((term.start, term.end)),
        }
    }
    out
}

/// Opening directive text with `implements(Protocol)` added.
pub(crate) fn add_implements(text: &str, protocol: &str) -> Option<String> {
    let opening = EntityOpening::parse(text)?;
    if let Some(rel) = opening.relation("implements") {
        let (rs, re) = rel.span;
        let rel_text = &text[rs..re];
        let open = rs + rel_text.find('(')?;
        let close = rs + rel_text.rfind(')')?;
        let inner = text[open + 1..close].trim();
        if inner.starts_with('[') && inner.ends_with(']') {
            let list_open = open + 1 + text[open + 1..].find('[')?;
            let list_close = close - (text[..close].len() - text[..close].trim_end().len()) - 1;
            let classes = scanner::classify(text);
            let elements = directives::list_elements(text, &classes, list_open, list_close);
            let edit = match (elements.first(), elements.get(1), elements.last()) {
                (Some(a), Some(b), Some(last)) => (last.1, last.1, format!("{}{}", &text[a.1..b.0], protocol)),
                (Some(_), None, Some(last)) => (last.1, last.1, format!(", {}", protocol)),
                _ => (list_open + 1, list_close, protocol.to_string()),
            };
            return Some(splice(text, vec![edit]));
        }
        let arg_start = open + 1 + (text[open + 1..close].len() - text[open + 1..close].trim_start().len());
        let arg_end = arg_start + inner.len();
        return Some(splice(text, vec![(arg_start, arg_end, format!("[{}, {}]", inner, protocol))]));
    }
    let (_, id_end) = *opening.args.first()?;
    let separator = opening.separator(text);
    Some(splice(text, vec![(id_end, id_end, format!("{}implements({})", separator, protocol))]))
}

pub(crate) fn extract_protocol(b: &mut EditBuilder<'_>, target: &EntityTarget) -> RefactorResult<()> {
    if target.kind == EntityKind::Protocol {
        return Err(RefactorError::not_applicable("the entity is already a protocol"));
    }
    let doc = b.document(&target.uri)?;
    let entity = boundary::entity_opening_at(doc.as_ref(), target.position.line as usize)
        .ok_or_else(|| RefactorError::not_applicable("no entity opening directive at the cursor"))?;
    if !entity.opening.is_complete() || entity.end_line.is_none() {
        return Err(RefactorError::precondition("the entity is not terminated"));
    }
    let runs = declaration_runs(doc.as_ref(), &entity);
    if runs.is_empty() {
        return Err(RefactorError::precondition(format!(
            "{} declares no predicates",
            target.entity.name
        )));
    }

    let default = format!("{}_protocol", target.entity.name.trim_matches('\''));
    let protocol = b.ask_atom("Name of the new protocol", Some(&default))?;
    let uri = ask_file_uri(b, &target.uri, &format!("{}.lgt", protocol.trim_matches('\'')))?;

    let body = protocol_body(doc.as_ref(), &runs, &b.format.indent);
    let source = NewEntity {
        kind: EntityKind::Protocol,
        identifier: &protocol,
        relations: None,
        comment: format!("Protocol extracted from {}.", target.entity.name),
        body,
    };
    let contents = source.render(b.format);
    b.create(&uri, contents)?;

    let terms: Vec<TermRange> = runs.iter().flatten().copied().collect();
    remove_blocks(b, &doc, &blocks(doc.as_ref(), &terms));

    let opening_text = doc.lines_text(entity.opening.start, entity.opening.end);
    let new_opening = add_implements(&opening_text, &protocol)
        .ok_or_else(|| RefactorError::precondition("cannot parse the entity opening directive"))?;
    b.rewrite_term(&doc, entity.opening, |_| new_opening);
    debug!(entity = %target.entity.name, %protocol, runs = runs.len(), "protocol extracted");
    Ok(())
}

fn protocol_body(doc: &dyn Document, runs: &[Vec<TermRange>], indent: &str) -> Vec<String> {
    let mut body = Vec::new();
    for (i, run) in runs.iter().enumerate() {
        if i > 0 {
            body.push(String::new());
        }
        let lines: Vec<&str> = run
            .iter()
            .flat_map(|t| (t.start..=t.end).map(|n| doc.line(n)))
            .collect();
        body.extend(reindent(&lines, indent));
    }
    body
}

/// Delete each block, taking one trailing blank line along when the block
/// is preceded by a blank line.
fn remove_blocks(b: &mut EditBuilder<'_>, doc: &TextDocument, blocks: &[(usize, usize)]) {
    for (start, end) in blocks {
        let blank = |n: usize| n < doc.line_count() && doc.line(n).trim().is_empty();
        let end = if *start > 0 && blank(start - 1) && blank(end + 1) {
            end + 1
        } else {
            *end
        };
        b.delete_lines(doc, *start, end);
    }
}
