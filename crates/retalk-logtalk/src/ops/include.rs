//! Inline `include/1` directives and move selections into included files.

use retalk_core::document::Document;
use retalk_core::host::{join_uri, parent_uri};
use retalk_core::text::{indentation, reindent};
use tracing::debug;

use crate::action::{DirectiveTarget, SelectionTarget};
use crate::boundary;
use crate::directives;
use crate::engine::EditBuilder;
use crate::error::{RefactorError, RefactorResult};
use crate::ops::extract::{ask_file_uri, validate_selection};
use crate::scanner;
use crate::syntax;

/// Extensions tried, in order, when the included path has none that exists.
const SOURCE_EXTENSIONS: &[&str] = &["lgt", "logtalk", "pl", "prolog"];

/// File argument of an `include/1` directive, unquoted.
pub(crate) fn include_path(text: &str) -> Option<String> {
    let classes = scanner::classify(text);
    let call = directives::directive_call(text, &classes)?;
    if call.name != "include" || call.arity() != 1 {
        return None;
    }
    let (s, e) = call.args[0];
    let arg = &text[s..e];
    if arg.len() >= 2 && arg.starts_with('\'') && arg.ends_with('\'') {
        Some(arg[1..arg.len() - 1].replace("\\'", "'"))
    } else if syntax::is_atom(arg) {
        Some(arg.to_string())
    } else {
        None
    }
}

/// Candidate URIs for an included path, most specific first.
fn candidates(source: &str, path: &str) -> Vec<String> {
    let base = join_uri(parent_uri(source), path);
    let mut out = vec![base.clone()];
    out.extend(SOURCE_EXTENSIONS.iter().map(|ext| format!("{}.{}", base, ext)));
    out
}

/// `uri` relative to the directory of `source`.
fn relative_to<'a>(source: &str, uri: &'a str) -> &'a str {
    let dir = parent_uri(source);
    if dir.is_empty() {
        return uri;
    }
    uri.strip_prefix(dir)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(uri)
}

pub(crate) fn include_file_contents(b: &mut EditBuilder<'_>, target: &DirectiveTarget) -> RefactorResult<()> {
    let doc = b.document(&target.uri)?;
    let term = boundary::enclosing_term(doc.as_ref(), target.line as usize)
        .filter(|t| t.is_complete())
        .ok_or_else(|| RefactorError::not_applicable("no directive at the cursor"))?;
    let text = doc.lines_text(term.start, term.end);
    let path = include_path(&text)
        .ok_or_else(|| RefactorError::not_applicable("not an include directive with a file path"))?;
    let uri = candidates(&target.uri, &path)
        .into_iter()
        .find(|c| b.host.file_exists(c))
        .ok_or_else(|| RefactorError::precondition(format!("included file not found: {}", path)))?;
    let included = b.document(&uri)?;
    let mut lines: Vec<&str> = (0..included.line_count()).map(|n| included.line(n)).collect();
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    let indent = indentation(doc.line(term.start)).to_string();
    let body = reindent(&lines, &indent).join("\n");
    b.rewrite_term(&doc, term, |_| body);
    debug!(included = %uri, lines = lines.len(), "include directive inlined");
    Ok(())
}

pub(crate) fn replace_with_include(b: &mut EditBuilder<'_>, target: &SelectionTarget) -> RefactorResult<()> {
    let doc = b.document(&target.uri)?;
    let (first, last) = validate_selection(doc.as_ref(), &target.range)?;
    let uri = ask_file_uri(b, &target.uri, "included.lgt")?;
    let lines: Vec<&str> = (first..=last).map(|n| doc.line(n)).collect();
    let mut contents = reindent(&lines, "").join("\n");
    contents.push('\n');
    b.create(&uri, contents)?;
    let directive = format!(
        "{}:- include({}).",
        indentation(doc.line(first)),
        syntax::quote_atom(relative_to(&target.uri, &uri))
    );
    b.replace_lines(&doc, first, last, &directive);
    Ok(())
}
