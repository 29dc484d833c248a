//! Split and sort the list argument of declaration directives.
//!
//! Single-argument directives (`public/1`, `dynamic/1`, ...) carry the list
//! in their only argument; `uses/2`, `use_module/2` and `alias/2` in the
//! second one.

use retalk_core::document::{Document, TextDocument};
use std::rc::Rc;

use crate::action::DirectiveTarget;
use crate::boundary::{self, TermRange};
use crate::callable::splice;
use crate::directives;
use crate::engine::EditBuilder;
use crate::error::{RefactorError, RefactorResult};
use crate::scanner::{self, CharClass};
use crate::syntax::Callable;

const LIST_DIRECTIVES: &[&str] = &[
    "public",
    "protected",
    "private",
    "dynamic",
    "discontiguous",
    "multifile",
    "synchronized",
    "coinductive",
];

const PAIR_DIRECTIVES: &[&str] = &["uses", "use_module", "alias"];

/// A directive whose list argument can be split or sorted.
#[derive(Debug, Clone)]
pub(crate) struct ListDirective {
    pub call: Callable,
    /// Offsets of the list's `[` and `]`.
    pub open: usize,
    pub close: usize,
    pub elements: Vec<(usize, usize)>,
}

impl ListDirective {
    pub fn parse(text: &str, classes: &[CharClass]) -> Option<Self> {
        let call = directives::directive_call(text, classes)?;
        let index = match call.arity() {
            1 if LIST_DIRECTIVES.contains(&call.name.as_str()) => 0,
            2 if PAIR_DIRECTIVES.contains(&call.name.as_str()) => 1,
            _ => return None,
        };
        let (s, e) = call.args[index];
        if !text[s..e].starts_with('[') || !text[s..e].ends_with(']') {
            return None;
        }
        let elements = directives::list_elements(text, classes, s, e - 1);
        Some(ListDirective {
            call,
            open: s,
            close: e - 1,
            elements,
        })
    }

    fn items(&self, text: &str) -> Vec<String> {
        self.elements.iter().map(|(s, e)| text[*s..*e].to_string()).collect()
    }
}

/// Case-insensitive key; `Name as Alias` sorts by `Name`.
fn sort_key(element: &str) -> String {
    let classes = scanner::classify(element);
    let end = scanner::find_top_level(element, &classes, 0, element.len(), " as ").unwrap_or(element.len());
    element[..end].trim().to_lowercase()
}

fn split_text(text: &str, list: &ListDirective) -> String {
    let prefix = &text[..list.call.start];
    let leading = match list.call.args.as_slice() {
        [first, second] => format!("{}{}", &text[first.0..first.1], &text[first.1..second.0]),
        _ => String::new(),
    };
    let wrap = |item: &str| if leading.is_empty() { item.to_string() } else { format!("[{}]", item) };
    list.items(text)
        .iter()
        .map(|item| format!("{}{}({}{}).", prefix, list.call.name, leading, wrap(item)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn sort_text(text: &str, classes: &[CharClass], list: &ListDirective) -> Option<String> {
    let items = list.items(text);
    let mut sorted = items.clone();
    sorted.sort_by_cached_key(|item| sort_key(item));
    if sorted == items {
        return None;
    }
    let rendered = directives::render_list(text, classes, list.open, list.close, &sorted);
    Some(splice(text, vec![(list.open, list.close + 1, rendered)]))
}

fn directive_at(b: &mut EditBuilder<'_>, target: &DirectiveTarget) -> RefactorResult<(Rc<TextDocument>, TermRange, String)> {
    let doc = b.document(&target.uri)?;
    let term = boundary::enclosing_term(doc.as_ref(), target.line as usize)
        .filter(|t| t.is_complete())
        .ok_or_else(|| RefactorError::not_applicable("no directive at the cursor"))?;
    let text = doc.lines_text(term.start, term.end);
    Ok((doc, term, text))
}

pub(crate) fn split_list_directive(b: &mut EditBuilder<'_>, target: &DirectiveTarget) -> RefactorResult<()> {
    let (doc, term, text) = directive_at(b, target)?;
    let classes = scanner::classify(&text);
    let list = ListDirective::parse(&text, &classes)
        .filter(|l| l.elements.len() > 1)
        .ok_or_else(|| RefactorError::not_applicable(format!("{} has nothing to split", target.directive)))?;
    let new = split_text(&text, &list);
    b.rewrite_term(&doc, term, |_| new);
    Ok(())
}

pub(crate) fn sort_list_directive(b: &mut EditBuilder<'_>, target: &DirectiveTarget) -> RefactorResult<()> {
    let (doc, term, text) = directive_at(b, target)?;
    let classes = scanner::classify(&text);
    let list = ListDirective::parse(&text, &classes)
        .ok_or_else(|| RefactorError::not_applicable(format!("{} has no list to sort", target.directive)))?;
    if let Some(new) = sort_text(&text, &classes, &list) {
        b.rewrite_term(&doc, term, |_| new);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Option<ListDirective> {
        ListDirective::parse(text, &scanner::classify(text))
    }

    #[test]
    fn recognised_directives() {
        assert!(parse(":- public([a/1, b/2]).").is_some());
        assert!(parse(":- uses(list, [append/3, member/2]).").is_some());
        assert!(parse(":- public(a/1).").is_none());
        assert!(parse(":- initialization([a]).").is_none());
    }

    #[test]
    fn split_single_argument() {
        let text = "\t:- public([foo/1, bar/2]).";
        let list = parse(text).unwrap();
        assert_eq!(split_text(text, &list), "\t:- public(foo/1).\n\t:- public(bar/2).");
    }

    #[test]
    fn split_keeps_list_form_for_pairs() {
        let text = ":- uses(list, [append/3, member/2]).";
        let list = parse(text).unwrap();
        assert_eq!(
            split_text(text, &list),
            ":- uses(list, [append/3]).\n:- uses(list, [member/2])."
        );
    }

    #[test]
    fn sort_is_case_insensitive_and_uses_alias_source() {
        let text = ":- uses(list, [member/2, 'Append'/3 as app/3, last/2]).";
        let classes = scanner::classify(text);
        let list = parse(text).unwrap();
        assert_eq!(
            sort_text(text, &classes, &list).as_deref(),
            Some(":- uses(list, ['Append'/3 as app/3, last/2, member/2]).")
        );
    }

    #[test]
    fn sort_key_ignores_case_and_alias() {
        assert_eq!(sort_key("Foo/1 as f/1"), "foo/1");
        assert_eq!(sort_key("bar//2"), "bar//2");
    }

    #[test]
    fn sort_preserves_multiline_layout() {
        let text = "\t:- public([\n\t\tzeta/1,\n\t\talpha/0\n\t]).";
        let classes = scanner::classify(text);
        let list = parse(text).unwrap();
        assert_eq!(
            sort_text(text, &classes, &list).as_deref(),
            Some("\t:- public([\n\t\talpha/0,\n\t\tzeta/1\n\t]).")
        );
    }

    #[test]
    fn sorted_list_needs_no_edit() {
        let text = ":- dynamic([a/1, b/1]).";
        let classes = scanner::classify(text);
        assert!(sort_text(text, &classes, &parse(text).unwrap()).is_none());
    }
}
