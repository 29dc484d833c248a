//! Directive classification, the consecutive-directive scan and
//! layout-preserving rewriting of `info/1,2` lists.

use retalk_core::document::Document;

use crate::boundary::{self, TermRange};
use crate::callable::{render_elements, splice, ArgChange};
use crate::scanner::{self, CharClass};
use crate::syntax::{self, Callable, Indicator};

/// Scope directives.
pub const SCOPE_DIRECTIVES: &[&str] = &["public", "protected", "private"];

/// Directives that describe a predicate declared by a preceding scope directive.
pub const RELATED_DIRECTIVES: &[&str] = &[
    "mode",
    "info",
    "meta_predicate",
    "meta_non_terminal",
    "synchronized",
    "coinductive",
    "multifile",
    "dynamic",
    "discontiguous",
    "uses",
];

/// Whether `name` is a scope directive.
pub fn is_scope_directive(name: &str) -> bool {
    SCOPE_DIRECTIVES.contains(&name)
}

/// Whether `name` is a predicate-related directive.
pub fn is_related_directive(name: &str) -> bool {
    RELATED_DIRECTIVES.contains(&name)
}

/// Offset of the first non-layout byte after `:-`.
pub fn body_start(text: &str) -> Option<usize> {
    let trimmed = text.trim_start();
    if !trimmed.starts_with(":-") {
        return None;
    }
    let neck = text.len() - trimmed.len() + 2;
    let rest = &text[neck..];
    Some(neck + (rest.len() - rest.trim_start().len()))
}

/// The callable term of a directive (`public([...])` in `:- public([...]).`).
pub fn directive_call(text: &str, classes: &[CharClass]) -> Option<Callable> {
    syntax::parse_callable_at(text, classes, body_start(text)?)
}

/// Name of the directive in `text`.
pub fn directive_name(text: &str) -> Option<String> {
    let classes = scanner::classify(text);
    directive_call(text, &classes).map(|c| c.name)
}

/// Indicators declared by a scope directive: `public(foo/1)`,
/// `public([a/0, b//1])` or `public((a/0, b/1))`.
pub fn declared_indicators(text: &str) -> Vec<Indicator> {
    let classes = scanner::classify(text);
    let Some(call) = directive_call(text, &classes) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for &(s, e) in &call.args {
        let arg = &text[s..e];
        let grouped = (arg.starts_with('[') && arg.ends_with(']')) || (arg.starts_with('(') && arg.ends_with(')'));
        let elements = if grouped {
            scanner::split_top_level_spans(text, &classes, s + 1, e - 1)
        } else {
            vec![(s, e)]
        };
        out.extend(elements.iter().filter_map(|&(a, b)| Indicator::parse(&text[a..b])));
    }
    out
}

/// Decision for one directive during a consecutive scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStep {
    /// Yield the directive and continue.
    Take,
    /// Continue without yielding.
    Skip,
    /// End the scan.
    Stop,
}

/// Walk the directives following line `from`, skipping blank and comment
/// lines, and yield the ranges `step` takes.
///
/// The scan always ends at a clause, a scope directive, an entity end
/// directive, an incomplete term or the end of the document.
pub fn scan_consecutive_directives(
    doc: &dyn Document,
    from: usize,
    mut step: impl FnMut(&str, &str) -> ScanStep,
) -> Vec<TermRange> {
    let mut out = Vec::new();
    let mut n = from;
    while n < doc.line_count() {
        let line = doc.line(n);
        if scanner::is_blank_or_comment(line) {
            n += 1;
            continue;
        }
        if !boundary::is_directive_start(line) {
            break;
        }
        let range = boundary::get_directive_range(doc, n);
        if !range.is_complete() {
            break;
        }
        let text = doc.lines_text(range.start, range.end);
        let Some(name) = directive_name(&text) else {
            break;
        };
        if is_scope_directive(&name) || name.starts_with("end_") {
            break;
        }
        match step(&name, &text) {
            ScanStep::Take => out.push(range),
            ScanStep::Skip => {}
            ScanStep::Stop => break,
        }
        n = range.end + 1;
    }
    out
}

// ============================================================================
// Lists
// ============================================================================

/// Indentation of the line containing byte `at` of a `\n`-joined text.
pub fn indent_at(text: &str, at: usize) -> &str {
    let start = text[..at].rfind('\n').map_or(0, |i| i + 1);
    let line = &text[start..];
    let end = line.find('\n').unwrap_or(line.len());
    retalk_core::text::indentation(&line[..end])
}

/// Element spans of the list `text[open..=close]` (`open` at `[`).
pub fn list_elements(text: &str, classes: &[CharClass], open: usize, close: usize) -> Vec<(usize, usize)> {
    scanner::split_top_level_spans(text, classes, open + 1, close)
}

/// Render `items` as a replacement for the list `text[open..=close]`.
///
/// A multi-line list keeps one element per line at the original element
/// indentation; a single-line list keeps its separators.
pub fn render_list(text: &str, classes: &[CharClass], open: usize, close: usize, items: &[String]) -> String {
    let spans = list_elements(text, classes, open, close);
    if !text[open..=close].contains('\n') {
        return format!("[{}]", render_elements(text, &spans, items));
    }
    let close_indent = indent_at(text, close);
    let elem_indent = match spans.first() {
        Some((s, _)) if text[open..*s].contains('\n') => indent_at(text, *s).to_string(),
        _ => format!("{}\t", close_indent),
    };
    let body: Vec<String> = items.iter().map(|i| format!("{}{}", elem_indent, i)).collect();
    format!("[\n{}\n{}]", body.join(",\n"), close_indent)
}

/// How one keyed list of an `info` directive changes.
#[derive(Debug, Clone)]
pub struct ListKey<'a> {
    /// Entry key (`argnames`, `parameters`, ...).
    pub key: &'a str,
    /// Text of an inserted element.
    pub filler: String,
}

/// An `info` entry: `key is Value`.
#[derive(Debug, Clone)]
struct InfoEntry {
    span: (usize, usize),
    key: String,
    value: (usize, usize),
}

fn info_entries(text: &str, classes: &[CharClass], open: usize, close: usize) -> Vec<InfoEntry> {
    let mut out = Vec::new();
    for span in list_elements(text, classes, open, close) {
        let Some(key_end) = syntax::atom_end(text, classes, span.0) else {
            continue;
        };
        let rest = &text[key_end..span.1];
        let trimmed = rest.trim_start();
        let Some(after_is) = trimmed.strip_prefix("is") else {
            continue;
        };
        if !after_is.starts_with(|c: char| c.is_whitespace()) {
            continue;
        }
        let value_start = span.1 - after_is.trim_start().len();
        out.push(InfoEntry {
            span,
            key: text[span.0..key_end].to_string(),
            value: (value_start, span.1),
        });
    }
    out
}

/// Changes to apply to an `info` list.
pub struct InfoRewrite<'a> {
    pub change: &'a ArgChange,
    /// Lists that get `change` applied; an emptied list removes its entry.
    pub keys: Vec<ListKey<'a>>,
    /// Entries whose value is passed through `entry_rewrite`.
    pub rewrite_keys: &'a [&'a str],
    pub entry_rewrite: &'a dyn Fn(&str) -> String,
    /// Entry appended when none of `keys` exist.
    pub synthesize: Option<(&'a str, String)>,
}

/// Rewrite the `info` list `text[open..=close]`.
pub fn rewrite_info_list(text: &str, open: usize, close: usize, rw: &InfoRewrite<'_>) -> String {
    let InfoRewrite {
        change,
        keys,
        rewrite_keys,
        entry_rewrite,
        synthesize,
    } = rw;
    let classes = scanner::classify(text);
    let entries = info_entries(text, &classes, open, close);
    let spans: Vec<(usize, usize)> = entries.iter().map(|e| e.span).collect();
    let all = list_elements(text, &classes, open, close);
    let mut edits = Vec::new();
    let mut emptied = Vec::new();
    let mut found_key = false;

    for entry in &entries {
        let (vs, ve) = entry.value;
        if let Some(k) = keys.iter().find(|k| k.key == entry.key) {
            found_key = true;
            let value = &text[vs..ve];
            if !(value.starts_with('[') && value.ends_with(']')) {
                continue;
            }
            let list_close = ve - 1;
            let items: Vec<String> = list_elements(text, &classes, vs, list_close)
                .iter()
                .map(|(s, e)| text[*s..*e].to_string())
                .collect();
            let new_items = change.apply(&items, k.filler.clone());
            if new_items.is_empty() {
                emptied.extend(all.iter().position(|s| *s == entry.span));
            } else {
                let rendered = render_list(text, &classes, vs, list_close, &new_items);
                edits.push((vs, ve, rendered));
            }
        } else if rewrite_keys.contains(&entry.key.as_str()) {
            let value = &text[vs..ve];
            let new = entry_rewrite(value);
            if new != value {
                edits.push((vs, ve, new));
            }
        }
    }

    edits.extend(removal_spans(&all, &emptied));

    if let (false, Some((key, value))) = (found_key, synthesize.as_ref()) {
        let entry = format!("{} is {}", key, value);
        match spans.last() {
            Some(last) => {
                let sep = match all.len() {
                    n if n >= 2 => text[all[n - 2].1..all[n - 1].0].to_string(),
                    _ if text[open..=close].contains('\n') => {
                        format!(",\n{}", indent_at(text, last.0))
                    }
                    _ => ", ".to_string(),
                };
                edits.push((last.1, last.1, format!("{}{}", sep, entry)));
            }
            None => edits.push((open + 1, close, entry)),
        }
    }
    splice(text, edits)
}

/// Spans removing the elements at `indices` of `all`, each run of adjacent
/// elements together with one separator.
fn removal_spans(all: &[(usize, usize)], indices: &[usize]) -> Vec<(usize, usize, String)> {
    let mut sorted = indices.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    let mut out = Vec::new();
    let mut k = 0;
    while k < sorted.len() {
        let first = sorted[k];
        let mut last = first;
        while sorted.get(k + 1) == Some(&(last + 1)) {
            k += 1;
            last += 1;
        }
        k += 1;
        let span = if first > 0 {
            (all[first - 1].1, all[last].1)
        } else if let Some(next) = all.get(last + 1) {
            (all[first].0, next.0)
        } else {
            (all[first].0, all[last].1)
        };
        out.push((span.0, span.1, String::new()));
    }
    out
}

/// The list argument of `info/1` (`:- info([...]).`) or `info/2`
/// (`:- info(Indicator, [...]).`), as `(open, close)` offsets.
pub fn info_list(text: &str) -> Option<(usize, usize)> {
    let classes = scanner::classify(text);
    let call = directive_call(text, &classes)?;
    if call.name != "info" {
        return None;
    }
    let span = *call.args.last()?;
    let bytes = text.as_bytes();
    (bytes[span.0] == b'[' && bytes[span.1 - 1] == b']').then_some((span.0, span.1 - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use retalk_core::document::TextDocument;

    fn no_rewrite(s: &str) -> String {
        s.to_string()
    }

    mod classify_tests {
        use super::*;

        #[test]
        fn directive_names() {
            assert_eq!(directive_name(":- public(foo/1).").as_deref(), Some("public"));
            assert_eq!(
                directive_name("\t:- mode(foo(?integer), one).").as_deref(),
                Some("mode")
            );
            assert_eq!(directive_name("foo :- bar."), None);
            assert!(is_scope_directive("protected"));
            assert!(is_related_directive("meta_predicate"));
            assert!(!is_related_directive("initialization"));
        }

        #[test]
        fn declared_indicators_of_scope_directives() {
            let names = |text: &str| -> Vec<String> {
                declared_indicators(text).iter().map(ToString::to_string).collect()
            };
            assert_eq!(names(":- public(foo/1)."), vec!["foo/1"]);
            assert_eq!(names("\t:- public([a/0, b//2])."), vec!["a/0", "b//2"]);
            assert_eq!(names(":- private((a/0, b/1))."), vec!["a/0", "b/1"]);
        }
    }

    mod scan_tests {
        use super::*;

        const SRC: &str = "\
:- object(a).

\t:- public(foo/1).
\t:- mode(foo(?integer), zero_or_one).
\t% documentation
\t:- info(foo/1, [
\t\tcomment is 'Foo.'
\t]).
\t:- dynamic(bar/0).
\t:- public(baz/0).

\tfoo(1).

:- end_object.
";

        #[test]
        fn takes_related_run_and_stops_at_scope() {
            let doc = TextDocument::new("a.lgt", SRC);
            let found = scan_consecutive_directives(&doc, 3, |name, text| {
                if is_related_directive(name) && text.contains("foo") {
                    ScanStep::Take
                } else if is_related_directive(name) {
                    ScanStep::Skip
                } else {
                    ScanStep::Stop
                }
            });
            let starts: Vec<usize> = found.iter().map(|r| r.start).collect();
            assert_eq!(starts, vec![3, 5]);
            assert_eq!(found[1].end, 7);
        }

        #[test]
        fn stops_at_clause() {
            let doc = TextDocument::new("a.lgt", SRC);
            let found = scan_consecutive_directives(&doc, 10, |_, _| ScanStep::Take);
            assert!(found.is_empty());
        }

        #[test]
        fn unrelated_directive_stops() {
            let doc = TextDocument::new("a.lgt", ":- public(a/0).\n:- initialization(a).\n:- mode(a, one).\n");
            let found = scan_consecutive_directives(&doc, 1, |name, _| {
                if is_related_directive(name) {
                    ScanStep::Take
                } else {
                    ScanStep::Stop
                }
            });
            assert!(found.is_empty());
        }
    }

    mod list_tests {
        use super::*;

        #[test]
        fn single_line_list_keeps_separator() {
            let text = "x is ['A',  'B']";
            let classes = scanner::classify(text);
            let out = render_list(text, &classes, 5, 15, &["'A'".into(), "'C'".into(), "'B'".into()]);
            assert_eq!(out, "['A',  'C',  'B']");
        }

        #[test]
        fn multi_line_list_keeps_indentation() {
            let text = "\targuments is [\n\t\t'A' - 'a',\n\t\t'B' - 'b'\n\t]";
            let classes = scanner::classify(text);
            let open = text.find('[').unwrap();
            let close = text.rfind(']').unwrap();
            let out = render_list(text, &classes, open, close, &["'B' - 'b'".into()]);
            assert_eq!(out, "[\n\t\t'B' - 'b'\n\t]");
        }

        #[test]
        fn info_argnames_insert() {
            let text = ":- info(foo/1, [\n\tcomment is 'Foo.',\n\targnames is ['X']\n]).";
            let (open, close) = info_list(text).unwrap();
            let change = ArgChange::Insert { position: 2 };
            let rw = InfoRewrite {
                change: &change,
                keys: vec![ListKey {
                    key: "argnames",
                    filler: "'Y'".into(),
                }],
                rewrite_keys: &[],
                entry_rewrite: &no_rewrite,
                synthesize: None,
            };
            let out = rewrite_info_list(text, open, close, &rw);
            assert_eq!(out, ":- info(foo/1, [\n\tcomment is 'Foo.',\n\targnames is ['X', 'Y']\n]).");
        }

        #[test]
        fn info_emptied_list_removes_entry() {
            let text = ":- info(foo/1, [\n\tcomment is 'Foo.',\n\targnames is ['X']\n]).";
            let (open, close) = info_list(text).unwrap();
            let change = ArgChange::Remove { position: 1 };
            let rw = InfoRewrite {
                change: &change,
                keys: vec![ListKey {
                    key: "argnames",
                    filler: String::new(),
                }],
                rewrite_keys: &[],
                entry_rewrite: &no_rewrite,
                synthesize: None,
            };
            let out = rewrite_info_list(text, open, close, &rw);
            assert_eq!(out, ":- info(foo/1, [\n\tcomment is 'Foo.'\n]).");
        }

        #[test]
        fn adjacent_emptied_lists_are_both_removed() {
            let text = ":- info(foo/1, [argnames is ['X'], arguments is ['X' - 'x'], comment is 'Foo.']).";
            let (open, close) = info_list(text).unwrap();
            let change = ArgChange::Remove { position: 1 };
            let rw = InfoRewrite {
                change: &change,
                keys: vec![
                    ListKey {
                        key: "argnames",
                        filler: String::new(),
                    },
                    ListKey {
                        key: "arguments",
                        filler: String::new(),
                    },
                ],
                rewrite_keys: &[],
                entry_rewrite: &no_rewrite,
                synthesize: None,
            };
            let out = rewrite_info_list(text, open, close, &rw);
            assert_eq!(out, ":- info(foo/1, [comment is 'Foo.']).");
        }

        #[test]
        fn removal_spans_merge_runs() {
            let all = [(1, 3), (5, 7), (9, 11), (13, 15)];
            assert_eq!(
                removal_spans(&all, &[0, 1, 3]),
                vec![(1, 9, String::new()), (11, 15, String::new())]
            );
            assert_eq!(removal_spans(&all, &[0, 1, 2, 3]), vec![(1, 15, String::new())]);
        }

        #[test]
        fn info_synthesizes_missing_list() {
            let text = ":- info(foo/0, [\n\tcomment is 'Foo.'\n]).";
            let (open, close) = info_list(text).unwrap();
            let change = ArgChange::Insert { position: 1 };
            let rw = InfoRewrite {
                change: &change,
                keys: vec![ListKey {
                    key: "argnames",
                    filler: "'X'".into(),
                }],
                rewrite_keys: &[],
                entry_rewrite: &no_rewrite,
                synthesize: Some(("argnames", "['X']".into())),
            };
            let out = rewrite_info_list(text, open, close, &rw);
            assert_eq!(
                out,
                ":- info(foo/0, [\n\tcomment is 'Foo.',\n\targnames is ['X']\n])."
            );
        }

        #[test]
        fn info_examples_rewritten_by_callback() {
            let text = ":- info(foo/1, [examples is ['Ex' - foo(1) - {yes}]]).";
            let (open, close) = info_list(text).unwrap();
            let change = ArgChange::Remove { position: 1 };
            let rewrite = |v: &str| v.replace("foo(1)", "foo");
            let rw = InfoRewrite {
                change: &change,
                keys: Vec::new(),
                rewrite_keys: &["examples"],
                entry_rewrite: &rewrite,
                synthesize: None,
            };
            let out = rewrite_info_list(text, open, close, &rw);
            assert_eq!(out, ":- info(foo/1, [examples is ['Ex' - foo - {yes}]]).");
        }
    }
}
