//! Heuristic text index implementing [`SymbolProvider`].
//!
//! Every query rescans the workspace through the host; nothing is cached
//! between calls. Scoping follows entity relations: a predicate is looked
//! up in the entity at the cursor (or the `Obj::` receiver) and its
//! ancestors, and references are accepted from that family plus the
//! entities descending from it.

use std::collections::{BTreeSet, HashSet, VecDeque};

use retalk_core::document::{Document, TextDocument};
use retalk_core::host::{Host, SymbolProvider};
use retalk_core::types::{Location, Position};
use tracing::{debug, warn};

use crate::boundary::{self, ClauseKind, TermRange};
use crate::callable::{self, MentionKind};
use crate::directives;
use crate::scanner;
use crate::symbol::{self, Symbol};
use crate::syntax::{self, EntityKind, EntityOpening, Indicator};

/// Workspace symbol index backed by lexical scanning.
pub struct TextIndex<'h> {
    host: &'h dyn Host,
}

#[derive(Debug, Clone)]
struct EntityInfo {
    doc: usize,
    name: String,
    kind: EntityKind,
    opening: TermRange,
    /// Byte offset of the identifier in the opening directive text.
    name_offset: usize,
    end_line: usize,
    relations: Vec<String>,
}

struct Snapshot {
    docs: Vec<TextDocument>,
    entities: Vec<EntityInfo>,
}

impl<'h> TextIndex<'h> {
    /// Create an index over the host's workspace files.
    pub fn new(host: &'h dyn Host) -> Self {
        TextIndex { host }
    }

    fn snapshot(&self, current: &dyn Document) -> Snapshot {
        let mut docs = Vec::new();
        let mut have_current = false;
        for uri in self.host.workspace_files() {
            if uri == current.uri() {
                have_current = true;
            }
            match self.host.open_document(&uri) {
                Ok(doc) => docs.push(doc),
                Err(err) => warn!(%uri, error = %err, "skipping unreadable file"),
            }
        }
        if !have_current && current.line_count() > 0 {
            let text = current.lines_text(0, current.line_count() - 1);
            docs.push(TextDocument::new(current.uri(), &text));
        }
        let mut entities = Vec::new();
        for (i, doc) in docs.iter().enumerate() {
            for range in boundary::entities(doc) {
                let text = doc.lines_text(range.opening.start, range.opening.end);
                let Some(opening) = EntityOpening::parse(&text) else {
                    continue;
                };
                entities.push(EntityInfo {
                    doc: i,
                    name: opening.identifier.name.clone(),
                    kind: range.kind,
                    opening: range.opening,
                    name_offset: opening.args.first().map_or(0, |a| a.0),
                    end_line: range.end_line.unwrap_or(doc.line_count()),
                    relations: opening.relations.iter().flat_map(|r| r.targets()).collect(),
                });
            }
        }
        Snapshot { docs, entities }
    }
}

impl Snapshot {
    fn doc_index(&self, uri: &str) -> Option<usize> {
        self.docs.iter().position(|d| d.uri() == uri)
    }

    fn entity_at(&self, doc: usize, line: usize) -> Option<&EntityInfo> {
        self.entities
            .iter()
            .find(|e| e.doc == doc && e.opening.start <= line && line <= e.end_line)
    }

    fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a EntityInfo> + 'a {
        self.entities.iter().filter(move |e| e.name == name)
    }

    /// `start` followed by everything reachable through relations.
    fn ancestors(&self, start: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut queue = VecDeque::from([start.to_string()]);
        while let Some(name) = queue.pop_front() {
            if out.contains(&name) {
                continue;
            }
            for e in self.named(&name) {
                queue.extend(e.relations.iter().cloned());
            }
            out.push(name);
        }
        out
    }

    /// Entities whose relations reach any of `roots`.
    fn descendants(&self, roots: &[String]) -> Vec<String> {
        let mut found: BTreeSet<String> = BTreeSet::new();
        let mut frontier: Vec<String> = roots.to_vec();
        while let Some(name) = frontier.pop() {
            for e in &self.entities {
                if e.relations.contains(&name) && found.insert(e.name.clone()) {
                    frontier.push(e.name.clone());
                }
            }
        }
        found.into_iter().filter(|n| !roots.contains(n)).collect()
    }

    fn body_terms(&self, entity: &EntityInfo) -> Vec<TermRange> {
        let doc = &self.docs[entity.doc];
        boundary::terms_in(doc, entity.opening.end + 1..entity.end_line)
    }

    fn location(&self, doc: usize, term: &TermRange, text: &str, offset: usize) -> Location {
        let d = &self.docs[doc];
        Location::at(d.uri(), symbol::offset_position(d, term.start, text, offset))
    }

    /// Scope directive in `entity` declaring `indicator`.
    fn declaration_in(&self, entity: &EntityInfo, indicator: &Indicator) -> Option<Location> {
        let doc = &self.docs[entity.doc];
        for term in self.body_terms(entity) {
            let text = doc.lines_text(term.start, term.end);
            let is_scope = directives::directive_name(&text)
                .is_some_and(|n| directives::is_scope_directive(&n));
            if !is_scope || !boundary::is_directive_start(&text) {
                continue;
            }
            if let Some(m) = callable::mentions(&text, indicator)
                .into_iter()
                .find(|m| m.kind == MentionKind::Indicator)
            {
                return Some(self.location(entity.doc, &term, &text, m.offset));
            }
        }
        None
    }

    /// First clause in `entity` whose head is `indicator`.
    fn definition_in(&self, entity: &EntityInfo, indicator: &Indicator) -> Option<Location> {
        let doc = &self.docs[entity.doc];
        for term in self.body_terms(entity) {
            let text = doc.lines_text(term.start, term.end);
            if boundary::is_directive_start(&text) {
                continue;
            }
            if let Some(offset) = head_offset(doc, &term, &text, indicator) {
                return Some(self.location(entity.doc, &term, &text, offset));
            }
        }
        None
    }
}

/// Offset of the clause head when it is a definition of `indicator`.
pub(crate) fn head_offset(doc: &dyn Document, term: &TermRange, text: &str, indicator: &Indicator) -> Option<usize> {
    let start = text.len() - text.trim_start().len();
    let classes = scanner::classify(text);
    let head = syntax::parse_callable_at(text, &classes, start)?;
    let kind = boundary::get_clause_range(doc, term.start).kind;
    let grammar = kind == ClauseKind::GrammarRule;
    (head.name == indicator.name && head.arity() == indicator.arity && grammar == indicator.non_terminal)
        .then_some(start)
}

impl TextIndex<'_> {
    fn predicate_family(&self, snap: &Snapshot, doc: &dyn Document, position: Position) -> Option<(Indicator, Vec<String>)> {
        let at = symbol::symbol_at(doc, position)?;
        let Symbol::Predicate(indicator) = at.symbol else {
            return None;
        };
        let start = match at.qualifier {
            Some(q) => q,
            None => {
                let i = snap.doc_index(doc.uri())?;
                snap.entity_at(i, position.line as usize)?.name.clone()
            }
        };
        Some((indicator, snap.ancestors(&start)))
    }
}

impl SymbolProvider for TextIndex<'_> {
    fn find_declaration(&self, doc: &dyn Document, position: Position) -> Option<Location> {
        let snap = self.snapshot(doc);
        match symbol::symbol_at(doc, position)?.symbol {
            Symbol::Entity { name, .. } => entity_location(&snap, &name),
            Symbol::Predicate(_) => {
                let (indicator, scope) = self.predicate_family(&snap, doc, position)?;
                let found = scope
                    .iter()
                    .flat_map(|n| snap.named(n))
                    .find_map(|e| snap.declaration_in(e, &indicator));
                found
            }
        }
    }

    fn find_definition(&self, doc: &dyn Document, position: Position) -> Option<Location> {
        let snap = self.snapshot(doc);
        match symbol::symbol_at(doc, position)?.symbol {
            Symbol::Entity { name, .. } => entity_location(&snap, &name),
            Symbol::Predicate(_) => {
                let (indicator, scope) = self.predicate_family(&snap, doc, position)?;
                let found = scope
                    .iter()
                    .flat_map(|n| snap.named(n))
                    .filter(|e| e.kind != EntityKind::Protocol)
                    .find_map(|e| snap.definition_in(e, &indicator));
                found
            }
        }
    }

    fn find_implementations(&self, doc: &dyn Document, position: Position) -> Vec<Location> {
        let snap = self.snapshot(doc);
        let Some((indicator, scope)) = self.predicate_family(&snap, doc, position) else {
            return Vec::new();
        };
        let declaring: Vec<String> = scope
            .iter()
            .filter(|n| snap.named(n).any(|e| snap.declaration_in(e, &indicator).is_some()))
            .cloned()
            .collect();
        snap.descendants(&declaring)
            .iter()
            .flat_map(|n| snap.named(n))
            .filter_map(|e| snap.definition_in(e, &indicator))
            .collect()
    }

    fn find_references(&self, doc: &dyn Document, position: Position) -> Vec<Location> {
        let snap = self.snapshot(doc);
        let Some(at) = symbol::symbol_at(doc, position) else {
            return Vec::new();
        };
        let found = match at.symbol {
            Symbol::Entity { name, arity } => entity_references(&snap, &name, arity),
            Symbol::Predicate(_) => match self.predicate_family(&snap, doc, position) {
                Some((indicator, scope)) => {
                    let mut family = scope.clone();
                    family.extend(snap.descendants(&scope));
                    predicate_references(&snap, &indicator, &family)
                }
                None => Vec::new(),
            },
        };
        debug!(count = found.len(), "text index references");
        found
    }
}

fn entity_location(snap: &Snapshot, name: &str) -> Option<Location> {
    let e = snap.named(name).next()?;
    let doc = &snap.docs[e.doc];
    let text = doc.lines_text(e.opening.start, e.opening.end);
    Some(snap.location(e.doc, &e.opening, &text, e.name_offset))
}

fn predicate_references(snap: &Snapshot, indicator: &Indicator, family: &[String]) -> Vec<Location> {
    let family: HashSet<&str> = family.iter().map(String::as_str).collect();
    let mut out = Vec::new();
    for (i, doc) in snap.docs.iter().enumerate() {
        for term in boundary::terms_in(doc, 0..doc.line_count()) {
            let text = doc.lines_text(term.start, term.end);
            let found = callable::mentions(&text, indicator);
            if found.is_empty() {
                continue;
            }
            let entity = snap.entity_at(i, term.start);
            let local = entity.is_some_and(|e| {
                family.contains(e.name.as_str()) || imports_from(snap, e, indicator, &family)
            });
            for m in found {
                let accepted = match &m.qualifier {
                    Some(Some(q)) => family.contains(q.as_str()),
                    Some(None) | None => local,
                };
                if accepted {
                    out.push(snap.location(i, &term, &text, m.offset));
                }
            }
        }
    }
    out
}

/// Whether `entity` has a `uses/2` directive importing `indicator` from the family.
fn imports_from(snap: &Snapshot, entity: &EntityInfo, indicator: &Indicator, family: &HashSet<&str>) -> bool {
    let doc = &snap.docs[entity.doc];
    snap.body_terms(entity).iter().any(|term| {
        let text = doc.lines_text(term.start, term.end);
        let classes = scanner::classify(&text);
        let Some(call) = directives::directive_call(&text, &classes) else {
            return false;
        };
        if call.name != "uses" || call.arity() != 2 {
            return false;
        }
        let object = entity_name(&text[call.args[0].0..call.args[0].1]);
        family.contains(object.as_str()) && !callable::mentions(&text, indicator).is_empty()
    })
}

fn entity_name(text: &str) -> String {
    syntax::EntityIdentifier::parse(text).map_or_else(|| text.to_string(), |id| id.name)
}

fn entity_references(snap: &Snapshot, name: &str, arity: usize) -> Vec<Location> {
    let mut out = Vec::new();
    for (i, doc) in snap.docs.iter().enumerate() {
        for term in boundary::terms_in(doc, 0..doc.line_count()) {
            let text = doc.lines_text(term.start, term.end);
            let classes = scanner::classify(&text);
            for start in syntax::name_occurrences(&text, &classes, name) {
                let Some(call) = syntax::parse_callable_at(&text, &classes, start) else {
                    continue;
                };
                if call.arity() != arity || syntax::followed_by_indicator(&text, call.end).is_some() {
                    continue;
                }
                out.push(snap.location(i, &term, &text, start));
            }
        }
    }
    out
}
