//! Reference locator.
//!
//! Aggregates the four symbol-provider queries into one ordered,
//! deduplicated location list: declaration, definition, implementations,
//! references. The dedup key is (file, start line) and the first
//! occurrence wins, so a line reported both as a definition and as a
//! reference is handled as a definition.
//!
//! Without a declaration the implementation and reference queries are
//! issued from the definition instead of the original position.

use std::collections::HashSet;

use retalk_core::document::Document;
use retalk_core::document::TextDocument;
use retalk_core::host::{CancellationToken, Host, SymbolProvider};
use retalk_core::types::{Location, LocationKind, Position, TaggedLocation};
use tracing::debug;

use crate::error::{RefactorError, RefactorResult};

/// Collect every location of the symbol at `position`.
pub fn locate(
    host: &dyn Host,
    symbols: &dyn SymbolProvider,
    cancel: &CancellationToken,
    doc: &dyn Document,
    position: Position,
) -> RefactorResult<Vec<TaggedLocation>> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |location: Location, kind: LocationKind| {
        let key = (location.uri.clone(), location.range.start.line);
        if seen.insert(key) {
            out.push(TaggedLocation::new(location, kind));
        }
    };

    let declaration = symbols.find_declaration(doc, position);
    let definition = symbols.find_definition(doc, position);

    let anchor_doc: Option<TextDocument> = match (&declaration, &definition) {
        (None, Some(def)) if def.uri != doc.uri() => Some(host.open_document(&def.uri)?),
        _ => None,
    };
    let (anchor, anchor_position): (&dyn Document, Position) = match (&declaration, &definition, &anchor_doc) {
        (None, Some(def), Some(other)) => (other as &dyn Document, def.range.start),
        (None, Some(def), None) => (doc, def.range.start),
        _ => (doc, position),
    };
    if declaration.is_none() && definition.is_some() {
        debug!(uri = anchor.uri(), position = %anchor_position, "no declaration, anchoring on the definition");
    }

    if let Some(location) = declaration {
        push(location, LocationKind::Declaration);
    }
    if let Some(location) = definition {
        push(location, LocationKind::Definition);
    }
    for location in symbols.find_implementations(anchor, anchor_position) {
        push(location, LocationKind::Implementation);
    }

    if cancel.is_cancelled() {
        return Err(RefactorError::Cancelled);
    }
    for location in symbols.find_references(anchor, anchor_position) {
        push(location, LocationKind::Reference);
    }
    debug!(count = out.len(), "located symbol");
    Ok(out)
}
