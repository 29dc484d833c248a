//! Common position types shared by every layer of the engine.
//!
//! Positions follow editor conventions:
//! - `line`: 0-indexed line number
//! - `character`: 0-indexed column counted in UTF-16 code units of that line
//!
//! The CLI accepts 1-indexed `path:line:col` strings; [`CliLocation`] performs
//! that conversion at the edge so nothing below it deals with 1-based values.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Position / Range
// ============================================================================

/// A position inside a document (0-based line, UTF-16 column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Line number (0-indexed).
    pub line: u32,
    /// Column in UTF-16 code units (0-indexed).
    pub character: u32,
}

impl Position {
    /// Create a new position.
    pub fn new(line: u32, character: u32) -> Self {
        Position { line, character }
    }

    /// Position at the start of a line.
    pub fn line_start(line: u32) -> Self {
        Position { line, character: 0 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.character)
    }
}

/// An ordered pair of positions; `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    /// Start position (inclusive).
    pub start: Position,
    /// End position (exclusive).
    pub end: Position,
}

impl Range {
    /// Create a new range, swapping the endpoints if they are out of order.
    pub fn new(start: Position, end: Position) -> Self {
        if end < start {
            Range {
                start: end,
                end: start,
            }
        } else {
            Range { start, end }
        }
    }

    /// Empty range at a single position.
    pub fn point(position: Position) -> Self {
        Range {
            start: position,
            end: position,
        }
    }

    /// Check if the range is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if this range spans a single line.
    pub fn is_single_line(&self) -> bool {
        self.start.line == self.end.line
    }

    /// Check if this range overlaps with another.
    ///
    /// Adjacent ranges (one ends where another starts) do NOT overlap.
    pub fn overlaps(&self, other: &Range) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Check if a position lies inside this range (end inclusive, for cursors).
    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// ============================================================================
// Location
// ============================================================================

/// A range inside a specific file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// File URI or workspace-relative path.
    pub uri: String,
    /// Range within the file.
    pub range: Range,
}

impl Location {
    /// Create a new location.
    pub fn new(uri: impl Into<String>, range: Range) -> Self {
        Location {
            uri: uri.into(),
            range,
        }
    }

    /// Location covering a single position.
    pub fn at(uri: impl Into<String>, position: Position) -> Self {
        Location {
            uri: uri.into(),
            range: Range::point(position),
        }
    }

    /// Deduplication key: (file, start line).
    pub fn line_key(&self) -> (&str, u32) {
        (&self.uri, self.range.start.line)
    }
}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (&self.uri, self.range.start, self.range.end).cmp(&(
            &other.uri,
            other.range.start,
            other.range.end,
        ))
    }
}

/// How a location relates to the symbol it was collected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    /// Scope directive declaring the symbol.
    Declaration,
    /// Clause defining the symbol.
    Definition,
    /// Definition in an entity implementing a declaring protocol.
    Implementation,
    /// Call site or other mention.
    Reference,
}

/// A location tagged with how it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedLocation {
    /// Where.
    pub location: Location,
    /// Why it was collected.
    pub kind: LocationKind,
}

impl TaggedLocation {
    /// Create a tagged location.
    pub fn new(location: Location, kind: LocationKind) -> Self {
        TaggedLocation { location, kind }
    }
}

// ============================================================================
// CLI Location
// ============================================================================

/// A 1-indexed `path:line:col` location as typed on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliLocation {
    /// File path.
    pub file: String,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub col: u32,
}

impl CliLocation {
    /// Parse a location from "path:line:col" format.
    ///
    /// This parsing is robust against paths containing colons (e.g., Windows paths).
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.rsplitn(3, ':').collect();
        if parts.len() != 3 {
            return None;
        }
        let col: u32 = parts[0].parse().ok()?;
        let line: u32 = parts[1].parse().ok()?;
        Some(CliLocation {
            file: parts[2].to_string(),
            line,
            col,
        })
    }

    /// Parse a bare "line:col" pair (used for selection ends).
    pub fn parse_line_col(s: &str) -> Option<(u32, u32)> {
        let (line, col) = s.split_once(':')?;
        Some((line.parse().ok()?, col.parse().ok()?))
    }

    /// Convert to a 0-based position. Columns here count characters; callers
    /// holding the line text should prefer [`crate::text::char_col_to_utf16`].
    pub fn position(&self) -> Position {
        Position::new(self.line.saturating_sub(1), self.col.saturating_sub(1))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod range_tests {
        use super::*;

        #[test]
        fn range_new_orders_endpoints() {
            let r = Range::new(Position::new(3, 0), Position::new(1, 4));
            assert_eq!(r.start, Position::new(1, 4));
            assert_eq!(r.end, Position::new(3, 0));
        }

        #[test]
        fn adjacent_ranges_do_not_overlap() {
            let a = Range::new(Position::new(0, 0), Position::new(0, 5));
            let b = Range::new(Position::new(0, 5), Position::new(0, 9));
            assert!(!a.overlaps(&b));
            assert!(!b.overlaps(&a));
        }

        #[test]
        fn multi_line_ranges_overlap() {
            let a = Range::new(Position::new(0, 0), Position::new(2, 1));
            let b = Range::new(Position::new(1, 3), Position::new(4, 0));
            assert!(a.overlaps(&b));
        }

        #[test]
        fn contains_is_end_inclusive() {
            let r = Range::new(Position::new(1, 2), Position::new(1, 6));
            assert!(r.contains(Position::new(1, 6)));
            assert!(!r.contains(Position::new(1, 7)));
        }
    }

    mod location_tests {
        use super::*;

        #[test]
        fn location_serializes_range() {
            let loc = Location::at("a.lgt", Position::new(4, 2));
            let json = serde_json::to_string(&loc).unwrap();
            assert!(json.contains("\"uri\":\"a.lgt\""));
            assert!(json.contains("\"line\":4"));
            assert!(json.contains("\"character\":2"));
        }

        #[test]
        fn line_key_ignores_column() {
            let a = Location::at("a.lgt", Position::new(4, 2));
            let b = Location::at("a.lgt", Position::new(4, 9));
            assert_eq!(a.line_key(), b.line_key());
        }
    }

    mod cli_location_tests {
        use super::*;

        #[test]
        fn parse_valid() {
            let loc = CliLocation::parse("src/list.lgt:42:5").unwrap();
            assert_eq!(loc.file, "src/list.lgt");
            assert_eq!(loc.line, 42);
            assert_eq!(loc.col, 5);
            assert_eq!(loc.position(), Position::new(41, 4));
        }

        #[test]
        fn parse_windows_path() {
            let loc = CliLocation::parse("C:/work/list.lgt:10:3").unwrap();
            assert_eq!(loc.file, "C:/work/list.lgt");
        }

        #[test]
        fn parse_invalid() {
            assert!(CliLocation::parse("list.lgt").is_none());
            assert!(CliLocation::parse("list.lgt:4").is_none());
            assert!(CliLocation::parse("list.lgt:x:4").is_none());
        }

        #[test]
        fn parse_line_col_pair() {
            assert_eq!(CliLocation::parse_line_col("3:9"), Some((3, 9)));
            assert_eq!(CliLocation::parse_line_col("3"), None);
        }
    }
}
