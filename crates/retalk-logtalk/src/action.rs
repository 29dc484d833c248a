//! Typed refactoring actions.
//!
//! The detector produces [`RefactorAction`] values; the host stores them in
//! the `arguments` of a code action and passes them back on execution, so
//! every payload serializes with a `kind` tag.

use retalk_core::output::CodeAction;
use retalk_core::types::{Position, Range};
use serde::{Deserialize, Serialize};

use crate::syntax::{EntityIdentifier, EntityKind, Indicator};

/// Prefix of every command id.
pub const COMMAND_PREFIX: &str = "logtalk.refactor.";

/// A predicate or non-terminal at a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateTarget {
    pub uri: String,
    pub position: Position,
    pub indicator: Indicator,
}

/// An entity opening directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTarget {
    pub uri: String,
    /// Position of the entity name in the opening directive.
    pub position: Position,
    pub kind: EntityKind,
    pub entity: EntityIdentifier,
}

/// Entity type conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertTarget {
    pub uri: String,
    pub position: Position,
    pub from: EntityKind,
    pub to: EntityKind,
}

/// A selection of source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionTarget {
    pub uri: String,
    pub range: Range,
}

/// A variable at a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableTarget {
    pub uri: String,
    pub position: Position,
    pub variable: String,
}

/// A directive starting at a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectiveTarget {
    pub uri: String,
    pub line: u32,
    pub directive: String,
}

/// A numeric literal at a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberTarget {
    pub uri: String,
    pub position: Position,
    pub number: String,
}

/// One refactoring with its precomputed detector output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RefactorAction {
    AddArgument(PredicateTarget),
    RemoveArgument(PredicateTarget),
    ReorderArguments(PredicateTarget),
    AddParameter(EntityTarget),
    RemoveParameter(EntityTarget),
    ReorderParameters(EntityTarget),
    ExtractToEntity(SelectionTarget),
    ExtractToNewEntity(SelectionTarget),
    ExtractToNewFile(SelectionTarget),
    ExtractProtocol(EntityTarget),
    ConvertEntity(ConvertTarget),
    InlineVariable(VariableTarget),
    UnifyWithNewVariable(SelectionTarget),
    IncrementNumberedVariables(VariableTarget),
    DecrementNumberedVariables(VariableTarget),
    SplitListDirective(DirectiveTarget),
    SortListDirective(DirectiveTarget),
    ReplaceMagicNumber(NumberTarget),
    IncludeFileContents(DirectiveTarget),
    ReplaceWithInclude(SelectionTarget),
}

impl RefactorAction {
    /// camelCase kind used in the command id.
    pub fn kind_name(&self) -> &'static str {
        match self {
            RefactorAction::AddArgument(_) => "addArgument",
            RefactorAction::RemoveArgument(_) => "removeArgument",
            RefactorAction::ReorderArguments(_) => "reorderArguments",
            RefactorAction::AddParameter(_) => "addParameter",
            RefactorAction::RemoveParameter(_) => "removeParameter",
            RefactorAction::ReorderParameters(_) => "reorderParameters",
            RefactorAction::ExtractToEntity(_) => "extractToEntity",
            RefactorAction::ExtractToNewEntity(_) => "extractToNewEntity",
            RefactorAction::ExtractToNewFile(_) => "extractToNewFile",
            RefactorAction::ExtractProtocol(_) => "extractProtocol",
            RefactorAction::ConvertEntity(_) => "convertEntity",
            RefactorAction::InlineVariable(_) => "inlineVariable",
            RefactorAction::UnifyWithNewVariable(_) => "unifyWithNewVariable",
            RefactorAction::IncrementNumberedVariables(_) => "incrementNumberedVariables",
            RefactorAction::DecrementNumberedVariables(_) => "decrementNumberedVariables",
            RefactorAction::SplitListDirective(_) => "splitListDirective",
            RefactorAction::SortListDirective(_) => "sortListDirective",
            RefactorAction::ReplaceMagicNumber(_) => "replaceMagicNumber",
            RefactorAction::IncludeFileContents(_) => "includeFileContents",
            RefactorAction::ReplaceWithInclude(_) => "replaceWithInclude",
        }
    }

    /// Full command id, `logtalk.refactor.<kind>`.
    pub fn command(&self) -> String {
        format!("{}{}", COMMAND_PREFIX, self.kind_name())
    }

    /// Whether `name` names this action (bare kind or full command id).
    pub fn matches_command(&self, name: &str) -> bool {
        let bare = name.strip_prefix(COMMAND_PREFIX).unwrap_or(name);
        bare.eq_ignore_ascii_case(self.kind_name())
    }

    /// Menu title.
    pub fn title(&self) -> String {
        match self {
            RefactorAction::AddArgument(t) => format!("Add argument to {}", t.indicator),
            RefactorAction::RemoveArgument(t) => format!("Remove argument from {}", t.indicator),
            RefactorAction::ReorderArguments(t) => format!("Reorder arguments of {}", t.indicator),
            RefactorAction::AddParameter(t) => format!("Add parameter to {}", t.entity.name),
            RefactorAction::RemoveParameter(t) => format!("Remove parameter from {}", t.entity.name),
            RefactorAction::ReorderParameters(t) => format!("Reorder parameters of {}", t.entity.name),
            RefactorAction::ExtractToEntity(_) => "Extract to existing entity".to_string(),
            RefactorAction::ExtractToNewEntity(_) => "Extract to new entity".to_string(),
            RefactorAction::ExtractToNewFile(_) => "Extract to new file".to_string(),
            RefactorAction::ExtractProtocol(t) => format!("Extract protocol from {}", t.entity.name),
            RefactorAction::ConvertEntity(t) => format!("Convert {} to {}", t.from, t.to),
            RefactorAction::InlineVariable(t) => format!("Inline variable {}", t.variable),
            RefactorAction::UnifyWithNewVariable(_) => "Unify with new variable".to_string(),
            RefactorAction::IncrementNumberedVariables(t) => {
                format!("Increment numbered variables from {}", t.variable)
            }
            RefactorAction::DecrementNumberedVariables(t) => {
                format!("Decrement numbered variables from {}", t.variable)
            }
            RefactorAction::SplitListDirective(t) => format!("Split {} directive", t.directive),
            RefactorAction::SortListDirective(t) => format!("Sort {} directive", t.directive),
            RefactorAction::ReplaceMagicNumber(t) => {
                format!("Replace magic number {} with a predicate", t.number)
            }
            RefactorAction::IncludeFileContents(_) => "Replace include with file contents".to_string(),
            RefactorAction::ReplaceWithInclude(_) => "Replace with include directive".to_string(),
        }
    }

    /// URI of the document the action was detected in.
    pub fn uri(&self) -> &str {
        match self {
            RefactorAction::AddArgument(t)
            | RefactorAction::RemoveArgument(t)
            | RefactorAction::ReorderArguments(t) => &t.uri,
            RefactorAction::AddParameter(t)
            | RefactorAction::RemoveParameter(t)
            | RefactorAction::ReorderParameters(t)
            | RefactorAction::ExtractProtocol(t) => &t.uri,
            RefactorAction::ExtractToEntity(t)
            | RefactorAction::ExtractToNewEntity(t)
            | RefactorAction::ExtractToNewFile(t)
            | RefactorAction::UnifyWithNewVariable(t)
            | RefactorAction::ReplaceWithInclude(t) => &t.uri,
            RefactorAction::ConvertEntity(t) => &t.uri,
            RefactorAction::InlineVariable(t)
            | RefactorAction::IncrementNumberedVariables(t)
            | RefactorAction::DecrementNumberedVariables(t) => &t.uri,
            RefactorAction::SplitListDirective(t)
            | RefactorAction::SortListDirective(t)
            | RefactorAction::IncludeFileContents(t) => &t.uri,
            RefactorAction::ReplaceMagicNumber(t) => &t.uri,
        }
    }

    /// Menu entry for this action.
    pub fn to_code_action(&self) -> CodeAction {
        CodeAction {
            title: self.title(),
            command: self.command(),
            arguments: serde_json::to_value(self).into_iter().collect(),
        }
    }

    /// Recover an action from code-action arguments.
    pub fn from_arguments(arguments: &[serde_json::Value]) -> Option<Self> {
        arguments
            .iter()
            .find_map(|v| serde_json::from_value(v.clone()).ok())
    }
}
