//! Refactoring errors.

use retalk_core::host::HostError;
use retalk_core::interaction::InteractionError;
use retalk_core::patch::Conflict;
use thiserror::Error;

/// Errors raised while planning or executing a refactoring.
///
/// Every variant aborts the refactoring with no edits applied.
#[derive(Debug, Error)]
pub enum RefactorError {
    /// The cursor or selection does not match the refactoring's shape.
    #[error("not applicable: {0}")]
    NotApplicable(String),

    /// The refactoring was offered but a downstream check failed.
    #[error("{0}")]
    Precondition(String),

    /// A prompt was cancelled or cancellation was requested.
    #[error("refactoring cancelled")]
    Cancelled,

    /// Opening a document or applying the batch failed.
    #[error(transparent)]
    Host(#[from] HostError),

    /// The assembled edits conflict with each other.
    #[error("conflicting edits: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Conflict(Vec<Conflict>),

    /// A prompt failed for a reason other than cancellation.
    #[error("interaction failed: {0}")]
    Interaction(InteractionError),
}

impl RefactorError {
    /// Shorthand for [`RefactorError::Precondition`].
    pub fn precondition(message: impl Into<String>) -> Self {
        RefactorError::Precondition(message.into())
    }

    /// Shorthand for [`RefactorError::NotApplicable`].
    pub fn not_applicable(message: impl Into<String>) -> Self {
        RefactorError::NotApplicable(message.into())
    }
}

impl From<InteractionError> for RefactorError {
    fn from(err: InteractionError) -> Self {
        match err {
            InteractionError::Cancelled => RefactorError::Cancelled,
            other => RefactorError::Interaction(other),
        }
    }
}

pub type RefactorResult<T> = Result<T, RefactorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_prompt_maps_to_cancelled() {
        let err: RefactorError = InteractionError::Cancelled.into();
        assert!(matches!(err, RefactorError::Cancelled));
        let err: RefactorError = InteractionError::NonTty.into();
        assert!(matches!(err, RefactorError::Interaction(_)));
    }

    #[test]
    fn precondition_message_is_verbatim() {
        assert_eq!(
            RefactorError::precondition("no locations found").to_string(),
            "no locations found"
        );
    }
}
