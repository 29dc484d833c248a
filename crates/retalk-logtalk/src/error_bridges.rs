//! Error bridge from engine errors to the unified `RetalkError`.
//!
//! The bridge lives here rather than in `retalk-core` because it depends on
//! `RefactorError`, which core does not know about. Host and interaction
//! errors are bridged in core itself.

use retalk_core::error::RetalkError;

use crate::error::RefactorError;

// ============================================================================
// Bridge: RefactorError -> RetalkError
// ============================================================================

impl From<RefactorError> for RetalkError {
    fn from(err: RefactorError) -> Self {
        match err {
            // The location is only known to the caller; front doors that have
            // it build `RetalkError::NotApplicable` themselves.
            RefactorError::NotApplicable(message) => RetalkError::invalid_args(message),
            RefactorError::Precondition(message) => RetalkError::PreconditionFailed { message },
            RefactorError::Cancelled => RetalkError::Cancelled,
            RefactorError::Host(host_err) => RetalkError::from(host_err),
            RefactorError::Conflict(conflicts) => RetalkError::conflicts(conflicts),
            RefactorError::Interaction(interaction_err) => RetalkError::from(interaction_err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retalk_core::error::OutputErrorCode;
    use retalk_core::host::HostError;
    use retalk_core::patch::Conflict;

    #[test]
    fn precondition_keeps_message() {
        let err = RetalkError::from(RefactorError::precondition("protocols cannot contain clauses"));
        assert_eq!(err.error_code(), OutputErrorCode::PreconditionFailed);
        assert_eq!(err.to_string(), "protocols cannot contain clauses");
    }

    #[test]
    fn host_failures_pass_through() {
        let err = RetalkError::from(RefactorError::Host(HostError::NotFound {
            uri: "a.lgt".to_string(),
        }));
        assert_eq!(err.error_code(), OutputErrorCode::ResolutionError);
    }

    #[test]
    fn conflicts_are_apply_errors() {
        let err = RetalkError::from(RefactorError::Conflict(vec![Conflict::FileExists {
            uri: "b.lgt".to_string(),
        }]));
        assert_eq!(err.error_code(), OutputErrorCode::ApplyError);
    }
}
