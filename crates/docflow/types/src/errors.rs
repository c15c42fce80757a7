//! Error types for docflow

use crate::{display_state, Permission, StateLabel, TransitionId};

/// Errors that can occur in workflow operations.
///
/// Every variant is a normal, typed outcome; none are retried or
/// recovered inside the engine.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The named transition does not leave the given state
    #[error("Invalid transition from state: {}", display_state(.state))]
    InvalidTransition { state: Option<StateLabel> },

    /// The transition exists but its guard currently refuses it
    #[error("Transition condition not satisfied: {transition}")]
    ConditionFailed { transition: TransitionId },

    #[error("No transition available: {} -> {}", display_state(.from), display_state(.to))]
    NoTransitionAvailable {
        from: Option<StateLabel>,
        to: Option<StateLabel>,
    },

    /// More than one transition is eligible toward the same destination
    #[error("Ambiguous transition: {} -> {}", display_state(.from), display_state(.to))]
    AmbiguousTransition {
        from: Option<StateLabel>,
        to: Option<StateLabel>,
    },

    #[error("Unauthorized: transition '{transition}' requires permission '{permission}'")]
    Unauthorized {
        transition: TransitionId,
        permission: Permission,
    },

    #[error("Duplicate transition '{transition}' from state: {}", display_state(.state))]
    DuplicateTransition {
        state: Option<StateLabel>,
        transition: TransitionId,
    },

    #[error("Entity has no document id; fire an entry transition first")]
    MissingDocumentId,

    #[error("No engine registered for: {0}")]
    EngineNotFound(String),

    #[error("Engine already registered for: {0}")]
    EngineAlreadyRegistered(String),

    /// Raised by transition actions for domain-level failures
    #[error("Action failed: {0}")]
    ActionFailed(String),
}

/// Result type alias for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_render_absent_state() {
        let err = WorkflowError::InvalidTransition { state: None };
        assert_eq!(err.to_string(), "Invalid transition from state: <none>");

        let err = WorkflowError::AmbiguousTransition {
            from: Some(StateLabel::new("a")),
            to: Some(StateLabel::new("b")),
        };
        assert_eq!(err.to_string(), "Ambiguous transition: a -> b");
    }

    #[test]
    fn test_unauthorized_message() {
        let err = WorkflowError::Unauthorized {
            transition: TransitionId::new("publish"),
            permission: Permission::new("docs.publish"),
        };
        assert!(err.to_string().contains("docs.publish"));
    }
}
