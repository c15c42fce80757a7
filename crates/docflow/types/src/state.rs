//! Stored workflow state, trigger kinds and principals

use crate::{DocumentId, StateLabel};
use serde::{Deserialize, Serialize};

/// The (state, document id) pair attached to each participating entity.
///
/// The engine never owns this data; it reads and writes it through a
/// state accessor backed by whatever storage the host application uses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Current state; `None` before entry and after exit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<StateLabel>,
    /// Logical document id, assigned on first entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(mut self, state: impl Into<StateLabel>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_id(mut self, id: DocumentId) -> Self {
        self.id = Some(id);
        self
    }

    /// Whether the entity currently sits inside the workflow
    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }
}

/// What may fire a transition
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Fired on user request
    #[default]
    Manual,
    /// Fired by the periodic sweep once its guard passes
    Automatic,
    /// Fired programmatically; never offered to users or the sweep
    System,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Manual => write!(f, "manual"),
            Trigger::Automatic => write!(f, "automatic"),
            Trigger::System => write!(f, "system"),
        }
    }
}

/// The actor on whose behalf the engine runs
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Principal {
    /// Privileged principal; passes every permission check
    System,
    /// An ordinary, named principal
    User(String),
}

impl Principal {
    pub fn user(name: impl Into<String>) -> Self {
        Principal::User(name.into())
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Principal::System)
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Principal::System => write!(f, "system"),
            Principal::User(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_state_builder() {
        let ws = WorkflowState::new();
        assert!(!ws.is_active());

        let ws = ws.with_state("draft").with_id(DocumentId::new("doc-1"));
        assert!(ws.is_active());
        assert_eq!(ws.state, Some(StateLabel::new("draft")));
        assert_eq!(ws.id, Some(DocumentId::new("doc-1")));
    }

    #[test]
    fn test_workflow_state_serde_skips_absent() {
        let json = serde_json::to_string(&WorkflowState::new()).unwrap();
        assert_eq!(json, "{}");

        let back: WorkflowState =
            serde_json::from_str(r#"{"state":"published","id":"d1"}"#).unwrap();
        assert_eq!(back.state, Some(StateLabel::new("published")));
    }

    #[test]
    fn test_trigger_default_and_serde() {
        assert_eq!(Trigger::default(), Trigger::Manual);
        let t: Trigger = serde_json::from_str("\"automatic\"").unwrap();
        assert_eq!(t, Trigger::Automatic);
        assert_eq!(Trigger::System.to_string(), "system");
    }

    #[test]
    fn test_principal() {
        assert!(Principal::System.is_system());
        let bob = Principal::user("bob");
        assert!(!bob.is_system());
        assert_eq!(bob.to_string(), "bob");
    }
}
