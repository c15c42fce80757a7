//! Workflow: the immutable set of transitions an engine works from
//!
//! Transitions are indexed by source state. Within one source state,
//! transition ids must be unique; the same id may reappear from a
//! different source.

use crate::{Entity, Transition};
use docflow_types::{StateLabel, WorkflowError, WorkflowResult};
use std::collections::HashMap;
use std::sync::Arc;

/// An immutable, queryable collection of transitions
pub struct Workflow<E: Entity> {
    /// All transitions in registration order
    transitions: Vec<Arc<Transition<E>>>,
    /// Source state → positions in `transitions`
    by_source: HashMap<Option<StateLabel>, Vec<usize>>,
}

impl<E: Entity> Workflow<E> {
    /// Build a workflow, rejecting duplicate ids within a source state
    pub fn new(transitions: Vec<Transition<E>>) -> WorkflowResult<Self> {
        let mut by_source: HashMap<Option<StateLabel>, Vec<usize>> = HashMap::new();
        let mut stored: Vec<Arc<Transition<E>>> = Vec::with_capacity(transitions.len());

        for (index, transition) in transitions.into_iter().enumerate() {
            let siblings = by_source.entry(transition.source.clone()).or_default();
            if siblings.iter().any(|&i| stored[i].id == transition.id) {
                return Err(WorkflowError::DuplicateTransition {
                    state: transition.source.clone(),
                    transition: transition.id.clone(),
                });
            }
            siblings.push(index);
            stored.push(Arc::new(transition));
        }

        tracing::debug!(transitions = stored.len(), "Workflow built");

        Ok(Self {
            transitions: stored,
            by_source,
        })
    }

    /// The transition with `id` leaving `source`
    pub fn transition(&self, source: Option<&str>, id: &str) -> WorkflowResult<Arc<Transition<E>>> {
        let key = source.map(StateLabel::new);
        self.by_source
            .get(&key)
            .and_then(|positions| {
                positions
                    .iter()
                    .map(|&i| &self.transitions[i])
                    .find(|t| t.id.as_str() == id)
            })
            .cloned()
            .ok_or(WorkflowError::InvalidTransition { state: key })
    }

    /// All transitions leaving `source`, in registration order
    pub fn transitions_from(&self, source: Option<&str>) -> Vec<Arc<Transition<E>>> {
        let key = source.map(StateLabel::new);
        self.by_source
            .get(&key)
            .map(|positions| {
                positions
                    .iter()
                    .map(|&i| Arc::clone(&self.transitions[i]))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// First registered transition with `id`, whatever its source
    pub fn transition_by_id(&self, id: &str) -> Option<Arc<Transition<E>>> {
        self.transitions
            .iter()
            .find(|t| t.id.as_str() == id)
            .cloned()
    }

    pub fn transitions(&self) -> &[Arc<Transition<E>>] {
        &self.transitions
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

impl<E: Entity> std::fmt::Debug for Workflow<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("transitions", &self.transitions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docflow_types::TransitionId;

    type Handle = Arc<String>;

    fn make_workflow() -> Workflow<Handle> {
        Workflow::new(vec![
            Transition::entry("init", "Create", "draft"),
            Transition::new("submit", "Submit", "draft", "review"),
            Transition::new("reject", "Reject", "review", "draft"),
            Transition::new("approve", "Approve", "review", "published"),
            // Same id as above, different source
            Transition::new("reject", "Withdraw", "published", "draft"),
        ])
        .unwrap()
    }

    #[test]
    fn test_transitions_empty() {
        let wf: Workflow<Handle> = Workflow::new(vec![]).unwrap();
        assert!(wf.transitions_from(None).is_empty());
        assert!(wf.is_empty());
    }

    #[test]
    fn test_lookup_by_source_and_id() {
        let wf = make_workflow();

        let t = wf.transition(None, "init").unwrap();
        assert_eq!(t.destination, Some(StateLabel::new("draft")));

        let t = wf.transition(Some("published"), "reject").unwrap();
        assert_eq!(t.title, "Withdraw");

        let t = wf.transition(Some("review"), "reject").unwrap();
        assert_eq!(t.title, "Reject");
    }

    #[test]
    fn test_lookup_wrong_source_is_invalid() {
        let wf = make_workflow();

        // "approve" exists, but not from "draft"
        let err = wf.transition(Some("draft"), "approve").unwrap_err();
        match err {
            WorkflowError::InvalidTransition { state } => {
                assert_eq!(state, Some(StateLabel::new("draft")));
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = wf.transition(None, "missing").unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::InvalidTransition { state: None }
        ));
    }

    #[test]
    fn test_transitions_from_keeps_registration_order() {
        let wf = make_workflow();
        let ids: Vec<_> = wf
            .transitions_from(Some("review"))
            .iter()
            .map(|t| t.id.clone())
            .collect();
        assert_eq!(
            ids,
            vec![TransitionId::new("reject"), TransitionId::new("approve")]
        );
        assert!(wf.transitions_from(Some("nowhere")).is_empty());
    }

    #[test]
    fn test_duplicate_id_from_same_source_rejected() {
        let result: WorkflowResult<Workflow<Handle>> = Workflow::new(vec![
            Transition::new("go", "Go", "a", "b"),
            Transition::new("go", "Go again", "a", "c"),
        ]);
        assert!(matches!(
            result,
            Err(WorkflowError::DuplicateTransition { .. })
        ));
    }

    #[test]
    fn test_transition_by_id() {
        let wf = make_workflow();
        assert_eq!(wf.transition_by_id("reject").unwrap().title, "Reject");
        assert!(wf.transition_by_id("missing").is_none());
        assert_eq!(wf.len(), 5);
    }
}
