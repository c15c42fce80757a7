//! State access: how the engine reads and writes an entity's workflow state
//!
//! The engine never stores state itself. Hosts plug in a [`StateAccessor`]
//! backed by their own storage. [`EmbeddedStateAccessor`] covers the
//! common case of entities that carry their state in a [`StateSlot`].

use docflow_types::{DocumentId, StateLabel, WorkflowState};
use parking_lot::RwLock;
use std::sync::Arc;

/// A handle to a participating entity.
///
/// Handles are cheap to clone and share the underlying object, so a
/// state change made through one clone is seen through all of them.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Whether both handles point at the same object
    fn is_same(&self, other: &Self) -> bool;
}

impl<T: ?Sized + Send + Sync + 'static> Entity for Arc<T> {
    fn is_same(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

/// Reads and writes the (state, document id) pair of an entity
pub trait StateAccessor<E>: Send + Sync {
    fn state(&self, entity: &E) -> Option<StateLabel>;

    fn set_state(&self, entity: &E, state: Option<StateLabel>);

    fn id(&self, entity: &E) -> Option<DocumentId>;

    fn set_id(&self, entity: &E, id: DocumentId);
}

/// An entity that stores its own workflow state
pub trait StatefulEntity: Send + Sync {
    fn workflow_state(&self) -> WorkflowState;

    /// Apply `edit` to the stored state as one read-modify-write
    fn update_workflow_state(&self, edit: &mut dyn FnMut(&mut WorkflowState));
}

impl<T: StatefulEntity + ?Sized> StatefulEntity for Arc<T> {
    fn workflow_state(&self) -> WorkflowState {
        (**self).workflow_state()
    }

    fn update_workflow_state(&self, edit: &mut dyn FnMut(&mut WorkflowState)) {
        (**self).update_workflow_state(edit)
    }
}

/// Interior-mutable holder for a [`WorkflowState`], meant to be embedded
/// as a field of a domain object.
#[derive(Debug, Default)]
pub struct StateSlot {
    inner: RwLock<WorkflowState>,
}

impl StateSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self) -> WorkflowState {
        self.inner.read().clone()
    }

    /// Edit the state under a single write lock
    pub fn update<F>(&self, edit: F)
    where
        F: FnOnce(&mut WorkflowState),
    {
        let mut guard = self.inner.write();
        edit(&mut *guard);
    }
}

/// State accessor for entities implementing [`StatefulEntity`]
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbeddedStateAccessor;

impl<E: StatefulEntity> StateAccessor<E> for EmbeddedStateAccessor {
    fn state(&self, entity: &E) -> Option<StateLabel> {
        entity.workflow_state().state
    }

    fn set_state(&self, entity: &E, state: Option<StateLabel>) {
        entity.update_workflow_state(&mut |current| current.state = state.clone());
    }

    fn id(&self, entity: &E) -> Option<DocumentId> {
        entity.workflow_state().id
    }

    fn set_id(&self, entity: &E, id: DocumentId) {
        entity.update_workflow_state(&mut |current| current.id = Some(id.clone()));
    }
}
