//! Transitions: guarded, permission-gated edges between states
//!
//! A transition carries two pieces of behaviour: a [`Guard`] deciding
//! whether it may fire right now, and an [`Action`] run when it does.
//! Both are traits with blanket impls for closures, so callers can pass
//! either a closure or a small object.

use crate::{Entity, TransitionEngine};
use docflow_types::{Permission, StateLabel, Trigger, TransitionId, WorkflowResult};
use std::sync::Arc;

/// Decides whether a transition may fire for an entity
pub trait Guard<E: Entity>: Send + Sync {
    fn check(&self, engine: &TransitionEngine<E>, entity: &E) -> bool;
}

impl<E, F> Guard<E> for F
where
    E: Entity,
    F: Fn(&TransitionEngine<E>, &E) -> bool + Send + Sync,
{
    fn check(&self, engine: &TransitionEngine<E>, entity: &E) -> bool {
        self(engine, entity)
    }
}

/// Work performed when a transition fires.
///
/// Returning `Ok(None)` means the entity was changed in place. Returning
/// `Ok(Some(version))` hands back a new entity that replaces the original
/// as the version of record.
pub trait Action<E: Entity>: Send + Sync {
    fn run(&self, engine: &TransitionEngine<E>, entity: &E) -> WorkflowResult<Option<E>>;
}

impl<E, F> Action<E> for F
where
    E: Entity,
    F: Fn(&TransitionEngine<E>, &E) -> WorkflowResult<Option<E>> + Send + Sync,
{
    fn run(&self, engine: &TransitionEngine<E>, entity: &E) -> WorkflowResult<Option<E>> {
        self(engine, entity)
    }
}

/// Caller-supplied edit applied to the resulting entity of one firing
pub trait SideEffect<E> {
    fn apply(&self, entity: &E);
}

impl<E, F> SideEffect<E> for F
where
    F: Fn(&E),
{
    fn apply(&self, entity: &E) {
        self(entity)
    }
}

/// Guard that always passes
#[derive(Clone, Copy, Debug, Default)]
pub struct Always;

impl<E: Entity> Guard<E> for Always {
    fn check(&self, _engine: &TransitionEngine<E>, _entity: &E) -> bool {
        true
    }
}

/// Action that leaves the entity untouched
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAction;

impl<E: Entity> Action<E> for NoAction {
    fn run(&self, _engine: &TransitionEngine<E>, _entity: &E) -> WorkflowResult<Option<E>> {
        Ok(None)
    }
}

/// An immutable descriptor of one possible state change
pub struct Transition<E: Entity> {
    /// Unique among transitions leaving the same state
    pub id: TransitionId,
    /// Display text
    pub title: String,
    /// Required current state; `None` marks an entry transition
    pub source: Option<StateLabel>,
    /// State after firing; `None` means the entity leaves the workflow
    pub destination: Option<StateLabel>,
    pub trigger: Trigger,
    /// Rank among otherwise equal candidates, lowest first
    pub order: i32,
    /// Permission the current principal must hold, if any
    pub permission: Option<Permission>,
    condition: Arc<dyn Guard<E>>,
    action: Arc<dyn Action<E>>,
}

impl<E: Entity> Transition<E> {
    /// Create a manual transition between two optional states
    pub fn between(
        id: impl Into<String>,
        title: impl Into<String>,
        source: Option<StateLabel>,
        destination: Option<StateLabel>,
    ) -> Self {
        Self {
            id: TransitionId::new(id),
            title: title.into(),
            source,
            destination,
            trigger: Trigger::Manual,
            order: 0,
            permission: None,
            condition: Arc::new(Always),
            action: Arc::new(NoAction),
        }
    }

    /// Create a manual transition from `source` to `destination`
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        source: &str,
        destination: &str,
    ) -> Self {
        Self::between(
            id,
            title,
            Some(StateLabel::new(source)),
            Some(StateLabel::new(destination)),
        )
    }

    /// Create an entry transition for entities not yet in the workflow
    pub fn entry(id: impl Into<String>, title: impl Into<String>, destination: &str) -> Self {
        Self::between(id, title, None, Some(StateLabel::new(destination)))
    }

    /// Create a transition that takes the entity out of the workflow
    pub fn exit(id: impl Into<String>, title: impl Into<String>, source: &str) -> Self {
        Self::between(id, title, Some(StateLabel::new(source)), None)
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(Permission::new(permission));
        self
    }

    /// Guard the transition with a closure
    pub fn with_condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&TransitionEngine<E>, &E) -> bool + Send + Sync + 'static,
    {
        self.condition = Arc::new(condition);
        self
    }

    /// Guard the transition with a [`Guard`] implementation
    pub fn with_guard(mut self, guard: impl Guard<E> + 'static) -> Self {
        self.condition = Arc::new(guard);
        self
    }

    /// Run a closure when the transition fires
    pub fn with_action<F>(mut self, action: F) -> Self
    where
        F: Fn(&TransitionEngine<E>, &E) -> WorkflowResult<Option<E>> + Send + Sync + 'static,
    {
        self.action = Arc::new(action);
        self
    }

    /// Run an [`Action`] implementation when the transition fires
    pub fn with_action_runner(mut self, action: impl Action<E> + 'static) -> Self {
        self.action = Arc::new(action);
        self
    }

    /// Evaluate the guard
    pub fn is_satisfied(&self, engine: &TransitionEngine<E>, entity: &E) -> bool {
        self.condition.check(engine, entity)
    }

    pub(crate) fn run_action(
        &self,
        engine: &TransitionEngine<E>,
        entity: &E,
    ) -> WorkflowResult<Option<E>> {
        self.action.run(engine, entity)
    }

    pub fn is_entry(&self) -> bool {
        self.source.is_none()
    }

    pub fn is_exit(&self) -> bool {
        self.destination.is_none()
    }
}

impl<E: Entity> Clone for Transition<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            title: self.title.clone(),
            source: self.source.clone(),
            destination: self.destination.clone(),
            trigger: self.trigger,
            order: self.order,
            permission: self.permission.clone(),
            condition: Arc::clone(&self.condition),
            action: Arc::clone(&self.action),
        }
    }
}

impl<E: Entity> std::fmt::Debug for Transition<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transition")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("source", &self.source)
            .field("destination", &self.destination)
            .field("trigger", &self.trigger)
            .field("order", &self.order)
            .field("permission", &self.permission)
            .finish_non_exhaustive()
    }
}
