//! Transition events and their delivery
//!
//! Every successful firing publishes exactly one [`TransitionEvent`]
//! through the engine's [`EventDispatcher`]. Delivery is synchronous and
//! fire-and-forget: the engine ignores whatever subscribers do.

use crate::{Entity, Transition};
use chrono::{DateTime, Utc};
use docflow_types::StateLabel;
use parking_lot::RwLock;
use std::sync::Arc;

/// Record of one fired transition
pub struct TransitionEvent<E: Entity> {
    /// The transition that fired
    pub transition: Arc<Transition<E>>,
    pub source: Option<StateLabel>,
    pub destination: Option<StateLabel>,
    /// The entity the transition was fired on
    pub object: E,
    /// The resulting entity; the same handle as `object` unless the
    /// action produced a new version
    pub new_object: E,
    /// Free-text note supplied by the caller
    pub comment: Option<String>,
    pub fired_at: DateTime<Utc>,
}

impl<E: Entity> TransitionEvent<E> {
    /// Whether the firing produced a new version
    pub fn is_new_version(&self) -> bool {
        !self.object.is_same(&self.new_object)
    }
}

impl<E: Entity> Clone for TransitionEvent<E> {
    fn clone(&self) -> Self {
        Self {
            transition: Arc::clone(&self.transition),
            source: self.source.clone(),
            destination: self.destination.clone(),
            object: self.object.clone(),
            new_object: self.new_object.clone(),
            comment: self.comment.clone(),
            fired_at: self.fired_at,
        }
    }
}

impl<E: Entity> std::fmt::Debug for TransitionEvent<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionEvent")
            .field("transition", &self.transition.id)
            .field("source", &self.source)
            .field("destination", &self.destination)
            .field("new_version", &self.is_new_version())
            .field("comment", &self.comment)
            .field("fired_at", &self.fired_at)
            .finish()
    }
}

/// Receives engine notifications
pub trait EventDispatcher<E: Entity>: Send + Sync {
    /// Called once per successful firing, after state commit
    fn publish(&self, event: &TransitionEvent<E>);

    /// Called after `publish` with the resulting entity
    fn entity_modified(&self, _entity: &E) {}
}

type EventHandler<E> = Arc<dyn Fn(&TransitionEvent<E>) + Send + Sync>;
type ModifiedHandler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Synchronous in-process subscriber list
pub struct EventBus<E: Entity> {
    handlers: RwLock<Vec<EventHandler<E>>>,
    modified_handlers: RwLock<Vec<ModifiedHandler<E>>>,
}

impl<E: Entity> EventBus<E> {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            modified_handlers: RwLock::new(Vec::new()),
        }
    }

    /// Subscribe to transition events
    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&TransitionEvent<E>) + Send + Sync + 'static,
    {
        self.handlers.write().push(Arc::new(handler));
    }

    /// Subscribe to entity-modified notifications
    pub fn on_modified<F>(&self, handler: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.modified_handlers.write().push(Arc::new(handler));
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len() + self.modified_handlers.read().len()
    }
}

impl<E: Entity> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> EventDispatcher<E> for EventBus<E> {
    fn publish(&self, event: &TransitionEvent<E>) {
        // Snapshot so handlers may subscribe without deadlocking
        let handlers = self.handlers.read().clone();
        tracing::trace!(
            transition = %event.transition.id,
            subscribers = handlers.len(),
            "Transition event published"
        );
        for handler in handlers {
            handler(event);
        }
    }

    fn entity_modified(&self, entity: &E) {
        let handlers = self.modified_handlers.read().clone();
        for handler in handlers {
            handler(entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    type Handle = Arc<String>;

    fn make_event(object: Handle, new_object: Handle) -> TransitionEvent<Handle> {
        TransitionEvent {
            transition: Arc::new(Transition::new("a_to_b", "A to B", "a", "b")),
            source: Some(StateLabel::new("a")),
            destination: Some(StateLabel::new("b")),
            object,
            new_object,
            comment: None,
            fired_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_new_version() {
        let doc = Arc::new("doc".to_string());
        assert!(!make_event(doc.clone(), doc.clone()).is_new_version());

        let copy = Arc::new("doc".to_string());
        assert!(make_event(doc, copy).is_new_version());
    }

    #[test]
    fn test_bus_delivers_to_all_subscribers() {
        let bus: EventBus<Handle> = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            bus.subscribe(move |event: &TransitionEvent<Handle>| {
                seen.lock().push(format!("{}:{}", tag, event.transition.id));
            });
        }
        let modified = Arc::new(Mutex::new(0));
        {
            let modified = Arc::clone(&modified);
            bus.on_modified(move |_: &Handle| *modified.lock() += 1);
        }
        assert_eq!(bus.subscriber_count(), 3);

        let doc = Arc::new("doc".to_string());
        bus.publish(&make_event(doc.clone(), doc.clone()));
        bus.entity_modified(&doc);

        assert_eq!(*seen.lock(), vec!["first:a_to_b", "second:a_to_b"]);
        assert_eq!(*modified.lock(), 1);
    }
}
