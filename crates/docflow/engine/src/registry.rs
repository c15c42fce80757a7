//! Workflow registry: locates the engine responsible for an entity
//!
//! Engines are registered under an entity kind and an optional workflow
//! name, so one kind can carry several named workflows next to its
//! default one. Registrations are immutable; remove and re-register to
//! replace an engine.

use crate::{Entity, TransitionEngine};
use docflow_types::{WorkflowError, WorkflowResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Lookup key: entity kind plus optional workflow name
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkflowKey {
    pub kind: String,
    pub name: Option<String>,
}

impl WorkflowKey {
    pub fn new(kind: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            kind: kind.into(),
            name: name.map(str::to_string),
        }
    }
}

impl fmt::Display for WorkflowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}/{}", self.kind, name),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Entities that can name their own kind for registry lookup
pub trait WorkflowKind {
    fn workflow_kind(&self) -> &str;
}

impl<T: WorkflowKind + ?Sized> WorkflowKind for Arc<T> {
    fn workflow_kind(&self) -> &str {
        (**self).workflow_kind()
    }
}

/// Registry of transition engines
pub struct WorkflowRegistry<E: Entity> {
    engines: HashMap<WorkflowKey, Arc<TransitionEngine<E>>>,
}

impl<E: Entity> WorkflowRegistry<E> {
    pub fn new() -> Self {
        Self {
            engines: HashMap::new(),
        }
    }

    /// Register an engine for `kind` under an optional workflow name
    pub fn register(
        &mut self,
        kind: &str,
        name: Option<&str>,
        engine: Arc<TransitionEngine<E>>,
    ) -> WorkflowResult<WorkflowKey> {
        let key = WorkflowKey::new(kind, name);
        if self.engines.contains_key(&key) {
            return Err(WorkflowError::EngineAlreadyRegistered(key.to_string()));
        }

        self.engines.insert(key.clone(), engine);
        tracing::info!(workflow = %key, "Workflow engine registered");
        Ok(key)
    }

    /// Engine registered for `kind` and `name`
    pub fn engine(&self, kind: &str, name: Option<&str>) -> WorkflowResult<Arc<TransitionEngine<E>>> {
        let key = WorkflowKey::new(kind, name);
        self.engines
            .get(&key)
            .cloned()
            .ok_or_else(|| WorkflowError::EngineNotFound(key.to_string()))
    }

    /// Engine for an entity that knows its own kind
    pub fn engine_for(&self, entity: &E, name: Option<&str>) -> WorkflowResult<Arc<TransitionEngine<E>>>
    where
        E: WorkflowKind,
    {
        self.engine(entity.workflow_kind(), name)
    }

    pub fn contains(&self, kind: &str, name: Option<&str>) -> bool {
        self.engines.contains_key(&WorkflowKey::new(kind, name))
    }

    /// Unregister an engine, returning it if present
    pub fn remove(&mut self, kind: &str, name: Option<&str>) -> Option<Arc<TransitionEngine<E>>> {
        let removed = self.engines.remove(&WorkflowKey::new(kind, name));
        if removed.is_some() {
            tracing::debug!(kind, name = ?name, "Workflow engine removed");
        }
        removed
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<WorkflowKey> {
        let mut keys: Vec<_> = self.engines.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn count(&self) -> usize {
        self.engines.len()
    }
}

impl<E: Entity> Default for WorkflowRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> fmt::Debug for WorkflowRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}
