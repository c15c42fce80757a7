//! Transition engine: selects, checks and fires transitions
//!
//! The engine binds a [`Workflow`] to a [`StateAccessor`] and to the
//! authorization and event collaborators. It keeps no per-entity state:
//! everything it knows about an entity is read through the accessor at
//! call time.
//!
//! Firing runs in a fixed order: resolve, permission check, guard,
//! action, identifier stamping, state commit, side effect, event. Every
//! error raised before the action runs leaves the entity untouched.

use crate::{
    Authorizer, EngineConfig, Entity, EventBus, EventDispatcher, SideEffect, StateAccessor,
    SweepReport, SystemAuthorizer, Transition, TransitionEvent, VersionTracker, Workflow,
};
use chrono::Utc;
use docflow_types::{DocumentId, StateLabel, Trigger, TransitionId, WorkflowError, WorkflowResult};
use std::sync::Arc;

/// Per-call firing options
pub struct FireOptions<'a, E> {
    /// Enforce the transition's permission (default `true`)
    pub check_security: bool,
    /// Edit applied to the resulting entity after the state commit and
    /// before the event is published
    pub side_effect: Option<&'a dyn SideEffect<E>>,
    /// Note carried on the published event
    pub comment: Option<String>,
}

impl<'a, E> FireOptions<'a, E> {
    pub fn new() -> Self {
        Self {
            check_security: true,
            side_effect: None,
            comment: None,
        }
    }

    /// Options that bypass the permission check
    pub fn unchecked() -> Self {
        Self::new().with_check_security(false)
    }

    pub fn with_check_security(mut self, check_security: bool) -> Self {
        self.check_security = check_security;
        self
    }

    pub fn with_side_effect<F>(mut self, side_effect: &'a F) -> Self
    where
        F: Fn(&E) + 'a,
    {
        self.side_effect = Some(side_effect);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

impl<'a, E> Default for FireOptions<'a, E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Which candidates a selection keeps
struct Selection<'q> {
    triggers: &'q [Trigger],
    /// Restrict to one destination; `Some(None)` selects exit transitions
    destination: Option<Option<&'q str>>,
    permission: bool,
    guard: bool,
}

/// The firing engine for one workflow
pub struct TransitionEngine<E: Entity> {
    workflow: Arc<Workflow<E>>,
    accessor: Arc<dyn StateAccessor<E>>,
    authorizer: Arc<dyn Authorizer>,
    dispatcher: Arc<dyn EventDispatcher<E>>,
    versions: Arc<VersionTracker<E>>,
    config: EngineConfig,
}

impl<E: Entity> TransitionEngine<E> {
    /// Engine running as the system principal, with an empty event bus
    /// and a private version tracker
    pub fn new(workflow: Arc<Workflow<E>>, accessor: Arc<dyn StateAccessor<E>>) -> Self {
        Self::builder(workflow, accessor).build()
    }

    pub fn builder(
        workflow: Arc<Workflow<E>>,
        accessor: Arc<dyn StateAccessor<E>>,
    ) -> TransitionEngineBuilder<E> {
        TransitionEngineBuilder {
            workflow,
            accessor,
            authorizer: None,
            dispatcher: None,
            versions: None,
            config: EngineConfig::default(),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn workflow(&self) -> &Arc<Workflow<E>> {
        &self.workflow
    }

    pub fn accessor(&self) -> &Arc<dyn StateAccessor<E>> {
        &self.accessor
    }

    pub fn versions(&self) -> &Arc<VersionTracker<E>> {
        &self.versions
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current state of `entity`
    pub fn state(&self, entity: &E) -> Option<StateLabel> {
        self.accessor.state(entity)
    }

    /// Document id of `entity`, if it has entered the workflow
    pub fn document_id(&self, entity: &E) -> Option<DocumentId> {
        self.accessor.id(entity)
    }

    // ── Firing ───────────────────────────────────────────────────────

    /// Fire transition `id` with default options
    pub fn fire_transition(&self, id: &str, entity: &E) -> WorkflowResult<E> {
        self.fire_transition_with(id, entity, FireOptions::default())
    }

    /// Fire transition `id` from the entity's current state.
    ///
    /// Returns the resulting entity: the new version if the action
    /// produced one, otherwise `entity` itself.
    pub fn fire_transition_with(
        &self,
        id: &str,
        entity: &E,
        options: FireOptions<'_, E>,
    ) -> WorkflowResult<E> {
        let source = self.accessor.state(entity);
        let transition = self.workflow.transition(label(&source), id)?;
        self.fire_selected(transition, entity, options, true)
    }

    fn fire_selected(
        &self,
        transition: Arc<Transition<E>>,
        entity: &E,
        options: FireOptions<'_, E>,
        check_guard: bool,
    ) -> WorkflowResult<E> {
        self.check_permission(&transition, options.check_security)?;

        if check_guard && !transition.is_satisfied(self, entity) {
            tracing::debug!(transition = %transition.id, "Transition condition not satisfied");
            return Err(WorkflowError::ConditionFailed {
                transition: transition.id.clone(),
            });
        }

        let replacement = transition.run_action(self, entity)?;

        let document_id = match self.accessor.id(entity) {
            Some(id) => Some(id),
            None if transition.is_entry() => {
                let id = DocumentId::generate();
                self.accessor.set_id(entity, id.clone());
                Some(id)
            }
            None => None,
        };

        let result = match replacement {
            Some(version) => {
                if let Some(id) = &document_id {
                    self.accessor.set_id(&version, id.clone());
                }
                version
            }
            None => entity.clone(),
        };

        self.accessor
            .set_state(&result, transition.destination.clone());

        if let Some(side_effect) = options.side_effect {
            side_effect.apply(&result);
        }

        let event = TransitionEvent {
            transition: Arc::clone(&transition),
            source: transition.source.clone(),
            destination: transition.destination.clone(),
            object: entity.clone(),
            new_object: result.clone(),
            comment: options.comment,
            fired_at: Utc::now(),
        };

        tracing::info!(
            transition = %transition.id,
            from = %docflow_types::display_state(&transition.source),
            to = %docflow_types::display_state(&transition.destination),
            document = document_id.as_ref().map(DocumentId::short).unwrap_or("-"),
            new_version = event.is_new_version(),
            "Transition fired"
        );

        self.dispatcher.publish(&event);
        if self.config.notify_modified {
            self.dispatcher.entity_modified(&result);
        }

        Ok(result)
    }

    /// Fire the single manual or system transition leading to
    /// `destination`, with default options
    pub fn fire_transition_toward(&self, entity: &E, destination: Option<&str>) -> WorkflowResult<E> {
        self.fire_transition_toward_with(entity, destination, FireOptions::default())
    }

    /// Fire the single manual or system transition leading to
    /// `destination`.
    ///
    /// Fails with `NoTransitionAvailable` when nothing qualifies and with
    /// `AmbiguousTransition` when more than one transition does; the
    /// engine never picks between equally eligible candidates.
    pub fn fire_transition_toward_with(
        &self,
        entity: &E,
        destination: Option<&str>,
        options: FireOptions<'_, E>,
    ) -> WorkflowResult<E> {
        let candidates = self.select(
            entity,
            &Selection {
                triggers: &[Trigger::Manual, Trigger::System],
                destination: Some(destination),
                permission: options.check_security,
                guard: true,
            },
        );

        match candidates.as_slice() {
            [] => Err(WorkflowError::NoTransitionAvailable {
                from: self.accessor.state(entity),
                to: destination.map(StateLabel::new),
            }),
            // Selection already evaluated the guard; it is not asked twice
            [only] => self.fire_selected(Arc::clone(only), entity, options, false),
            _ => Err(WorkflowError::AmbiguousTransition {
                from: self.accessor.state(entity),
                to: destination.map(StateLabel::new),
            }),
        }
    }

    /// Fire `id` on every tracked sibling of `entity` currently in
    /// `state`. Meant to be called from inside an action.
    ///
    /// The acting entity itself is skipped. Siblings are fired one after
    /// another with no atomicity across the group: if one fails, the
    /// error is returned, earlier siblings stay transitioned and later
    /// ones are left untouched.
    pub fn fire_transition_for_versions(
        &self,
        entity: &E,
        state: &str,
        id: &str,
    ) -> WorkflowResult<Vec<E>> {
        let Some(document_id) = self.accessor.id(entity) else {
            return Ok(Vec::new());
        };

        let mut fired = Vec::new();
        for version in self.versions.versions_in_state(&document_id, state) {
            if version.is_same(entity) {
                continue;
            }
            let options = FireOptions::new().with_check_security(self.config.cascade_check_security);
            fired.push(self.fire_transition_with(id, &version, options)?);
        }

        if !fired.is_empty() {
            tracing::debug!(
                document = document_id.short(),
                transition = id,
                siblings = fired.len(),
                "Cascaded transition onto versions"
            );
        }
        Ok(fired)
    }

    /// Fire the first automatic transition from the entity's current
    /// state whose guard passes. Permissions are not enforced.
    ///
    /// Returns the fired transition id and the resulting entity, or
    /// `None` if no automatic transition could fire.
    pub fn fire_automatic(&self, entity: &E) -> WorkflowResult<Option<(TransitionId, E)>> {
        let candidates = self.select(
            entity,
            &Selection {
                triggers: &[Trigger::Automatic],
                destination: None,
                permission: false,
                guard: false,
            },
        );

        for transition in candidates {
            match self.fire_transition_with(transition.id.as_str(), entity, FireOptions::unchecked())
            {
                Ok(result) => return Ok(Some((transition.id.clone(), result))),
                Err(WorkflowError::ConditionFailed { .. }) => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(None)
    }

    /// Run the automatic sweep over this engine's version tracker
    pub fn sweep_automatic(&self) -> WorkflowResult<SweepReport> {
        self.versions.fire_automatic(self)
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Manual transitions the current principal may fire right now
    pub fn manual_transition_ids(&self, entity: &E) -> Vec<TransitionId> {
        self.select_ids(
            entity,
            &Selection {
                triggers: &[Trigger::Manual],
                destination: None,
                permission: true,
                guard: true,
            },
        )
    }

    /// Automatic transitions defined from the current state, regardless
    /// of guards and permissions
    pub fn automatic_transition_ids(&self, entity: &E) -> Vec<TransitionId> {
        self.select_ids(
            entity,
            &Selection {
                triggers: &[Trigger::Automatic],
                destination: None,
                permission: false,
                guard: false,
            },
        )
    }

    /// System transitions defined from the current state, regardless of
    /// guards and permissions
    pub fn system_transition_ids(&self, entity: &E) -> Vec<TransitionId> {
        self.select_ids(
            entity,
            &Selection {
                triggers: &[Trigger::System],
                destination: None,
                permission: false,
                guard: false,
            },
        )
    }

    /// Manual and system transitions toward `destination` that could fire
    /// now. Unlike firing, more than one result is not an error.
    pub fn fireable_transition_ids_toward(
        &self,
        entity: &E,
        destination: Option<&str>,
    ) -> Vec<TransitionId> {
        self.select_ids(
            entity,
            &Selection {
                triggers: &[Trigger::Manual, Trigger::System],
                destination: Some(destination),
                permission: true,
                guard: true,
            },
        )
    }

    // ── Internal helpers ─────────────────────────────────────────────

    /// Whether the current principal may fire `transition`
    fn may_fire(&self, transition: &Transition<E>) -> bool {
        let Some(permission) = &transition.permission else {
            return true;
        };
        let principal = self.authorizer.current_principal();
        principal.is_system() || self.authorizer.has_permission(&principal, permission)
    }

    fn check_permission(&self, transition: &Transition<E>, check_security: bool) -> WorkflowResult<()> {
        if !check_security || self.may_fire(transition) {
            return Ok(());
        }
        let Some(permission) = &transition.permission else {
            return Ok(());
        };
        let principal = self.authorizer.current_principal();

        tracing::debug!(
            transition = %transition.id,
            principal = %principal,
            permission = %permission,
            "Transition denied"
        );
        Err(WorkflowError::Unauthorized {
            transition: transition.id.clone(),
            permission: permission.clone(),
        })
    }

    /// Candidates from the entity's current state, filtered and ranked by
    /// `order`. The sort is stable, so equal orders keep registration order.
    fn select(&self, entity: &E, query: &Selection<'_>) -> Vec<Arc<Transition<E>>> {
        let source = self.accessor.state(entity);
        let mut selected: Vec<_> = self
            .workflow
            .transitions_from(label(&source))
            .into_iter()
            .filter(|t| query.triggers.contains(&t.trigger))
            .filter(|t| {
                query
                    .destination
                    .map_or(true, |wanted| label(&t.destination) == wanted)
            })
            .filter(|t| !query.permission || self.may_fire(t))
            .filter(|t| !query.guard || t.is_satisfied(self, entity))
            .collect();
        selected.sort_by_key(|t| t.order);
        selected
    }

    fn select_ids(&self, entity: &E, query: &Selection<'_>) -> Vec<TransitionId> {
        self.select(entity, query)
            .into_iter()
            .map(|t| t.id.clone())
            .collect()
    }
}

impl<E: Entity> std::fmt::Debug for TransitionEngine<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionEngine")
            .field("workflow", &self.workflow)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn label(state: &Option<StateLabel>) -> Option<&str> {
    state.as_ref().map(StateLabel::as_str)
}

/// Builder for [`TransitionEngine`]
pub struct TransitionEngineBuilder<E: Entity> {
    workflow: Arc<Workflow<E>>,
    accessor: Arc<dyn StateAccessor<E>>,
    authorizer: Option<Arc<dyn Authorizer>>,
    dispatcher: Option<Arc<dyn EventDispatcher<E>>>,
    versions: Option<Arc<VersionTracker<E>>>,
    config: EngineConfig,
}

impl<E: Entity> TransitionEngineBuilder<E> {
    pub fn authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Arc<dyn EventDispatcher<E>>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Share a version tracker, typically with other engines or the host
    pub fn versions(mut self, versions: Arc<VersionTracker<E>>) -> Self {
        self.versions = Some(versions);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> TransitionEngine<E> {
        let authorizer: Arc<dyn Authorizer> = match self.authorizer {
            Some(authorizer) => authorizer,
            None => Arc::new(SystemAuthorizer),
        };
        let dispatcher: Arc<dyn EventDispatcher<E>> = match self.dispatcher {
            Some(dispatcher) => dispatcher,
            None => Arc::new(EventBus::new()),
        };
        let versions = match self.versions {
            Some(versions) => versions,
            None => Arc::new(VersionTracker::new(Arc::clone(&self.accessor))),
        };

        TransitionEngine {
            workflow: self.workflow,
            accessor: self.accessor,
            authorizer,
            dispatcher,
            versions,
            config: self.config,
        }
    }
}
