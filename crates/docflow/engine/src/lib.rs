//! Document workflow engine
//!
//! Drives application entities through a workflow graph of labelled
//! states. Each transition is guarded by a condition, gated by a
//! permission, and may run an action that produces a new version of the
//! entity. Successful firings publish events.
//!
//! # Architecture
//!
//! - [`Workflow`]: immutable set of [`Transition`]s indexed by source state
//! - [`TransitionEngine`]: selects, checks and fires transitions
//! - [`VersionTracker`]: groups versions of a document for cascades and
//!   the automatic sweep
//! - [`WorkflowRegistry`]: locates the engine for an entity kind
//!
//! The engine reaches the host application through narrow traits:
//! [`StateAccessor`] for workflow state, [`Authorizer`] for permissions
//! and [`EventDispatcher`] for notifications.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use docflow_engine::*;
//! use docflow_types::WorkflowState;
//!
//! struct Page {
//!     slot: StateSlot,
//! }
//!
//! impl StatefulEntity for Page {
//!     fn workflow_state(&self) -> WorkflowState {
//!         self.slot.load()
//!     }
//!
//!     fn update_workflow_state(&self, edit: &mut dyn FnMut(&mut WorkflowState)) {
//!         self.slot.update(edit)
//!     }
//! }
//!
//! let workflow = Workflow::new(vec![
//!     Transition::entry("create", "Create", "draft"),
//!     Transition::new("publish", "Publish", "draft", "published"),
//! ])
//! .unwrap();
//! let engine: TransitionEngine<Arc<Page>> =
//!     TransitionEngine::new(Arc::new(workflow), Arc::new(EmbeddedStateAccessor));
//!
//! let page = Arc::new(Page { slot: StateSlot::new() });
//! engine.fire_transition("create", &page).unwrap();
//! engine.fire_transition_toward(&page, Some("published")).unwrap();
//!
//! assert_eq!(engine.state(&page).unwrap().as_str(), "published");
//! assert!(engine.document_id(&page).is_some());
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod engine;
pub mod events;
pub mod registry;
pub mod security;
pub mod state;
pub mod transition;
pub mod versions;
pub mod workflow;

pub use config::EngineConfig;
pub use engine::{FireOptions, TransitionEngine, TransitionEngineBuilder};
pub use events::{EventBus, EventDispatcher, TransitionEvent};
pub use registry::{WorkflowKey, WorkflowKind, WorkflowRegistry};
pub use security::{Authorizer, StaticAuthorizer, SystemAuthorizer};
pub use state::{EmbeddedStateAccessor, Entity, StateAccessor, StateSlot, StatefulEntity};
pub use transition::{Action, Always, Guard, NoAction, SideEffect, Transition};
pub use versions::{SweepEntry, SweepReport, VersionTracker};
pub use workflow::Workflow;
