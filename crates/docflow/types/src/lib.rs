//! Domain types for docflow
//!
//! docflow manages the lifecycle of arbitrary domain objects (documents,
//! invoices, orders) as a finite-state workflow. This crate holds the
//! plain data shared by the engine and its collaborators.
//!
//! # Key Concepts
//!
//! - **StateLabel**: the node of the workflow graph an entity occupies.
//!   An absent label (`None`) means the entity has not entered the
//!   workflow yet, or has left it.
//! - **TransitionId**: names an edge; unique among edges leaving one state.
//! - **DocumentId**: the logical identifier shared by every version of
//!   the same document.
//! - **WorkflowState**: the (state, document id) pair stored with each entity.
//! - **Trigger**: who or what may fire a transition.
//! - **Principal**: the actor on whose behalf a transition is fired.
//! - **WorkflowError**: the typed outcomes every engine call may report.

#![deny(unsafe_code)]

mod errors;
mod ids;
mod state;

pub use errors::*;
pub use ids::*;
pub use state::*;
