//! Version tracker: groups entities that are versions of one document
//!
//! Versions share a [`DocumentId`]. The host adds versions explicitly
//! when they become relevant for cascades or for the automatic sweep;
//! the tracker never drops them on its own.
//!
//! The tracker is an ordinary value: create it with [`VersionTracker::new`],
//! share it through an `Arc`, and reset it with [`VersionTracker::clear`].
//! Its lock is never held while a transition fires, so actions may call
//! back into the tracker.

use crate::{Entity, StateAccessor, TransitionEngine};
use docflow_types::{DocumentId, StateLabel, TransitionId, WorkflowError, WorkflowResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One automatic transition fired by a sweep
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SweepEntry {
    pub document: DocumentId,
    pub transition: TransitionId,
    pub from: Option<StateLabel>,
    pub to: Option<StateLabel>,
}

/// Outcome of one automatic sweep
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Number of versions that had automatic transitions to try
    pub examined: usize,
    pub fired: Vec<SweepEntry>,
}

impl SweepReport {
    pub fn fired_count(&self) -> usize {
        self.fired.len()
    }
}

/// Registry of tracked versions, grouped by document id
pub struct VersionTracker<E: Entity> {
    accessor: Arc<dyn StateAccessor<E>>,
    /// Ordered by document id so sweeps are deterministic
    groups: RwLock<BTreeMap<DocumentId, Vec<E>>>,
}

impl<E: Entity> VersionTracker<E> {
    pub fn new(accessor: Arc<dyn StateAccessor<E>>) -> Self {
        Self {
            accessor,
            groups: RwLock::new(BTreeMap::new()),
        }
    }

    /// Track `entity` under its document id.
    ///
    /// The entity must have entered the workflow already. Adding the same
    /// handle twice is a no-op.
    pub fn add_version(&self, entity: &E) -> WorkflowResult<()> {
        let id = self
            .accessor
            .id(entity)
            .ok_or(WorkflowError::MissingDocumentId)?;

        let mut groups = self.groups.write();
        let group = groups.entry(id.clone()).or_default();
        if group.iter().any(|tracked| tracked.is_same(entity)) {
            return Ok(());
        }
        group.push(entity.clone());

        tracing::debug!(document = id.short(), versions = group.len(), "Version tracked");
        Ok(())
    }

    /// All tracked versions of a document, in the order they were added
    pub fn versions(&self, id: &DocumentId) -> Vec<E> {
        self.groups.read().get(id).cloned().unwrap_or_default()
    }

    /// Tracked versions of a document currently in `state`
    pub fn versions_in_state(&self, id: &DocumentId, state: &str) -> Vec<E> {
        self.versions(id)
            .into_iter()
            .filter(|version| self.is_in_state(version, state))
            .collect()
    }

    /// Whether some tracked version of the document is currently in `state`
    pub fn has_version(&self, id: &DocumentId, state: &str) -> bool {
        self.versions(id)
            .iter()
            .any(|version| self.is_in_state(version, state))
    }

    /// Whether any version of the document is tracked
    pub fn has_version_id(&self, id: &DocumentId) -> bool {
        self.groups.read().contains_key(id)
    }

    /// Tracked versions whose current state has automatic transitions
    pub fn versions_with_automatic_transitions(&self, engine: &TransitionEngine<E>) -> Vec<E> {
        self.snapshot()
            .into_iter()
            .filter(|version| !engine.automatic_transition_ids(version).is_empty())
            .collect()
    }

    /// Fire at most one automatic transition on every tracked version.
    ///
    /// Versions are visited one document group at a time. Chained
    /// automatic transitions need another sweep. The first error aborts
    /// the sweep; versions already fired stay fired.
    pub fn fire_automatic(&self, engine: &TransitionEngine<E>) -> WorkflowResult<SweepReport> {
        let candidates = self.versions_with_automatic_transitions(engine);
        let mut report = SweepReport {
            examined: candidates.len(),
            fired: Vec::new(),
        };

        for version in candidates {
            let from = self.accessor.state(&version);
            if let Some((transition, result)) = engine.fire_automatic(&version)? {
                report.fired.push(SweepEntry {
                    document: self
                        .accessor
                        .id(&result)
                        .ok_or(WorkflowError::MissingDocumentId)?,
                    transition,
                    from,
                    to: self.accessor.state(&result),
                });
            }
        }

        tracing::info!(
            examined = report.examined,
            fired = report.fired_count(),
            "Automatic sweep completed"
        );
        Ok(report)
    }

    /// Number of tracked versions across all documents
    pub fn len(&self) -> usize {
        self.groups.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }

    /// Drop every tracked version
    pub fn clear(&self) {
        self.groups.write().clear();
    }

    fn snapshot(&self) -> Vec<E> {
        self.groups.read().values().flatten().cloned().collect()
    }

    fn is_in_state(&self, version: &E, state: &str) -> bool {
        self.accessor
            .state(version)
            .is_some_and(|current| current.as_str() == state)
    }
}

impl<E: Entity> std::fmt::Debug for VersionTracker<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionTracker")
            .field("documents", &self.groups.read().len())
            .field("versions", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EmbeddedStateAccessor, StateSlot, StatefulEntity, Transition, Workflow};
    use docflow_types::{Trigger, WorkflowState};

    struct Page {
        slot: StateSlot,
    }

    impl StatefulEntity for Page {
        fn workflow_state(&self) -> WorkflowState {
            self.slot.load()
        }

        fn update_workflow_state(&self, edit: &mut dyn FnMut(&mut WorkflowState)) {
            self.slot.update(edit)
        }
    }

    type Doc = Arc<Page>;

    fn page() -> Doc {
        Arc::new(Page {
            slot: StateSlot::new(),
        })
    }

    fn make_engine() -> TransitionEngine<Doc> {
        let workflow = Workflow::new(vec![
            Transition::entry("init", "Create", "draft"),
            Transition::new("copy", "Copy", "draft", "draft")
                .with_action(|_: &TransitionEngine<Doc>, _: &Doc| Ok(Some(page()))),
            Transition::new("expire", "Expire", "draft", "expired")
                .with_trigger(Trigger::Automatic),
        ])
        .unwrap();
        TransitionEngine::new(Arc::new(workflow), Arc::new(EmbeddedStateAccessor))
    }

    #[test]
    fn test_add_version_requires_id() {
        let engine = make_engine();
        let doc = page();

        let err = engine.versions().add_version(&doc).unwrap_err();
        assert!(matches!(err, WorkflowError::MissingDocumentId));
        assert!(engine.versions().is_empty());
    }

    #[test]
    fn test_group_and_lookup() {
        let engine = make_engine();
        let tracker = engine.versions();
        let doc = page();
        engine.fire_transition("init", &doc).unwrap();
        let copy = engine.fire_transition("copy", &doc).unwrap();

        tracker.add_version(&doc).unwrap();
        tracker.add_version(&copy).unwrap();
        tracker.add_version(&doc).unwrap();

        let id = engine.document_id(&doc).unwrap();
        assert_eq!(tracker.versions(&id).len(), 2);
        assert_eq!(tracker.len(), 2);
        assert!(tracker.has_version_id(&id));
        assert!(tracker.has_version(&id, "draft"));
        assert!(!tracker.has_version(&id, "expired"));
        assert!(tracker.versions(&DocumentId::new("other")).is_empty());
    }

    #[test]
    fn test_has_version_reads_live_state() {
        let engine = make_engine();
        let tracker = engine.versions();
        let doc = page();
        engine.fire_transition("init", &doc).unwrap();
        tracker.add_version(&doc).unwrap();
        let id = engine.document_id(&doc).unwrap();

        engine.fire_transition("expire", &doc).unwrap();
        assert!(tracker.has_version(&id, "expired"));
        assert!(!tracker.has_version(&id, "draft"));
        assert_eq!(tracker.versions_in_state(&id, "expired").len(), 1);
    }

    #[test]
    fn test_sweep_fires_once_per_version() {
        let engine = make_engine();
        let tracker = engine.versions();
        let first = page();
        let second = page();
        for doc in [&first, &second] {
            engine.fire_transition("init", doc).unwrap();
            tracker.add_version(doc).unwrap();
        }

        assert_eq!(tracker.versions_with_automatic_transitions(&engine).len(), 2);

        let report = engine.sweep_automatic().unwrap();
        assert_eq!(report.examined, 2);
        assert_eq!(report.fired_count(), 2);
        assert!(report
            .fired
            .iter()
            .all(|entry| entry.transition == TransitionId::new("expire")
                && entry.to == Some(StateLabel::new("expired"))));

        // Nothing automatic leaves "expired"
        let report = engine.sweep_automatic().unwrap();
        assert_eq!(report, SweepReport::default());
    }

    #[test]
    fn test_clear() {
        let engine = make_engine();
        let doc = page();
        engine.fire_transition("init", &doc).unwrap();
        engine.versions().add_version(&doc).unwrap();

        engine.versions().clear();
        assert!(engine.versions().is_empty());
        assert!(!engine
            .versions()
            .has_version_id(&engine.document_id(&doc).unwrap()));
    }
}
