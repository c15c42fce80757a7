//! Identifiers used throughout docflow

use serde::{Deserialize, Serialize};

// ── State Labels ─────────────────────────────────────────────────────

/// Name of a node in the workflow graph
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateLabel(pub String);

impl StateLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StateLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StateLabel {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

/// Render an optional state for messages; `None` reads as `<none>`.
pub fn display_state(state: &Option<StateLabel>) -> String {
    match state {
        Some(label) => label.0.clone(),
        None => "<none>".to_string(),
    }
}

// ── Transition Identifiers ───────────────────────────────────────────

/// Identifier of a transition, unique among transitions sharing a source
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionId(pub String);

impl TransitionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TransitionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ── Document Identifiers ─────────────────────────────────────────────

/// Logical identifier shared by all versions of one document
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// First eight characters, for log lines
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Permissions ──────────────────────────────────────────────────────

/// Opaque permission token required to fire a transition
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission(pub String);

impl Permission {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_generate_unique() {
        let a = DocumentId::generate();
        let b = DocumentId::generate();
        assert_ne!(a, b);
        assert_eq!(a.short().len(), 8);
    }

    #[test]
    fn test_short_cuts_on_char_boundary() {
        let id = DocumentId::new("ドキュメント-0001");
        assert_eq!(id.short(), "ドキュメント-0");
        assert_eq!(DocumentId::new("ドキュメント").short(), "ドキュメント");
        assert_eq!(DocumentId::new("d1").short(), "d1");
        assert_eq!(DocumentId::new("").short(), "");
    }

    #[test]
    fn test_display_state() {
        assert_eq!(display_state(&Some(StateLabel::new("draft"))), "draft");
        assert_eq!(display_state(&None), "<none>");
    }

    #[test]
    fn test_labels_serialize_transparently() {
        let json = serde_json::to_string(&StateLabel::new("published")).unwrap();
        assert_eq!(json, "\"published\"");
    }
}
