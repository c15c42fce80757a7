//! Engine configuration

use serde::{Deserialize, Serialize};

/// Tunables for a [`TransitionEngine`](crate::TransitionEngine).
///
/// Missing fields take their defaults when deserialized, so a host can
/// load a partial document from its own configuration file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Enforce transition permissions when cascading onto sibling versions
    pub cascade_check_security: bool,
    /// Send an entity-modified notification after each transition event
    pub notify_modified: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cascade_check_security: false,
            notify_modified: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(!config.cascade_check_security);
        assert!(config.notify_modified);
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "cascade_check_security": true }"#).unwrap();
        assert!(config.cascade_check_security);
        assert!(config.notify_modified);

        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }
}
