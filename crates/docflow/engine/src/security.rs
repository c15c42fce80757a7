//! Authorization: who is acting, and what they may do
//!
//! The engine asks an [`Authorizer`] for the current principal and
//! whether it holds a transition's permission. [`Principal::System`]
//! always passes; the engine checks for it before consulting the
//! authorizer.

use docflow_types::{Permission, Principal};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// Resolves the ambient principal and checks its permissions
pub trait Authorizer: Send + Sync {
    /// The principal on whose behalf the engine is currently acting
    fn current_principal(&self) -> Principal;

    /// Whether `principal` holds `permission`
    fn has_permission(&self, principal: &Principal, permission: &Permission) -> bool;
}

/// Authorizer for hosts without a security layer: everything runs as
/// the system principal.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemAuthorizer;

impl Authorizer for SystemAuthorizer {
    fn current_principal(&self) -> Principal {
        Principal::System
    }

    fn has_permission(&self, _principal: &Principal, _permission: &Permission) -> bool {
        true
    }
}

/// In-memory authorizer with a switchable current principal and
/// explicit per-principal grants.
#[derive(Debug)]
pub struct StaticAuthorizer {
    current: RwLock<Principal>,
    grants: RwLock<HashMap<Principal, HashSet<Permission>>>,
}

impl StaticAuthorizer {
    pub fn new(principal: Principal) -> Self {
        Self {
            current: RwLock::new(principal),
            grants: RwLock::new(HashMap::new()),
        }
    }

    /// Act as `principal` from now on
    pub fn set_principal(&self, principal: Principal) {
        *self.current.write() = principal;
    }

    /// Grant a permission to a principal
    pub fn grant(&self, principal: Principal, permission: impl Into<String>) {
        self.grants
            .write()
            .entry(principal)
            .or_default()
            .insert(Permission::new(permission));
    }

    /// Revoke a permission; returns whether it was held
    pub fn revoke(&self, principal: &Principal, permission: &Permission) -> bool {
        self.grants
            .write()
            .get_mut(principal)
            .map(|held| held.remove(permission))
            .unwrap_or(false)
    }
}

impl Authorizer for StaticAuthorizer {
    fn current_principal(&self) -> Principal {
        self.current.read().clone()
    }

    fn has_permission(&self, principal: &Principal, permission: &Permission) -> bool {
        self.grants
            .read()
            .get(principal)
            .is_some_and(|held| held.contains(permission))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_authorizer() {
        let auth = SystemAuthorizer;
        assert!(auth.current_principal().is_system());
        assert!(auth.has_permission(&Principal::user("anyone"), &Permission::new("x")));
    }

    #[test]
    fn test_static_grant_and_revoke() {
        let alice = Principal::user("alice");
        let auth = StaticAuthorizer::new(alice.clone());
        let publish = Permission::new("docs.publish");

        assert!(!auth.has_permission(&alice, &publish));

        auth.grant(alice.clone(), "docs.publish");
        assert!(auth.has_permission(&alice, &publish));
        assert!(!auth.has_permission(&Principal::user("bob"), &publish));

        assert!(auth.revoke(&alice, &publish));
        assert!(!auth.revoke(&alice, &publish));
        assert!(!auth.has_permission(&alice, &publish));
    }

    #[test]
    fn test_switch_principal() {
        let auth = StaticAuthorizer::new(Principal::user("alice"));
        auth.set_principal(Principal::System);
        assert_eq!(auth.current_principal(), Principal::System);
    }
}
