//! Identity provider boundary. A missing identity is a normal, checked state.

use std::sync::RwLock;

use ekami_domain::Identity;

pub trait IdentityProvider: Send + Sync {
    /// Returns the signed-in customer, or `None` when nobody is signed in.
    fn current_identity(&self) -> Option<Identity>;
}

/// Provider that always answers with the same identity (or the same absence).
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(pub Option<Identity>);

impl StaticIdentity {
    pub fn signed_in(identity: Identity) -> Self {
        Self(Some(identity))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_identity(&self) -> Option<Identity> {
        self.0.clone()
    }
}

/// Mutable sign-in state for a single interactive session.
#[derive(Debug, Default)]
pub struct SessionIdentity {
    current: RwLock<Option<Identity>>,
}

impl SessionIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, identity: Identity) {
        if let Ok(mut guard) = self.current.write() {
            tracing::info!(user_id = %identity.user_id, "signed in");
            *guard = Some(identity);
        }
    }

    /// Clears the identity, returning whoever was signed in.
    pub fn sign_out(&self) -> Option<Identity> {
        self.current
            .write()
            .ok()
            .and_then(|mut guard| guard.take())
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_identity(&self) -> Option<Identity> {
        self.current.read().ok().and_then(|guard| guard.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_identity_signs_in_and_out() {
        let session = SessionIdentity::new();
        assert!(session.current_identity().is_none());

        session.sign_in(Identity::new("u-1", "Ada", "ada@example.com"));
        assert_eq!(
            session.current_identity().map(|id| id.user_id),
            Some("u-1".to_string())
        );

        let previous = session.sign_out();
        assert_eq!(previous.map(|id| id.display_name), Some("Ada".to_string()));
        assert!(session.current_identity().is_none());
    }
}
