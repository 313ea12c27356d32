use std::sync::Arc;

use tokio::sync::watch;

use super::provider::AuthIdentity;
use crate::errors::ServiceError;
use crate::models::User;

/// Signed-in identity plus its stored profile, if one was found.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub identity: AuthIdentity,
    pub profile: Option<User>,
}

impl Session {
    pub fn user_id(&self) -> &str {
        &self.identity.uid
    }
}

/// Current session shared by every service that needs the user.
///
/// Cloning shares the same state. Observers get a [`watch::Receiver`] and
/// see sign-in and sign-out as they happen.
#[derive(Debug, Clone)]
pub struct SessionContext {
    state: Arc<watch::Sender<Option<Session>>>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            state: Arc::new(state),
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }

    pub fn set(&self, session: Option<Session>) {
        self.state.send_replace(session);
    }

    pub fn clear(&self) {
        self.set(None);
    }

    pub fn is_signed_in(&self) -> bool {
        self.state.borrow().is_some()
    }

    pub fn require_user_id(&self) -> Result<String, ServiceError> {
        self.state
            .borrow()
            .as_ref()
            .map(|session| session.user_id().to_string())
            .ok_or_else(|| ServiceError::Unauthorized("User not logged in".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            identity: AuthIdentity {
                uid: "u1".into(),
                email: "a@b.c".into(),
            },
            profile: None,
        }
    }

    #[tokio::test]
    async fn observers_see_changes() {
        let context = SessionContext::new();
        let mut rx = context.subscribe();
        assert!(context.require_user_id().is_err());

        context.set(Some(session()));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().map(|s| s.user_id().to_string()), Some("u1".into()));

        let shared = context.clone();
        shared.clear();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
        assert!(!context.is_signed_in());
    }
}
