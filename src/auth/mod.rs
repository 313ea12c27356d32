/*!
 * # Accounts and sessions
 *
 * [`AuthService`] drives sign-in, registration, password changes and account
 * deletion against an [`AuthProvider`], keeps the user's profile document in
 * the `users` collection, and publishes the result through a shared
 * [`SessionContext`].
 */

use std::sync::Arc;

use tracing::{info, instrument, warn};

pub mod provider;
pub mod session;

pub use provider::{AuthError, AuthIdentity, AuthProvider, InMemoryAuthProvider};
pub use session::{Session, SessionContext};

use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::forms::{ChangePasswordForm, FormState, LoginForm, RegistrationForm};
use crate::models::User;
use crate::store::{DocumentStore, FromDocument, IntoDocument};

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotSignedIn => ServiceError::Unauthorized(err.to_string()),
            AuthError::Unavailable(_) => ServiceError::ExternalServiceError(err.to_string()),
            AuthError::WeakPassword => ServiceError::ValidationError(err.to_string()),
            _ => ServiceError::AuthError(err.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    provider: Arc<dyn AuthProvider>,
    store: Arc<dyn DocumentStore>,
    session: SessionContext,
    events: EventSender,
}

impl AuthService {
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        store: Arc<dyn DocumentStore>,
        session: SessionContext,
        events: EventSender,
    ) -> Self {
        Self {
            provider,
            store,
            session,
            events,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Picks up an identity the provider already holds, e.g. after restart.
    pub async fn restore(&self) -> Option<Session> {
        let identity = self.provider.current()?;
        let session = self.start_session(identity).await;
        Some(session)
    }

    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn sign_in(&self, form: &LoginForm) -> Result<Session, ServiceError> {
        form.check()?;
        let identity = self.provider.sign_in(&form.email, &form.password).await?;
        let session = self.start_session(identity).await;
        self.events
            .publish(Event::UserSignedIn(session.user_id().to_string()))
            .await;
        Ok(session)
    }

    /// Creates the account and its profile document, then signs in.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn register(&self, form: &RegistrationForm) -> Result<Session, ServiceError> {
        form.check()?;
        let identity = self.provider.create_user(&form.email, &form.password).await?;
        let profile = User {
            id: identity.uid.clone(),
            full_name: form.full_name.clone(),
            phone: form.phone.clone(),
            email: form.email.clone(),
        };
        self.store
            .set(User::COLLECTION, &profile.id, profile.to_document())
            .await?;

        let session = Session {
            identity,
            profile: Some(profile),
        };
        self.session.set(Some(session.clone()));
        info!(user_id = %session.user_id(), "Registered user");
        self.events
            .publish(Event::UserRegistered(session.user_id().to_string()))
            .await;
        Ok(session)
    }

    pub async fn sign_out(&self) -> Result<(), ServiceError> {
        self.provider.sign_out().await?;
        self.session.clear();
        self.events.publish(Event::UserSignedOut).await;
        Ok(())
    }

    /// Re-checks the current password, then sets the new one.
    #[instrument(skip(self, form))]
    pub async fn change_password(&self, form: &ChangePasswordForm) -> Result<(), ServiceError> {
        form.check()?;
        let session = self
            .session
            .current()
            .ok_or_else(|| ServiceError::Unauthorized("User not logged in".into()))?;
        self.provider
            .reauthenticate(&session.identity.email, &form.current_password)
            .await?;
        self.provider.update_password(&form.new_password).await?;
        self.events
            .publish(Event::PasswordChanged(session.user_id().to_string()))
            .await;
        Ok(())
    }

    /// Removes the profile document and the account.
    #[instrument(skip(self))]
    pub async fn delete_account(&self) -> Result<(), ServiceError> {
        let user_id = self.session.require_user_id()?;
        self.store.delete(User::COLLECTION, &user_id).await?;
        self.provider.delete_user().await?;
        self.session.clear();
        self.events.publish(Event::AccountDeleted(user_id)).await;
        Ok(())
    }

    pub async fn fetch_user(&self, uid: &str) -> Result<Option<User>, ServiceError> {
        match self.store.get(User::COLLECTION, uid).await? {
            Some(snapshot) => Ok(Some(User::from_document(&snapshot)?)),
            None => Ok(None),
        }
    }

    async fn start_session(&self, identity: AuthIdentity) -> Session {
        let profile = match self.fetch_user(&identity.uid).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id = %identity.uid, error = %e, "Failed to load user profile");
                None
            }
        };
        let session = Session { identity, profile };
        self.session.set(Some(session.clone()));
        session
    }
}
