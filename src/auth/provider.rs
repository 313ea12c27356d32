use std::sync::{Mutex, MutexGuard, PoisonError};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::forms::auth::MIN_PASSWORD_LEN;

/// Account the provider has signed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthIdentity {
    pub uid: String,
    pub email: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email address already in use: {0}")]
    EmailInUse(String),

    #[error("Password must be at least 6 characters")]
    WeakPassword,

    #[error("No user is signed in")]
    NotSignedIn,

    #[error("User not found")]
    UserNotFound,

    #[error("Authentication service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Identity service holding credentials and the signed-in account.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError>;

    /// Creates the account and signs it in.
    async fn create_user(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    fn current(&self) -> Option<AuthIdentity>;

    /// Confirms the signed-in user's credentials before a sensitive change.
    async fn reauthenticate(&self, email: &str, password: &str) -> Result<(), AuthError>;

    async fn update_password(&self, new_password: &str) -> Result<(), AuthError>;

    async fn delete_user(&self) -> Result<(), AuthError>;
}

struct Account {
    uid: String,
    password_hash: String,
}

/// Provider keeping argon2 password hashes in memory.
#[derive(Default)]
pub struct InMemoryAuthProvider {
    accounts: DashMap<String, Account>,
    current: Mutex<Option<AuthIdentity>>,
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Internal(e.to_string()))
}

fn verify_password(password: &str, stored: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored).map_err(|e| AuthError::Internal(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

impl InMemoryAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn session(&self) -> MutexGuard<'_, Option<AuthIdentity>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError> {
        let key = normalize(email);
        let account = self.accounts.get(&key).ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(password, &account.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(AuthIdentity {
            uid: account.uid.clone(),
            email: key,
        })
    }

    fn signed_in(&self) -> Result<AuthIdentity, AuthError> {
        self.session().clone().ok_or(AuthError::NotSignedIn)
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuthProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError> {
        let identity = self.check(email, password)?;
        *self.session() = Some(identity.clone());
        Ok(identity)
    }

    async fn create_user(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        let key = normalize(email);
        let password_hash = hash_password(password)?;
        let uid = Uuid::new_v4().simple().to_string();

        match self.accounts.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => return Err(AuthError::EmailInUse(key)),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Account {
                    uid: uid.clone(),
                    password_hash,
                });
            }
        }

        let identity = AuthIdentity { uid, email: key };
        *self.session() = Some(identity.clone());
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        *self.session() = None;
        Ok(())
    }

    fn current(&self) -> Option<AuthIdentity> {
        self.session().clone()
    }

    async fn reauthenticate(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let current = self.signed_in()?;
        let confirmed = self.check(email, password)?;
        if confirmed.uid != current.uid {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(())
    }

    async fn update_password(&self, new_password: &str) -> Result<(), AuthError> {
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        let current = self.signed_in()?;
        let password_hash = hash_password(new_password)?;
        let mut account = self
            .accounts
            .get_mut(&current.email)
            .ok_or(AuthError::UserNotFound)?;
        account.password_hash = password_hash;
        Ok(())
    }

    async fn delete_user(&self) -> Result<(), AuthError> {
        let current = self.signed_in()?;
        self.accounts
            .remove(&current.email)
            .ok_or(AuthError::UserNotFound)?;
        *self.session() = None;
        Ok(())
    }
}
