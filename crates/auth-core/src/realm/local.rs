//! Username/password realm backed by salted password hashes

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Argon2Hasher, Realm, RealmError};
use crate::credential::{Credential, CredentialKind};
use crate::types::{AuthenticationOutcome, DenialReason, Principal};
use crate::Result;

/// Lookup of stored password hashes.
///
/// Errors mean the store could not be consulted; an unknown user is `Ok(None)`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn password_hash(&self, username: &str) -> std::result::Result<Option<String>, RealmError>;
}

/// Fixed username → PHC hash map
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentialStore {
    hashes: HashMap<String, String>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user, hashing `password` with `hasher`
    pub fn with_user(mut self, username: impl Into<String>, password: &str, hasher: &Argon2Hasher) -> Result<Self> {
        self.hashes.insert(username.into(), hasher.hash(password)?);
        Ok(self)
    }

    /// Add a user with an already computed PHC hash
    pub fn with_hash(mut self, username: impl Into<String>, phc: impl Into<String>) -> Self {
        self.hashes.insert(username.into(), phc.into());
        self
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn password_hash(&self, username: &str) -> std::result::Result<Option<String>, RealmError> {
        Ok(self.hashes.get(username).cloned())
    }
}

/// Realm checking `Basic` credentials against a [`CredentialStore`].
pub struct LocalPasswordRealm {
    name: String,
    store: Arc<dyn CredentialStore>,
    hasher: Argon2Hasher,
    // Verified against for unknown users so both paths cost one hash
    dummy_hash: String,
}

impl LocalPasswordRealm {
    pub fn new(name: impl Into<String>, store: Arc<dyn CredentialStore>, hasher: Argon2Hasher) -> Result<Self> {
        let dummy_hash = hasher.hash("gatekeeper-dummy-password")?;
        Ok(Self {
            name: name.into(),
            store,
            hasher,
            dummy_hash,
        })
    }
}

#[async_trait]
impl Realm for LocalPasswordRealm {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> CredentialKind {
        CredentialKind::Basic
    }

    async fn verify(
        &self,
        credential: &Credential,
        cancel: &CancellationToken,
    ) -> std::result::Result<AuthenticationOutcome, RealmError> {
        let Credential::UsernamePassword { username, password } = credential else {
            return Ok(AuthenticationOutcome::denied(DenialReason::UnsupportedScheme));
        };
        if username.is_empty() || password.is_empty() {
            return Ok(AuthenticationOutcome::denied(DenialReason::MalformedCredentials));
        }

        let stored = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RealmError::Cancelled),
            stored = self.store.password_hash(username) => stored?,
        };
        let known = stored.is_some();
        let phc = stored.unwrap_or_else(|| self.dummy_hash.clone());

        let hasher = self.hasher.clone();
        let password = password.clone();
        let check = tokio::task::spawn_blocking(move || hasher.verify(&password, &phc));
        let matched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RealmError::Cancelled),
            joined = check => joined.map_err(|e| RealmError::Unavailable(format!("password check failed: {}", e)))?,
        };

        if known && matched {
            Ok(AuthenticationOutcome::authenticated(
                Principal::new(username.clone(), self.name.clone()),
                CredentialKind::Basic,
            ))
        } else {
            debug!(realm = %self.name, known, "password verification failed");
            Ok(AuthenticationOutcome::denied(DenialReason::InvalidCredentials))
        }
    }
}
