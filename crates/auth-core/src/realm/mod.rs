//! Credential realms
//!
//! A realm verifies one kind of credential and answers with an
//! [`AuthenticationOutcome`]. Rejection is an outcome, not an error:
//! [`RealmError`] is reserved for infrastructure trouble such as an
//! unreachable credential store.

mod bearer;
mod local;
mod password;

pub use bearer::BearerTokenRealm;
pub use local::{CredentialStore, InMemoryCredentialStore, LocalPasswordRealm};
pub use password::{Argon2Hasher, PasswordConfig};

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::credential::{Credential, CredentialKind};
use crate::types::AuthenticationOutcome;
use crate::{AuthError, Result};

/// Infrastructure failure inside a realm
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RealmError {
    #[error("Realm unavailable: {0}")]
    Unavailable(String),

    #[error("Realm call cancelled")]
    Cancelled,
}

/// A pluggable credential verifier.
#[async_trait]
pub trait Realm: Send + Sync {
    /// Name recorded on principals this realm produces
    fn name(&self) -> &str;

    /// The credential kind this realm handles
    fn kind(&self) -> CredentialKind;

    /// Verify `credential`.
    ///
    /// Implementations that wait on a backing store must stop waiting once
    /// `cancel` fires and return [`RealmError::Cancelled`].
    async fn verify(
        &self,
        credential: &Credential,
        cancel: &CancellationToken,
    ) -> std::result::Result<AuthenticationOutcome, RealmError>;
}

/// Immutable realm set, one realm per credential kind.
#[derive(Clone, Default)]
pub struct RealmRegistry {
    realms: HashMap<CredentialKind, Arc<dyn Realm>>,
}

impl RealmRegistry {
    pub fn builder() -> RealmRegistryBuilder {
        RealmRegistryBuilder::default()
    }

    pub fn realm_for(&self, kind: CredentialKind) -> Option<&Arc<dyn Realm>> {
        self.realms.get(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.realms.is_empty()
    }
}

impl fmt::Debug for RealmRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: HashMap<CredentialKind, &str> = self.realms.iter().map(|(k, r)| (*k, r.name())).collect();
        f.debug_struct("RealmRegistry").field("realms", &names).finish()
    }
}

#[derive(Default)]
pub struct RealmRegistryBuilder {
    realms: HashMap<CredentialKind, Arc<dyn Realm>>,
}

impl RealmRegistryBuilder {
    /// Register a realm. A second realm for the same kind is a configuration error.
    pub fn with_realm(mut self, realm: impl Realm + 'static) -> Result<Self> {
        self.register(Arc::new(realm))?;
        Ok(self)
    }

    pub fn register(&mut self, realm: Arc<dyn Realm>) -> Result<()> {
        let kind = realm.kind();
        if let Some(existing) = self.realms.get(&kind) {
            return Err(AuthError::Config(format!(
                "Realm '{}' already handles {} credentials, cannot add '{}'",
                existing.name(),
                kind,
                realm.name()
            )));
        }
        self.realms.insert(kind, realm);
        Ok(())
    }

    pub fn build(self) -> RealmRegistry {
        RealmRegistry { realms: self.realms }
    }
}
