//! Shared application state

use auth_core::realm::Argon2Hasher;
use auth_core::token::TokenIssuer;
use auth_core::{
    BearerTokenRealm, Clock, Gateway, InMemoryCredentialStore, LocalPasswordRealm, RealmRegistry, SystemClock,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ServerConfig;

/// Name of the realm backed by the configured user list
pub const LOCAL_REALM: &str = "local";

/// Field of the token subject object holding the principal name
pub const SUBJECT_NAME_FIELD: &str = "username";

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub issuer: Arc<TokenIssuer>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> auth_core::Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build the gateway, realms and token issuer, reading time from `clock`
    pub fn with_clock(config: &ServerConfig, clock: Arc<dyn Clock>) -> auth_core::Result<Self> {
        let issuer = TokenIssuer::new(&config.auth.token)?;

        let store = config
            .users
            .iter()
            .fold(InMemoryCredentialStore::new(), |store, user| {
                store.with_hash(user.username.clone(), user.password_hash.clone())
            });
        if store.len() == 0 {
            warn!("No users configured; Basic authentication will always be denied");
        }
        info!(users = store.len(), "Loaded local accounts");

        let hasher = Argon2Hasher::new(&config.auth.password)?;
        let local = LocalPasswordRealm::new(LOCAL_REALM, Arc::new(store), hasher)?;
        let bearer = BearerTokenRealm::new(Arc::new(issuer.verifier_registry()), Arc::clone(&clock))
            .with_subject(issuer.subject_key(), SUBJECT_NAME_FIELD);

        let realms = RealmRegistry::builder()
            .with_realm(local)?
            .with_realm(bearer)?
            .build();

        Ok(Self {
            gateway: Arc::new(Gateway::new(config.auth.gateway.clone(), realms)?),
            issuer: Arc::new(issuer),
            clock,
        })
    }
}
