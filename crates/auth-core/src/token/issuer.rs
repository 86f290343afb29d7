//! Token issuance

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{encode, Algorithm, Claims, Clock, SigningKey, VerifierRegistry};
use crate::{AuthError, Result};

/// Token configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub issuer: String,
    pub audience: String,
    pub token_type: String,
    pub ttl_seconds: u64,
    pub algorithm: String,
    pub key_id: Option<String>,
    /// Payload key holding the subject object
    pub subject_key: String,
    /// Shared HMAC secret; a random one is generated when unset
    pub secret: Option<String>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: "gatekeeper".to_string(),
            audience: "gatekeeper".to_string(),
            token_type: "gatekeeper/authentication/user/v1".to_string(),
            ttl_seconds: 60,
            algorithm: "HS256".to_string(),
            key_id: None,
            subject_key: "user".to_string(),
            secret: None,
        }
    }
}

impl TokenConfig {
    /// Build the signing key this configuration describes
    pub fn signing_key(&self) -> Result<SigningKey> {
        let algorithm: Algorithm = self.algorithm.parse()?;
        let key = match &self.secret {
            Some(secret) => SigningKey::new(algorithm, secret.as_bytes())?,
            None => {
                warn!("No token secret configured, generating an ephemeral one; tokens will not survive a restart");
                SigningKey::new(algorithm, Self::generate_secret())?
            }
        };
        Ok(match &self.key_id {
            Some(kid) => key.with_key_id(kid.clone()),
            None => key,
        })
    }

    /// Token lifetime; zero and values chrono cannot represent are rejected
    pub fn ttl(&self) -> Result<Duration> {
        if self.ttl_seconds == 0 {
            return Err(AuthError::Config("Token TTL must be positive".to_string()));
        }
        i64::try_from(self.ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| AuthError::Config(format!("Token TTL too large: {}", self.ttl_seconds)))
    }

    fn generate_secret() -> [u8; 32] {
        let mut secret = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut secret);
        secret
    }
}

/// A freshly minted token
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub expires_in: u64,
}

/// Mints tokens for authenticated subjects.
pub struct TokenIssuer {
    key: SigningKey,
    issuer: String,
    audience: String,
    token_type: String,
    ttl: Duration,
    subject_key: String,
}

impl TokenIssuer {
    pub fn new(config: &TokenConfig) -> Result<Self> {
        Self::with_key(config, config.signing_key()?)
    }

    pub fn with_key(config: &TokenConfig, key: SigningKey) -> Result<Self> {
        let ttl = config.ttl()?;
        Ok(Self {
            key,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            token_type: config.token_type.clone(),
            ttl,
            subject_key: config.subject_key.clone(),
        })
    }

    /// Issue a token carrying `subject` under the configured subject key.
    pub fn issue<T: Serialize>(&self, subject: &T, clock: &dyn Clock) -> Result<IssuedToken> {
        let now = clock.now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AuthError::InvalidClaims(format!("expiry overflows {} + {}s", now, self.ttl.num_seconds())))?;
        let claims = Claims::new(&self.issuer, &self.audience, &self.token_type, now, expires_at)?
            .with_entity(&self.subject_key, subject)?;

        Ok(IssuedToken {
            token: encode(&claims, &self.key)?,
            expires_at,
            expires_in: self.ttl.num_seconds().max(0) as u64,
        })
    }

    /// Registry accepting this issuer's tokens
    pub fn verifier_registry(&self) -> VerifierRegistry {
        VerifierRegistry::for_key(&self.key)
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.key
    }

    pub fn subject_key(&self) -> &str {
        &self.subject_key
    }
}
