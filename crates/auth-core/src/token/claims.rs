use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::TokenError;
use crate::{AuthError, Result};

/// Claim names owned by the token itself; payload entries may not reuse them.
const RESERVED_CLAIMS: &[&str] = &["iss", "aud", "iat", "exp", "typ"];

/// Signed token payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "iss")]
    pub issuer: String,

    #[serde(rename = "aud")]
    pub audience: String,

    /// Issued-at, unix seconds
    #[serde(rename = "iat")]
    pub issued_at: i64,

    /// Expires-at, unix seconds
    #[serde(rename = "exp")]
    pub expires_at: i64,

    #[serde(rename = "typ")]
    pub token_type: String,

    /// Application payload, e.g. `"user": {"username": "alice"}`
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Claims {
    /// Build claims for the window `[issued_at, expires_at)`.
    ///
    /// Fails unless `expires_at` is strictly after `issued_at`.
    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        token_type: impl Into<String>,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Self> {
        let issued_at = issued_at.timestamp();
        let expires_at = expires_at.timestamp();
        if expires_at <= issued_at {
            return Err(AuthError::InvalidClaims(format!(
                "expiration {} is not after issue time {}",
                expires_at, issued_at
            )));
        }
        Ok(Self {
            issuer: issuer.into(),
            audience: audience.into(),
            issued_at,
            expires_at,
            token_type: token_type.into(),
            payload: Map::new(),
        })
    }

    /// Attach a subject object (or any serializable value) under `key`.
    pub fn with_entity<T: Serialize>(mut self, key: &str, entity: &T) -> Result<Self> {
        if RESERVED_CLAIMS.contains(&key) {
            return Err(AuthError::InvalidClaims(format!("'{}' is a reserved claim", key)));
        }
        self.payload.insert(key.to_string(), serde_json::to_value(entity)?);
        Ok(self)
    }

    /// Deserialize the payload entry under `key`.
    pub fn entity<T: DeserializeOwned>(&self, key: &str) -> std::result::Result<T, TokenError> {
        let value = self
            .payload
            .get(key)
            .ok_or_else(|| TokenError::Malformed(format!("missing '{}' claim", key)))?;
        serde_json::from_value(value.clone())
            .map_err(|e| TokenError::Malformed(format!("invalid '{}' claim: {}", key, e)))
    }

    /// Raw payload entry under `key`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn issued_at_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.issued_at, 0)
    }

    pub fn expires_at_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.expires_at, 0)
    }

    /// A token is expired once `now` reaches `exp`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now.timestamp()
    }

    pub(crate) fn check_payload(&self) -> Result<()> {
        if let Some(key) = RESERVED_CLAIMS.iter().find(|k| self.payload.contains_key(**k)) {
            return Err(AuthError::InvalidClaims(format!("payload reuses reserved claim '{}'", key)));
        }
        Ok(())
    }
}
