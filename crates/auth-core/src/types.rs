//! Core authentication types shared by realms and the gateway

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::credential::CredentialKind;
use crate::token::TokenError;

/// A verified identity bound to a single request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    /// Identity name (username or token subject)
    pub name: String,

    /// Name of the realm that vouched for this identity
    pub realm: String,

    /// Extra subject attributes, e.g. the token's subject object
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

impl Principal {
    pub fn new(name: impl Into<String>, realm: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            realm: realm.into(),
            attributes: Map::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.attributes = attributes;
        self
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.realm)
    }
}

/// Why a credential was rejected.
///
/// Reasons are logged but never written into a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    MalformedCredentials,
    InvalidCredentials,
    UnsupportedScheme,
    TokenMalformed,
    SignatureMismatch,
    TokenExpired,
    VerifierNotFound,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::MalformedCredentials => "malformed_credentials",
            DenialReason::InvalidCredentials => "invalid_credentials",
            DenialReason::UnsupportedScheme => "unsupported_scheme",
            DenialReason::TokenMalformed => "token_malformed",
            DenialReason::SignatureMismatch => "signature_mismatch",
            DenialReason::TokenExpired => "token_expired",
            DenialReason::VerifierNotFound => "verifier_not_found",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&TokenError> for DenialReason {
    fn from(err: &TokenError) -> Self {
        match err {
            TokenError::Malformed(_) => DenialReason::TokenMalformed,
            TokenError::SignatureMismatch => DenialReason::SignatureMismatch,
            TokenError::Expired => DenialReason::TokenExpired,
            TokenError::VerifierNotFound(_) => DenialReason::VerifierNotFound,
        }
    }
}

/// Result of one authentication attempt. Exactly one is produced per attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthenticationOutcome {
    Authenticated {
        principal: Principal,
        scheme: CredentialKind,
    },
    Denied {
        reason: DenialReason,
    },
}

impl AuthenticationOutcome {
    pub fn authenticated(principal: Principal, scheme: CredentialKind) -> Self {
        AuthenticationOutcome::Authenticated { principal, scheme }
    }

    pub fn denied(reason: DenialReason) -> Self {
        AuthenticationOutcome::Denied { reason }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthenticationOutcome::Authenticated { .. })
    }

    pub fn principal(&self) -> Option<&Principal> {
        match self {
            AuthenticationOutcome::Authenticated { principal, .. } => Some(principal),
            AuthenticationOutcome::Denied { .. } => None,
        }
    }

    pub fn denial_reason(&self) -> Option<DenialReason> {
        match self {
            AuthenticationOutcome::Authenticated { .. } => None,
            AuthenticationOutcome::Denied { reason } => Some(*reason),
        }
    }
}
