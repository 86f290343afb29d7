//! Credentials presented by a caller

use serde::{Deserialize, Serialize};
use std::fmt;

/// Credential scheme, used to pick the realm that verifies a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    Basic,
    Bearer,
}

impl CredentialKind {
    /// Scheme token as it appears on the wire
    pub fn scheme(&self) -> &'static str {
        match self {
            CredentialKind::Basic => "Basic",
            CredentialKind::Bearer => "Bearer",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// A credential built fresh for one request. Never persisted.
///
/// New schemes are added by extending this enum and the gateway's dispatch.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    UsernamePassword { username: String, password: String },
    BearerToken(String),
}

impl Credential {
    pub fn username_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credential::UsernamePassword {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Credential::BearerToken(token.into())
    }

    /// Empty username/password pair, used when no usable header was sent
    pub fn anonymous() -> Self {
        Credential::username_password("", "")
    }

    pub fn kind(&self) -> CredentialKind {
        match self {
            Credential::UsernamePassword { .. } => CredentialKind::Basic,
            Credential::BearerToken(_) => CredentialKind::Bearer,
        }
    }
}

// Secrets stay out of logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::UsernamePassword { username, .. } => f
                .debug_struct("UsernamePassword")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Credential::BearerToken(_) => f.debug_tuple("BearerToken").field(&"<redacted>").finish(),
        }
    }
}
