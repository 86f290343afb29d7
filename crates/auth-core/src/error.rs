//! Error types for authentication operations

use thiserror::Error;

use crate::realm::RealmError;
use crate::token::TokenError;

/// Errors raised while configuring or running the authentication core.
///
/// Credential judgments are *not* errors: a rejected credential is reported as
/// [`AuthenticationOutcome::Denied`](crate::types::AuthenticationOutcome::Denied).
/// This type covers everything else.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid claims: {0}")]
    InvalidClaims(String),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Realm error: {0}")]
    Realm(#[from] RealmError),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
