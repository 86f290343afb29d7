//! Compact signed claims tokens
//!
//! A token is three base64url segments joined by `.`:
//!
//! ```text
//! [header].[claims].[signature]
//! ```
//!
//! The signature is an HMAC over the ASCII bytes of `header + "." + claims`
//! (the encoded segments, not the raw JSON). Verification goes through a
//! [`VerifierRegistry`] built once at startup; expiration is checked against
//! an injected [`Clock`] so it can be driven from tests.

mod claims;
mod clock;
mod codec;
mod issuer;
mod verifier;

pub use claims::Claims;
pub use clock::{Clock, FixedClock, SystemClock};
pub use codec::{decode_and_verify, encode};
pub use issuer::{IssuedToken, TokenConfig, TokenIssuer};
pub use verifier::{Algorithm, HmacVerifier, SigningKey, Verifier, VerifierRegistry, VerifierRegistryBuilder};

use thiserror::Error;

/// Why a token failed verification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Wrong segment count, bad base64, or undecodable JSON
    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Token signature does not match")]
    SignatureMismatch,

    #[error("Token expired")]
    Expired,

    /// No registered verifier for the declared algorithm / key id
    #[error("No verifier registered for {0}")]
    VerifierNotFound(String),
}
