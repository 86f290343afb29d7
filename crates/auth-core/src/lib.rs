//! # Auth-Core - HTTP request authentication
//!
//! Decides, per request, whether the caller is authenticated, with which
//! credential scheme, and which principal to bind for the rest of the request.
//!
//! - [`token`]: compact HMAC-signed claims tokens
//! - [`realm`]: pluggable credential verification (local passwords, bearer tokens)
//! - [`session`]: sessions that live for exactly one request
//! - [`gateway`]: the `Basic`/`Bearer` challenge-response state machine
//!
//! The HTTP server is not part of this crate; it calls
//! [`Gateway::handle`](gateway::Gateway::handle) and acts on the returned
//! [`Verdict`](gateway::Verdict).

pub mod config;
pub mod credential;
pub mod error;
pub mod gateway;
pub mod realm;
pub mod session;
pub mod token;
pub mod types;

pub use config::AuthConfig;
pub use credential::{Credential, CredentialKind};
pub use error::{AuthError, Result};
pub use gateway::{DeniedBehavior, Gateway, GatewayConfig, GatewayRequest, Verdict};
pub use realm::{BearerTokenRealm, CredentialStore, InMemoryCredentialStore, LocalPasswordRealm, Realm, RealmError, RealmRegistry};
pub use session::{RequestSession, SessionSlot, PRINCIPAL_ATTRIBUTE};
pub use token::{Claims, Clock, SigningKey, SystemClock, TokenError, TokenIssuer, VerifierRegistry};
pub use types::{AuthenticationOutcome, DenialReason, Principal};
