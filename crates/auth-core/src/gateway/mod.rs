//! Authenticating gateway
//!
//! Runs once per request, before the request reaches its handler:
//!
//! 1. requests for the login page (anything but a submission on the login
//!    path) pass through untouched;
//! 2. otherwise the `Authorization` header is parsed into a [`Credential`]
//!    and handed to the realm registered for its scheme;
//! 3. an authenticated principal is bound into the request's session and the
//!    request proceeds; a denial produces a `401` challenge (or a redirect to
//!    the login path when configured), a realm failure produces [`Verdict::Unavailable`].
//!
//! Nothing is carried between requests.

mod config;
mod header;

pub use config::{DeniedBehavior, GatewayConfig};
pub use header::parse_authorization;

use http::{header::AUTHORIZATION, HeaderMap, Method, StatusCode};
use std::str::FromStr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::credential::Credential;
use crate::realm::{RealmError, RealmRegistry};
use crate::session::SessionSlot;
use crate::types::{AuthenticationOutcome, DenialReason, Principal};
use crate::{AuthError, Result};

/// The parts of an HTTP request the gateway looks at
#[derive(Debug, Clone, Copy)]
pub struct GatewayRequest<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub headers: &'a HeaderMap,
    pub remote_host: Option<&'a str>,
}

/// What the HTTP layer should do with the request
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Hand the request to its handler; `principal` is set when it authenticated
    Proceed { principal: Option<Principal> },
    /// Answer 401 with this `WWW-Authenticate` value
    Challenge { www_authenticate: String },
    /// Answer 302 to the login page
    Redirect { location: String },
    /// A realm could not be consulted
    Unavailable,
}

impl Verdict {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Verdict::Proceed { .. } => None,
            Verdict::Challenge { .. } => Some(StatusCode::UNAUTHORIZED),
            Verdict::Redirect { .. } => Some(StatusCode::FOUND),
            Verdict::Unavailable => Some(StatusCode::SERVICE_UNAVAILABLE),
        }
    }

    pub fn is_proceed(&self) -> bool {
        matches!(self, Verdict::Proceed { .. })
    }
}

/// Scheme-dispatching authenticator.
///
/// Immutable once built; share it behind an `Arc`.
#[derive(Debug)]
pub struct Gateway {
    config: GatewayConfig,
    realms: RealmRegistry,
    challenge: String,
    submission_method: Method,
    realm_timeout: Duration,
}

impl Gateway {
    pub fn new(config: GatewayConfig, realms: RealmRegistry) -> Result<Self> {
        config.validate()?;
        let submission_method = Method::from_str(&config.login_submission_method.to_ascii_uppercase())
            .map_err(|e| AuthError::Config(format!("Invalid login submission method: {}", e)))?;
        if realms.is_empty() {
            warn!("Gateway built without realms; every request will be denied");
        }

        Ok(Self {
            challenge: config.challenge(),
            realm_timeout: Duration::from_millis(config.realm_timeout_ms),
            submission_method,
            config,
            realms,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The `WWW-Authenticate` value sent with every challenge
    pub fn challenge_header(&self) -> &str {
        &self.challenge
    }

    pub fn is_login_request(&self, path: &str) -> bool {
        self.config.login_path.as_deref() == Some(path)
    }

    pub fn is_login_submission(&self, method: &Method) -> bool {
        *method == self.submission_method
    }

    /// Whether an `Authorization` value uses the configured challenge scheme
    pub fn is_login_attempt(&self, authorization: &str) -> bool {
        let scheme = authorization
            .trim_start()
            .split_once(' ')
            .map_or(authorization.trim(), |(scheme, _)| scheme);
        scheme.eq_ignore_ascii_case(&self.config.challenge_scheme)
    }

    /// Decide what happens to one request.
    ///
    /// On success the principal is bound into `session`, which is started if
    /// the HTTP layer has not done so already. `cancel` is forwarded to the
    /// realm so a disconnected caller stops the credential check.
    pub async fn handle(
        &self,
        request: &GatewayRequest<'_>,
        session: &mut SessionSlot,
        cancel: &CancellationToken,
    ) -> Verdict {
        let on_login_path = self.is_login_request(request.path);
        let submission = self.is_login_submission(request.method);

        if on_login_path && !submission {
            trace!(path = request.path, "Login page view");
            return Verdict::Proceed { principal: None };
        }

        let outcome = match parse_authorization(request.headers.get(AUTHORIZATION)) {
            Ok(credential) => self.authenticate(&credential, cancel).await,
            Err(reason) => Ok(AuthenticationOutcome::denied(reason)),
        };

        match outcome {
            Ok(AuthenticationOutcome::Authenticated { principal, scheme }) => {
                info!(principal = %principal, %scheme, path = request.path, "Request authenticated");
                session
                    .start(request.remote_host.map(str::to_string))
                    .bind_principal(&principal);
                Verdict::Proceed {
                    principal: Some(principal),
                }
            }
            Ok(AuthenticationOutcome::Denied { reason }) => {
                warn!(%reason, method = %request.method, path = request.path, "Authentication denied");
                self.on_denied(on_login_path, submission)
            }
            Err(RealmError::Cancelled) => {
                debug!(path = request.path, "Authentication cancelled by caller");
                Verdict::Unavailable
            }
            Err(e) => {
                error!(error = %e, path = request.path, "Credential realm unavailable");
                Verdict::Unavailable
            }
        }
    }

    /// Verify a credential with the realm registered for its scheme.
    ///
    /// The realm call is bounded by the configured timeout; running out of
    /// time counts as the realm being unavailable.
    pub async fn authenticate(
        &self,
        credential: &Credential,
        cancel: &CancellationToken,
    ) -> std::result::Result<AuthenticationOutcome, RealmError> {
        let kind = credential.kind();
        let Some(realm) = self.realms.realm_for(kind) else {
            debug!(%kind, "No realm registered for scheme");
            return Ok(AuthenticationOutcome::denied(DenialReason::UnsupportedScheme));
        };

        debug!(realm = realm.name(), %kind, "Attempting authentication");
        match tokio::time::timeout(self.realm_timeout, realm.verify(credential, cancel)).await {
            Ok(result) => result,
            Err(_) => Err(RealmError::Unavailable(format!(
                "realm '{}' did not answer within {:?}",
                realm.name(),
                self.realm_timeout
            ))),
        }
    }

    fn on_denied(&self, on_login_path: bool, submission: bool) -> Verdict {
        if on_login_path && !submission {
            return Verdict::Proceed { principal: None };
        }
        if !on_login_path && self.config.denied_behavior == DeniedBehavior::RedirectToLogin {
            if let Some(login_path) = &self.config.login_path {
                return Verdict::Redirect {
                    location: login_path.clone(),
                };
            }
        }
        debug!("Authentication required: sending 401 challenge");
        Verdict::Challenge {
            www_authenticate: self.challenge.clone(),
        }
    }
}
