//! Gateway configuration

use serde::Deserialize;

use crate::{AuthError, Result};

/// What to do when a request outside the login path is denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeniedBehavior {
    /// 401 with a `WWW-Authenticate` challenge
    #[default]
    AlwaysChallenge,
    /// 302 to the login path
    RedirectToLogin,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Realm name sent in the challenge
    pub application_name: String,
    /// Scheme sent in the challenge, regardless of what the caller tried
    pub challenge_scheme: String,
    pub login_path: Option<String>,
    pub login_submission_method: String,
    pub denied_behavior: DeniedBehavior,
    /// Upper bound on a single realm check
    pub realm_timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            application_name: "application".to_string(),
            challenge_scheme: "Basic".to_string(),
            login_path: Some("/login".to_string()),
            login_submission_method: "POST".to_string(),
            denied_behavior: DeniedBehavior::AlwaysChallenge,
            realm_timeout_ms: 5_000,
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        let scheme = &self.challenge_scheme;
        if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || "-._~+".contains(c)) {
            return Err(AuthError::Config(format!("Invalid challenge scheme: {:?}", scheme)));
        }
        if self.application_name.contains('"') || self.application_name.chars().any(|c| c.is_control()) {
            return Err(AuthError::Config(format!(
                "Application name cannot be quoted in a challenge: {:?}",
                self.application_name
            )));
        }
        if let Some(path) = &self.login_path {
            if !path.starts_with('/') {
                return Err(AuthError::Config(format!("Login path must start with '/': {}", path)));
            }
        }
        if self.denied_behavior == DeniedBehavior::RedirectToLogin && self.login_path.is_none() {
            return Err(AuthError::Config(
                "redirect-to-login requires a login path".to_string(),
            ));
        }
        if self.realm_timeout_ms == 0 {
            return Err(AuthError::Config("Realm timeout must be positive".to_string()));
        }
        Ok(())
    }

    /// `WWW-Authenticate` value, e.g. `Basic realm="application"`
    pub fn challenge(&self) -> String {
        format!("{} realm=\"{}\"", self.challenge_scheme, self.application_name)
    }
}
