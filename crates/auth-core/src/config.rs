//! Configuration for auth-core

use chrono::Utc;
use serde::Deserialize;

use crate::gateway::GatewayConfig;
use crate::realm::PasswordConfig;
use crate::token::TokenConfig;
use crate::AuthError;

/// Main configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub gateway: GatewayConfig,
    pub token: TokenConfig,
    pub password: PasswordConfig,
}

impl AuthConfig {
    pub fn validate(&self) -> crate::Result<()> {
        self.gateway.validate()?;
        self.token.algorithm.parse::<crate::token::Algorithm>()?;
        let ttl = self.token.ttl()?;
        if Utc::now().checked_add_signed(ttl).is_none() {
            return Err(AuthError::Config(format!(
                "Token TTL of {}s puts expiry past the representable calendar",
                self.token.ttl_seconds
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AuthConfig = serde_json::from_str(
            r#"{ "gateway": { "application_name": "billing", "denied_behavior": "redirect-to-login" },
                 "token": { "ttl_seconds": 300 } }"#,
        )
        .unwrap();

        assert_eq!(config.gateway.application_name, "billing");
        assert_eq!(config.gateway.challenge_scheme, "Basic");
        assert_eq!(config.token.ttl_seconds, 300);
        assert_eq!(config.token.algorithm, "HS256");
        assert_eq!(config.password.argon2_time_cost, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_algorithm_fails_validation() {
        let mut config = AuthConfig::default();
        config.token.algorithm = "ES256".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_ttl_fails_validation() {
        for ttl_seconds in [0, 100_000_000_000_000, 10_000_000_000_000_000, u64::MAX] {
            let mut config = AuthConfig::default();
            config.token.ttl_seconds = ttl_seconds;
            assert!(matches!(config.validate(), Err(AuthError::Config(_))), "ttl {}", ttl_seconds);
        }
    }
}
