//! Server configuration
//!
//! Read from an optional TOML file, then overridden by `GATEKEEPER__*`
//! environment variables (`GATEKEEPER__AUTH__TOKEN__SECRET=...`).

use anyhow::{Context, Result};
use auth_core::AuthConfig;
use serde::Deserialize;
use std::path::Path;

use crate::logging::LoggingConfig;

const ENV_PREFIX: &str = "GATEKEEPER";
const DEFAULT_CONFIG_NAME: &str = "gatekeeper";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    /// Accounts for the local password realm
    pub users: Vec<UserEntry>,
}

/// A local account; `password_hash` is an Argon2 PHC string
#[derive(Debug, Clone, Deserialize)]
pub struct UserEntry {
    pub username: String,
    pub password_hash: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            logging: LoggingConfig::default(),
            auth: AuthConfig::default(),
            users: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `path` (or `./gatekeeper.toml` if present) and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let config: ServerConfig = config::Config::builder()
            .add_source(file)
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        config.auth.validate().context("Invalid auth configuration")?;
        Ok(config)
    }
}
