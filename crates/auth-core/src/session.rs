//! Request-scoped session
//!
//! A session lives exactly as long as the request that created it. There is
//! no cross-request identity; callers authenticate on every request. Idle
//! timeouts and explicit termination have nothing to act on, so
//! [`RequestSession::touch`] and [`RequestSession::stop`] do nothing.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use crate::types::Principal;

/// Attribute key the gateway binds the authenticated principal under
pub const PRINCIPAL_ATTRIBUTE: &str = "gatekeeper.principal";

#[derive(Debug, Clone)]
pub struct RequestSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    host: Option<String>,
    attributes: HashMap<String, Value>,
}

impl RequestSession {
    pub fn new(host: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            host,
            attributes: HashMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn start_timestamp(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// The request is the only access, so this is always the start time
    pub fn last_access_time(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Request sessions never time out
    pub fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Ignored; the session ends with the request
    pub fn set_timeout(&mut self, _max_idle: Duration) {}

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// No-op: there is no idle timeout to refresh
    pub fn touch(&mut self) {}

    /// No-op: the session is discarded when the request completes
    pub fn stop(&mut self) {}

    pub fn attribute_keys(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: Value) {
        self.attributes.insert(key.into(), value);
    }

    /// Remove `key`, returning the former value
    pub fn remove_attribute(&mut self, key: &str) -> Option<Value> {
        self.attributes.remove(key)
    }

    pub fn bind_principal(&mut self, principal: &Principal) {
        // Principal is plain data; serialization cannot fail
        if let Ok(value) = serde_json::to_value(principal) {
            self.attributes.insert(PRINCIPAL_ATTRIBUTE.to_string(), value);
        }
    }

    pub fn principal(&self) -> Option<Principal> {
        self.attribute(PRINCIPAL_ATTRIBUTE)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Holder for the session of one request; the session is created at most once.
#[derive(Debug, Default)]
pub struct SessionSlot {
    session: Option<RequestSession>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the request's session explicitly, e.g. at request start.
    ///
    /// An existing session is kept; a request never gets a second one.
    pub fn start(&mut self, host: Option<String>) -> &mut RequestSession {
        self.session.get_or_insert_with(|| RequestSession::new(host))
    }

    pub fn get(&self) -> Option<&RequestSession> {
        self.session.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut RequestSession> {
        self.session.as_mut()
    }

    pub fn take(&mut self) -> Option<RequestSession> {
        self.session.take()
    }

    pub fn is_started(&self) -> bool {
        self.session.is_some()
    }
}
