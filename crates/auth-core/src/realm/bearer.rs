//! Bearer token realm

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Realm, RealmError};
use crate::credential::{Credential, CredentialKind};
use crate::token::{decode_and_verify, Clock, VerifierRegistry};
use crate::types::{AuthenticationOutcome, DenialReason, Principal};

/// Realm accepting signed tokens.
///
/// The principal name is read from `<subject_key>.<name_field>` in the
/// claims payload, `user.username` by default.
pub struct BearerTokenRealm {
    name: String,
    verifiers: Arc<VerifierRegistry>,
    clock: Arc<dyn Clock>,
    subject_key: String,
    name_field: String,
}

impl BearerTokenRealm {
    pub fn new(verifiers: Arc<VerifierRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: "bearer".to_string(),
            verifiers,
            clock,
            subject_key: "user".to_string(),
            name_field: "username".to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_subject(mut self, subject_key: impl Into<String>, name_field: impl Into<String>) -> Self {
        self.subject_key = subject_key.into();
        self.name_field = name_field.into();
        self
    }

    /// Verify a raw token. Token verification is pure computation and runs inline.
    pub fn verify_token(&self, raw: &str) -> AuthenticationOutcome {
        let claims = match decode_and_verify(raw, &self.verifiers, self.clock.as_ref()) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(realm = %self.name, error = %e, "bearer token rejected");
                return AuthenticationOutcome::denied(DenialReason::from(&e));
            }
        };

        let Some(subject) = claims.get(&self.subject_key).and_then(Value::as_object) else {
            debug!(realm = %self.name, subject_key = %self.subject_key, "token has no subject object");
            return AuthenticationOutcome::denied(DenialReason::TokenMalformed);
        };
        let name = match subject.get(&self.name_field).and_then(Value::as_str) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                debug!(realm = %self.name, field = %self.name_field, "token subject has no name");
                return AuthenticationOutcome::denied(DenialReason::TokenMalformed);
            }
        };

        AuthenticationOutcome::authenticated(
            Principal::new(name, self.name.clone()).with_attributes(subject.clone()),
            CredentialKind::Bearer,
        )
    }
}

#[async_trait]
impl Realm for BearerTokenRealm {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> CredentialKind {
        CredentialKind::Bearer
    }

    async fn verify(
        &self,
        credential: &Credential,
        _cancel: &CancellationToken,
    ) -> std::result::Result<AuthenticationOutcome, RealmError> {
        match credential {
            Credential::BearerToken(raw) => Ok(self.verify_token(raw)),
            Credential::UsernamePassword { .. } => Ok(AuthenticationOutcome::denied(DenialReason::UnsupportedScheme)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{encode, Claims, FixedClock, SigningKey};
    use chrono::{DateTime, Duration};
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn key() -> SigningKey {
        SigningKey::hs256("bearer-realm-secret").unwrap()
    }

    fn realm() -> BearerTokenRealm {
        BearerTokenRealm::new(
            Arc::new(VerifierRegistry::for_key(&key())),
            Arc::new(FixedClock::at_timestamp(NOW)),
        )
    }

    fn token(exp_offset: i64, payload: serde_json::Value) -> String {
        let now = DateTime::from_timestamp(NOW, 0).unwrap();
        let claims = Claims::new("iss", "aud", "typ", now - Duration::seconds(300), now + Duration::seconds(exp_offset))
            .unwrap()
            .with_entity("user", &payload)
            .unwrap();
        encode(&claims, &key()).unwrap()
    }

    #[test]
    fn test_valid_token_yields_username() {
        let outcome = realm().verify_token(&token(60, json!({ "username": "alice", "email": "a@x" })));
        match outcome {
            AuthenticationOutcome::Authenticated { principal, scheme } => {
                assert_eq!(principal.name, "alice");
                assert_eq!(principal.realm, "bearer");
                assert_eq!(principal.attributes["email"], "a@x");
                assert_eq!(scheme, CredentialKind::Bearer);
            }
            other => panic!("expected authentication, got {:?}", other),
        }
    }

    #[test]
    fn test_codec_errors_become_denials() {
        let realm = realm();
        assert_eq!(
            realm.verify_token(&token(-1, json!({ "username": "alice" }))).denial_reason(),
            Some(DenialReason::TokenExpired)
        );
        assert_eq!(realm.verify_token("only.two").denial_reason(), Some(DenialReason::TokenMalformed));

        let mut forged = token(60, json!({ "username": "alice" }));
        forged.push('A');
        assert_eq!(realm.verify_token(&forged).denial_reason(), Some(DenialReason::SignatureMismatch));
    }

    #[test]
    fn test_missing_subject_is_malformed() {
        let realm = realm();
        assert_eq!(
            realm.verify_token(&token(60, json!({ "name": "alice" }))).denial_reason(),
            Some(DenialReason::TokenMalformed)
        );
        assert_eq!(
            realm.verify_token(&token(60, json!("alice"))).denial_reason(),
            Some(DenialReason::TokenMalformed)
        );
    }

    #[test]
    fn test_custom_subject_location() {
        let now = DateTime::from_timestamp(NOW, 0).unwrap();
        let claims = Claims::new("iss", "aud", "typ", now, now + Duration::seconds(30))
            .unwrap()
            .with_entity("account", &json!({ "login": "carol" }))
            .unwrap();
        let realm = realm().with_subject("account", "login");
        let outcome = realm.verify_token(&encode(&claims, &key()).unwrap());
        assert_eq!(outcome.principal().map(|p| p.name.as_str()), Some("carol"));
    }

    #[tokio::test]
    async fn test_basic_credential_not_handled() {
        let outcome = realm()
            .verify(&Credential::username_password("a", "b"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.denial_reason(), Some(DenialReason::UnsupportedScheme));
    }
}
