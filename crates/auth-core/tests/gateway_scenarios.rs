//! End-to-end gateway behaviour over the built-in realms

use auth_core::realm::{Argon2Hasher, PasswordConfig};
use auth_core::token::{encode, Claims, SigningKey, SystemClock, TokenConfig, TokenIssuer};
use auth_core::{
    BearerTokenRealm, CredentialStore, DeniedBehavior, Gateway, GatewayConfig, GatewayRequest, InMemoryCredentialStore,
    LocalPasswordRealm, RealmError, RealmRegistry, SessionSlot, Verdict,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{Duration, Utc};
use http::{header::AUTHORIZATION, HeaderMap, HeaderValue, Method};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const SECRET: &str = "scenario-signing-secret";

fn hasher() -> Argon2Hasher {
    Argon2Hasher::new(&PasswordConfig {
        argon2_memory_cost: 4096,
        argon2_time_cost: 1,
        argon2_parallelism: 1,
    })
    .unwrap()
}

fn signing_key() -> SigningKey {
    SigningKey::hs256(SECRET).unwrap()
}

fn realms_with_store(store: Arc<dyn CredentialStore>) -> RealmRegistry {
    let bearer = BearerTokenRealm::new(
        Arc::new(auth_core::VerifierRegistry::for_key(&signing_key())),
        Arc::new(SystemClock),
    );
    RealmRegistry::builder()
        .with_realm(LocalPasswordRealm::new("local", store, hasher()).unwrap())
        .unwrap()
        .with_realm(bearer)
        .unwrap()
        .build()
}

fn gateway_with(config: GatewayConfig) -> Gateway {
    let hasher = hasher();
    let store = InMemoryCredentialStore::new()
        .with_user("alice", "correct-pw", &hasher)
        .unwrap()
        .with_user("bob", "bobs-pw", &hasher)
        .unwrap();
    Gateway::new(config, realms_with_store(Arc::new(store))).unwrap()
}

fn gateway() -> Gateway {
    gateway_with(GatewayConfig::default())
}

fn headers(authorization: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(value) = authorization {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    }
    headers
}

fn basic(raw: &str) -> String {
    format!("Basic {}", STANDARD.encode(raw))
}

fn token_expiring_in(secs: i64) -> String {
    let now = Utc::now();
    let claims = Claims::new("gatekeeper", "gatekeeper", "test", now - Duration::seconds(300), now + Duration::seconds(secs))
        .unwrap()
        .with_entity("user", &json!({ "username": "jvanzyl" }))
        .unwrap();
    encode(&claims, &signing_key()).unwrap()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("auth_core=debug")
        .with_test_writer()
        .try_init();
}

async fn run(gateway: &Gateway, method: Method, path: &str, authorization: Option<&str>) -> (Verdict, SessionSlot) {
    init_tracing();
    let headers = headers(authorization);
    let request = GatewayRequest {
        method: &method,
        path,
        headers: &headers,
        remote_host: Some("127.0.0.1"),
    };
    let mut session = SessionSlot::new();
    let verdict = gateway.handle(&request, &mut session, &CancellationToken::new()).await;
    (verdict, session)
}

fn challenge() -> Verdict {
    Verdict::Challenge {
        www_authenticate: "Basic realm=\"application\"".to_string(),
    }
}

#[tokio::test]
async fn test_basic_credentials_authenticate() {
    let (verdict, session) = run(&gateway(), Method::GET, "/api/items", Some(&basic("alice:correct-pw"))).await;

    let Verdict::Proceed { principal: Some(principal) } = verdict else {
        panic!("expected authenticated request, got {:?}", verdict);
    };
    assert_eq!(principal.name, "alice");

    let session = session.get().expect("session started on authentication");
    assert_eq!(session.principal(), Some(principal));
    assert_eq!(session.host(), Some("127.0.0.1"));
}

#[tokio::test]
async fn test_bearer_token_authenticates() {
    let token = token_expiring_in(60);
    let (verdict, _) = run(&gateway(), Method::GET, "/api/items", Some(&format!("Bearer {}", token))).await;

    let Verdict::Proceed { principal: Some(principal) } = verdict else {
        panic!("expected authenticated request, got {:?}", verdict);
    };
    assert_eq!(principal.name, "jvanzyl");
    assert_eq!(principal.realm, "bearer");
}

#[tokio::test]
async fn test_expired_bearer_token_is_challenged() {
    let token = token_expiring_in(-1);
    let (verdict, session) = run(&gateway(), Method::GET, "/api/items", Some(&format!("Bearer {}", token))).await;
    assert_eq!(verdict, challenge());
    assert!(!session.is_started());
}

#[tokio::test]
async fn test_login_page_view_passes_without_challenge() {
    let (verdict, session) = run(&gateway(), Method::GET, "/login", None).await;
    assert_eq!(verdict, Verdict::Proceed { principal: None });
    assert!(!session.is_started());
}

#[tokio::test]
async fn test_protected_resource_without_header_is_challenged() {
    let (verdict, _) = run(&gateway(), Method::GET, "/api/items", None).await;
    assert_eq!(verdict, challenge());
}

#[tokio::test]
async fn test_challenge_uses_configured_scheme_and_realm() {
    let gw = gateway_with(GatewayConfig {
        application_name: "billing".into(),
        challenge_scheme: "Bearer".into(),
        ..Default::default()
    });
    // Caller tried Basic; the challenge still names the configured scheme
    let (verdict, _) = run(&gw, Method::GET, "/api", Some(&basic("alice:wrong"))).await;
    assert_eq!(
        verdict,
        Verdict::Challenge {
            www_authenticate: "Bearer realm=\"billing\"".to_string()
        }
    );
}

#[tokio::test]
async fn test_login_submission() {
    let gw = gateway();

    let (verdict, _) = run(&gw, Method::POST, "/login", Some(&basic("alice:correct-pw"))).await;
    assert!(matches!(verdict, Verdict::Proceed { principal: Some(ref p) } if p.name == "alice"));

    let (verdict, _) = run(&gw, Method::POST, "/login", Some(&basic("alice:wrong"))).await;
    assert_eq!(verdict, challenge());

    let (verdict, _) = run(&gw, Method::POST, "/login", None).await;
    assert_eq!(verdict, challenge());
}

#[tokio::test]
async fn test_basic_without_colon_never_authenticates() {
    let gw = gateway();
    for raw in ["alice", "alicecorrect-pw", "correct-pw"] {
        let (verdict, session) = run(&gw, Method::GET, "/api", Some(&basic(raw))).await;
        assert_eq!(verdict, challenge(), "material {:?}", raw);
        assert!(!session.is_started());
    }
}

#[tokio::test]
async fn test_lowercase_schemes() {
    let gw = gateway();
    let (verdict, _) = run(&gw, Method::GET, "/api", Some(&format!("basic {}", STANDARD.encode("bob:bobs-pw")))).await;
    assert!(verdict.is_proceed());

    let (verdict, _) = run(&gw, Method::GET, "/api", Some(&format!("bearer {}", token_expiring_in(30)))).await;
    assert!(verdict.is_proceed());
}

#[tokio::test]
async fn test_redirect_to_login_behavior() {
    let gw = gateway_with(GatewayConfig {
        denied_behavior: DeniedBehavior::RedirectToLogin,
        ..Default::default()
    });

    let (verdict, _) = run(&gw, Method::GET, "/api", None).await;
    assert_eq!(verdict, Verdict::Redirect { location: "/login".into() });

    // Failed submissions on the login path are still challenged
    let (verdict, _) = run(&gw, Method::POST, "/login", Some(&basic("alice:nope"))).await;
    assert_eq!(verdict, challenge());
}

struct UnreachableStore;

#[async_trait]
impl CredentialStore for UnreachableStore {
    async fn password_hash(&self, _username: &str) -> Result<Option<String>, RealmError> {
        Err(RealmError::Unavailable("database offline".to_string()))
    }
}

#[tokio::test]
async fn test_unavailable_realm_is_not_a_challenge() {
    let gw = Gateway::new(GatewayConfig::default(), realms_with_store(Arc::new(UnreachableStore))).unwrap();
    let (verdict, session) = run(&gw, Method::GET, "/api", Some(&basic("alice:correct-pw"))).await;
    assert_eq!(verdict, Verdict::Unavailable);
    assert!(!session.is_started());
}

struct HangingStore;

#[async_trait]
impl CredentialStore for HangingStore {
    async fn password_hash(&self, _username: &str) -> Result<Option<String>, RealmError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_cancelled_caller_is_unavailable_not_challenged() {
    init_tracing();
    let gw = Gateway::new(GatewayConfig::default(), realms_with_store(Arc::new(HangingStore))).unwrap();
    let headers = headers(Some(&basic("alice:correct-pw")));
    let request = GatewayRequest {
        method: &Method::GET,
        path: "/api",
        headers: &headers,
        remote_host: None,
    };

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let mut session = SessionSlot::new();
    let verdict = gw.handle(&request, &mut session, &cancel).await;
    assert_eq!(verdict, Verdict::Unavailable);
    assert!(!session.is_started());
}

#[tokio::test]
async fn test_concurrent_requests_are_independent() {
    let gw = Arc::new(gateway());
    let issuer = TokenIssuer::with_key(&TokenConfig::default(), signing_key()).unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let gw = Arc::clone(&gw);
        let authorization = match i % 4 {
            0 => basic("alice:correct-pw"),
            1 => basic("bob:bobs-pw"),
            2 => format!(
                "Bearer {}",
                issuer.issue(&json!({ "username": format!("user{}", i) }), &SystemClock).unwrap().token
            ),
            _ => basic("alice:wrong"),
        };
        handles.push(tokio::spawn(async move {
            let (verdict, session) = run(&gw, Method::GET, "/api", Some(&authorization)).await;
            (i, verdict, session.get().map(|s| (s.id(), s.principal())))
        }));
    }

    let mut session_ids = std::collections::HashSet::new();
    for handle in handles {
        let (i, verdict, session) = handle.await.unwrap();
        let expected = match i % 4 {
            0 => Some("alice".to_string()),
            1 => Some("bob".to_string()),
            2 => Some(format!("user{}", i)),
            _ => None,
        };
        match (&verdict, expected) {
            (Verdict::Proceed { principal: Some(p) }, Some(name)) => {
                assert_eq!(p.name, name);
                let (id, bound) = session.expect("session for authenticated request");
                assert_eq!(bound.map(|b| b.name), Some(name));
                assert!(session_ids.insert(id), "session shared between requests");
            }
            (Verdict::Challenge { .. }, None) => assert!(session.is_none()),
            (other, expected) => panic!("request {} got {:?}, expected {:?}", i, other, expected),
        }
    }
    assert_eq!(session_ids.len(), 12);
}
