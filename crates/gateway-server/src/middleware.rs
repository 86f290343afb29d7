//! Authentication middleware
//!
//! Runs the [`Gateway`](auth_core::Gateway) in front of the protected routes
//! and turns its [`Verdict`] into a response.

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use auth_core::{GatewayRequest, Principal, RequestSession, SessionSlot, Verdict};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;

use crate::state::AppState;

/// Authenticated principal extension for requests
#[derive(Clone, Debug)]
pub struct AuthenticatedPrincipal(pub Principal);

/// Authentication middleware function
///
/// On success the principal and the request's session are added to the
/// request extensions. Denials never carry a body.
pub async fn authenticate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();
    let remote_host = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    // Dropped (and so cancelled) if the caller goes away mid-check
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();

    let mut session = SessionSlot::new();
    let verdict = {
        let gateway_request = GatewayRequest {
            method: &parts.method,
            path: parts.uri.path(),
            headers: &parts.headers,
            remote_host: remote_host.as_deref(),
        };
        state.gateway.handle(&gateway_request, &mut session, &cancel).await
    };
    guard.disarm();

    match verdict {
        Verdict::Proceed { principal } => {
            if let Some(principal) = principal {
                parts.extensions.insert(AuthenticatedPrincipal(principal));
            }
            if let Some(session) = session.take() {
                parts.extensions.insert::<RequestSession>(session);
            }
            next.run(Request::from_parts(parts, body)).await
        }
        denied => denial_response(denied),
    }
}

fn denial_response(verdict: Verdict) -> Response {
    match verdict {
        Verdict::Challenge { www_authenticate } => {
            (StatusCode::UNAUTHORIZED, [(header::WWW_AUTHENTICATE, www_authenticate)]).into_response()
        }
        Verdict::Redirect { location } => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        Verdict::Unavailable => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        Verdict::Proceed { .. } => Response::new(Body::empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use auth_core::token::{TokenConfig, TokenIssuer};
    use auth_core::{
        AuthenticationOutcome, Credential, CredentialKind, Gateway, GatewayConfig, Realm, RealmError, RealmRegistry,
        SystemClock,
    };
    use axum::{routing::get, Router};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    /// Never answers; reports when it starts and when its token is cancelled
    struct WatchingRealm {
        events: mpsc::UnboundedSender<&'static str>,
    }

    #[async_trait]
    impl Realm for WatchingRealm {
        fn name(&self) -> &str {
            "watching"
        }

        fn kind(&self) -> CredentialKind {
            CredentialKind::Basic
        }

        async fn verify(
            &self,
            _credential: &Credential,
            cancel: &CancellationToken,
        ) -> Result<AuthenticationOutcome, RealmError> {
            let events = self.events.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                cancel.cancelled().await;
                let _ = events.send("cancelled");
            });
            let _ = self.events.send("started");
            std::future::pending().await
        }
    }

    fn router(realm: WatchingRealm) -> Router {
        let realms = RealmRegistry::builder().with_realm(realm).unwrap().build();
        let issuer = TokenIssuer::new(&TokenConfig {
            secret: Some("middleware-test-secret".to_string()),
            ..Default::default()
        })
        .unwrap();
        let state = AppState {
            gateway: Arc::new(Gateway::new(GatewayConfig::default(), realms).unwrap()),
            issuer: Arc::new(issuer),
            clock: Arc::new(SystemClock),
        };

        Router::new()
            .route("/protected", get(|| async { "ok" }))
            .route_layer(axum::middleware::from_fn_with_state(state.clone(), authenticate))
            .with_state(state)
    }

    #[tokio::test]
    async fn test_dropped_request_cancels_realm_call() {
        let (events, mut observed) = mpsc::unbounded_channel();
        let app = router(WatchingRealm { events });
        let request = axum::http::Request::builder()
            .uri("/protected")
            .header(header::AUTHORIZATION, "Basic YWxpY2U6cHc=")
            .body(Body::empty())
            .unwrap();

        let call = tokio::spawn(app.oneshot(request));
        assert_eq!(observed.recv().await, Some("started"));

        call.abort();
        let event = tokio::time::timeout(Duration::from_secs(5), observed.recv()).await.unwrap();
        assert_eq!(event, Some("cancelled"));
    }

    #[test]
    fn test_challenge_response() {
        let response = denial_response(Verdict::Challenge {
            www_authenticate: "Basic realm=\"application\"".to_string(),
        });
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Basic realm=\"application\""
        );
    }

    #[test]
    fn test_redirect_response() {
        let response = denial_response(Verdict::Redirect {
            location: "/login".to_string(),
        });
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login");
    }

    #[test]
    fn test_unavailable_response() {
        let response = denial_response(Verdict::Unavailable);
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }
}
