//! HTTP routes

use axum::{
    extract::State,
    http::{header, StatusCode},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use auth_core::RequestSession;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::middleware::{authenticate, AuthenticatedPrincipal};
use crate::state::{AppState, LOCAL_REALM, SUBJECT_NAME_FIELD};

const LOGIN_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Sign in</title></head>
<body>
<h1>Sign in</h1>
<p>Submit your credentials to <code>POST /login</code> with an
<code>Authorization: Basic</code> header to receive a bearer token.</p>
</body>
</html>
"#;

/// Token response for a successful login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub name: String,
    pub realm: String,
    pub attributes: Map<String, Value>,
    pub session_id: Uuid,
    pub session_started_at: DateTime<Utc>,
}

/// Build the application router.
///
/// Everything except `/health` runs behind the authentication middleware;
/// the gateway itself lets login page views through.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/login", get(login_page).post(login))
        .route("/api/whoami", get(whoami))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn login_page() -> Html<&'static str> {
    Html(LOGIN_PAGE)
}

/// Exchange authenticated Basic credentials for a bearer token
async fn login(State(state): State<AppState>, principal: Option<Extension<AuthenticatedPrincipal>>) -> Response {
    // Only password logins mint tokens; a token cannot renew itself
    let principal = match principal {
        Some(Extension(AuthenticatedPrincipal(principal))) if principal.realm == LOCAL_REALM => principal,
        other => {
            if let Some(Extension(AuthenticatedPrincipal(principal))) = other {
                warn!(principal = %principal, "Token requested without password credentials");
            }
            return challenge(&state);
        }
    };

    let subject = json!({ SUBJECT_NAME_FIELD: principal.name });
    match state.issuer.issue(&subject, state.clock.as_ref()) {
        Ok(issued) => {
            info!(principal = %principal, expires_at = %issued.expires_at, "Issued bearer token");
            Json(LoginResponse {
                token: issued.token,
                token_type: "Bearer",
                expires_in: issued.expires_in,
            })
            .into_response()
        }
        Err(e) => {
            error!(error = %e, principal = %principal, "Failed to issue token");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn challenge(state: &AppState) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, state.gateway.challenge_header().to_string())],
    )
        .into_response()
}

async fn whoami(
    Extension(AuthenticatedPrincipal(principal)): Extension<AuthenticatedPrincipal>,
    Extension(session): Extension<RequestSession>,
) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse {
        name: principal.name,
        realm: principal.realm,
        attributes: principal.attributes,
        session_id: session.id(),
        session_started_at: session.start_timestamp(),
    })
}
