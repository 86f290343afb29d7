//! # Gateway Server
//!
//! axum front end for [`auth_core`]: every protected route runs the
//! authenticating gateway first, and `POST /login` trades Basic credentials
//! for a short-lived bearer token.

pub mod config;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::{ServerConfig, UserEntry};
pub use routes::build_router;
pub use state::AppState;
