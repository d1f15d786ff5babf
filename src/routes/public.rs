use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Pages every caller can reach. The login and unauthorized pages double as the
/// gate's redirect targets, so they must never sit under a protected prefix.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Load balancer check.
        .route("/health", get(|| async { "ok" }))
        .route("/", get(handlers::home))
        .route("/login", get(handlers::login_page))
        .route("/signup", get(handlers::signup_page))
        .route("/unauthorized", get(handlers::unauthorized_page))
}
