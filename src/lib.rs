use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use std::sync::Arc;

use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// The gate core: roles and ranks, route tables, credentials, decisions.
pub mod auth;
pub mod config;
pub mod decision;
pub mod gate;
pub mod policy;
pub mod roles;

// HTTP surface around the gate.
pub mod handlers;
pub mod routes;
use routes::{api, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use decision::AccessDecision;
pub use gate::{Gate, GateState};

/// AppState
///
/// Single, immutable container shared by every request: the loaded
/// configuration and the gate built from it.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub gate: GateState,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let gate = Arc::new(Gate::new(config.policy.clone()));
        Self { config, gate }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for GateState {
    fn from_ref(app_state: &AppState) -> GateState {
        app_state.gate.clone()
    }
}

/// create_router
///
/// Assembles the routes, puts the gate in front of all of them (fallback
/// included) and wraps everything in the request-id and tracing layers.
pub fn create_router(state: AppState) -> Router {
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(public::public_routes())
        .merge(api::api_routes())
        // Role-owned areas have no explicit routes of their own.
        .fallback(handlers::area_page)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate::gate_middleware,
        ))
        .with_state(state);

    // Outermost: request ids and tracing, so gate redirects are logged inside
    // the request span.
    base_router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
}

/// trace_span_logger
///
/// Span for `TraceLayer`: method, URI and the `x-request-id` set by the layer
/// above, so every line logged for one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
