use axum::{
    Json,
    extract::{Query, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    auth::CallerCredential,
    decision::DecisionExplanation,
    gate::{GateOutcome, GateState},
};

// --- Placeholder pages ---
//
// The real pages are served by the front-end; these keep the binary usable on
// its own and give redirects somewhere to land.

pub async fn home() -> &'static str {
    "home"
}

pub async fn login_page() -> &'static str {
    "login"
}

pub async fn signup_page() -> &'static str {
    "signup"
}

/// Landing page for `RedirectToUnauthorized`.
pub async fn unauthorized_page() -> (StatusCode, &'static str) {
    (StatusCode::FORBIDDEN, "unauthorized")
}

/// area_page
///
/// Fallback for every path without an explicit route. A request that reaches
/// this handler with a [`GateOutcome`] was allowed into a role-owned area; every
/// other unknown path is a plain 404.
pub async fn area_page(request: Request) -> Response {
    let path = request.uri().path();
    match request.extensions().get::<GateOutcome>() {
        Some(GateOutcome {
            owner: Some(owner),
            claimed_role,
            ..
        }) => {
            let caller = claimed_role
                .as_ref()
                .map(|role| role.as_str())
                .unwrap_or("unknown");
            format!("{owner} area: {path} (signed in as {caller})").into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

#[derive(Deserialize)]
pub struct DecisionQuery {
    pub path: String,
}

/// explain_decision
///
/// [Public API] Reports what the gate would decide for the caller's current
/// credentials on `?path=`. Nothing is redirected; the answer is JSON.
pub async fn explain_decision(
    State(gate): State<GateState>,
    credential: CallerCredential,
    Query(query): Query<DecisionQuery>,
) -> Json<DecisionExplanation> {
    Json(gate.explain(&query.path, &credential))
}
