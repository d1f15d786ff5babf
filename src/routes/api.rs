use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// API Router Module
///
/// Lives under `/api`, which the default policy lists as public, so nothing
/// here is ever redirected by the gate.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // GET /api/gate/decision?path=/hr/payroll
        // Explains the decision the gate would make for the caller on `path`.
        .route("/api/gate/decision", get(handlers::explain_decision))
}
