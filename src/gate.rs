use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    auth::CallerCredential,
    decision::{AccessDecision, DecisionExplanation, decide},
    policy::GatePolicy,
    roles::{ClaimedRole, Role},
};

/// Shared handle to the gate, pulled out of the application state.
pub type GateState = Arc<Gate>;

/// Gate
///
/// The per-request entry point. Holds nothing but a reference to the static
/// policy, so evaluating it concurrently from any number of requests needs no
/// coordination.
#[derive(Debug, Clone)]
pub struct Gate {
    policy: Arc<GatePolicy>,
}

/// GateOutcome
///
/// Result of evaluating the gate for one request. Allowed requests carry it as
/// a request extension so downstream handlers can see which area they serve
/// and who the caller claimed to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    pub owner: Option<Role>,
    pub claimed_role: Option<ClaimedRole>,
    pub decision: AccessDecision,
}

impl Gate {
    pub fn new(policy: Arc<GatePolicy>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &GatePolicy {
        &self.policy
    }

    /// Whether the hosting layer invokes the gate for `path` at all.
    pub fn applies_to(&self, path: &str) -> bool {
        self.policy.is_gated(path)
    }

    pub fn evaluate(&self, path: &str, credential: &CallerCredential) -> GateOutcome {
        let route = self.policy.match_route(path);
        GateOutcome {
            owner: route.owner(),
            claimed_role: credential.claimed_role.clone(),
            decision: decide(&route, credential, self.policy.hierarchy()),
        }
    }

    pub fn explain(&self, path: &str, credential: &CallerCredential) -> DecisionExplanation {
        DecisionExplanation::new(
            path,
            self.applies_to(path),
            &self.policy.match_route(path),
            credential,
            self.policy.hierarchy(),
        )
    }
}

/// gate_middleware
///
/// Runs in front of every route. Paths outside the matcher pass straight
/// through. For gated paths the request either continues with a
/// [`GateOutcome`] attached, or is answered here with a 307 redirect to the
/// login or unauthorized page.
pub async fn gate_middleware(
    State(gate): State<GateState>,
    credential: CallerCredential,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    if !gate.applies_to(&path) {
        return next.run(request).await;
    }

    let outcome = gate.evaluate(&path, &credential);
    let claimed = outcome
        .claimed_role
        .as_ref()
        .map(ClaimedRole::as_str)
        .unwrap_or("-");

    match outcome.decision.redirect_target() {
        None => {
            tracing::debug!(
                path = %path,
                owner = ?outcome.owner,
                claimed_role = %claimed,
                "gate allowed request"
            );
            request.extensions_mut().insert(outcome);
            next.run(request).await
        }
        Some(target) => {
            tracing::info!(
                path = %path,
                owner = ?outcome.owner,
                token_present = credential.has_token,
                claimed_role = %claimed,
                decision = ?outcome.decision,
                redirect_to = target,
                "gate redirected request"
            );
            Redirect::temporary(target).into_response()
        }
    }
}
