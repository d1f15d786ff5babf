//! Access decision engine.
//!
//! - No IO
//! - No panics
//! - Every input maps to exactly one [`AccessDecision`]; nothing here can fail.

use serde::Serialize;

use crate::{
    auth::CallerCredential,
    policy::RouteMatch,
    roles::{Role, RoleHierarchy},
};

pub const LOGIN_PATH: &str = "/login";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

/// AccessDecision
///
/// The three terminal outcomes of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    Allow,
    RedirectToLogin,
    RedirectToUnauthorized,
}

impl AccessDecision {
    /// Where the caller is sent, or `None` when the request continues.
    pub fn redirect_target(&self) -> Option<&'static str> {
        match self {
            AccessDecision::Allow => None,
            AccessDecision::RedirectToLogin => Some(LOGIN_PATH),
            AccessDecision::RedirectToUnauthorized => Some(UNAUTHORIZED_PATH),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }
}

/// Decide whether a caller may proceed to a matched route.
pub fn decide(
    route: &RouteMatch,
    credential: &CallerCredential,
    hierarchy: &RoleHierarchy,
) -> AccessDecision {
    decide_with_reason(route, credential, hierarchy).0
}

/// Same as [`decide`], with a short human-readable reason for the outcome.
pub fn decide_with_reason(
    route: &RouteMatch,
    credential: &CallerCredential,
    hierarchy: &RoleHierarchy,
) -> (AccessDecision, &'static str) {
    let owner = match route {
        RouteMatch::Unprotected => return (AccessDecision::Allow, "path is not protected"),
        RouteMatch::Protected { owner } => *owner,
    };

    if !credential.has_token {
        return (AccessDecision::RedirectToLogin, "no identity token presented");
    }

    let Some(claimed) = &credential.claimed_role else {
        return (AccessDecision::RedirectToUnauthorized, "no role claim presented");
    };

    if claimed.known() == Some(owner) {
        return (AccessDecision::Allow, "caller is the area owner");
    }

    // A missing rank on either side resolves to the restrictive outcome.
    match (hierarchy.rank_of_claim(claimed), hierarchy.rank(owner)) {
        (None, _) => (
            AccessDecision::RedirectToUnauthorized,
            "role claim is not a recognized role",
        ),
        (Some(_), None) => (
            AccessDecision::RedirectToUnauthorized,
            "area owner has no rank",
        ),
        (Some(claimed_rank), Some(owner_rank)) if claimed_rank >= owner_rank => (
            AccessDecision::Allow,
            "role rank satisfies the area owner's rank",
        ),
        (Some(_), Some(_)) => (
            AccessDecision::RedirectToUnauthorized,
            "role rank is below the area owner's rank",
        ),
    }
}

/// DecisionExplanation
///
/// Serializable account of a single decision. Carries the claimed role but
/// never the identity token itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionExplanation {
    pub path: String,
    pub gated: bool,
    pub owner: Option<Role>,
    pub token_present: bool,
    pub claimed_role: Option<String>,
    pub decision: AccessDecision,
    pub redirect_to: Option<&'static str>,
    pub reason: &'static str,
}

impl DecisionExplanation {
    pub fn new(
        path: &str,
        gated: bool,
        route: &RouteMatch,
        credential: &CallerCredential,
        hierarchy: &RoleHierarchy,
    ) -> Self {
        let (decision, reason) = if gated {
            decide_with_reason(route, credential, hierarchy)
        } else {
            (AccessDecision::Allow, "gate is not invoked for this path")
        };

        Self {
            path: path.to_string(),
            gated,
            owner: route.owner(),
            token_present: credential.has_token,
            claimed_role: credential
                .claimed_role
                .as_ref()
                .map(|role| role.as_str().to_string()),
            decision,
            redirect_to: decision.redirect_target(),
            reason,
        }
    }
}
