/// Router Module Index
///
/// Explicit routes only cover the pages and API the gate itself needs. The
/// role-owned areas (`/ceo`, `/hr`, ...) have no explicit routes: they are
/// served by the fallback handler after the gate middleware has let them
/// through.

/// Pages reachable without credentials: home, login, signup, unauthorized, health.
pub mod public;

/// The public `/api` namespace.
pub mod api;
