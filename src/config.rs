use std::{env, sync::Arc};

use thiserror::Error;

use crate::{
    auth::{CredentialMode, CredentialSettings},
    policy::GatePolicy,
    roles::Role,
};

/// ConfigError
///
/// Everything that can be wrong with the gate's static configuration. These are
/// surfaced once at process start; a running gate never produces them.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("role hierarchy table is empty")]
    EmptyRankTable,

    #[error("role '{0}' has no rank")]
    MissingRank(Role),

    #[error("role '{0}' is ranked more than once")]
    DuplicateRole(Role),

    #[error("rank {rank} is shared by '{first}' and '{second}'")]
    DuplicateRank { rank: u32, first: Role, second: Role },

    #[error("unknown role '{0}'")]
    UnknownRole(String),

    #[error("protected route table is empty")]
    EmptyRouteTable,

    #[error("role '{0}' is declared more than once in the protected route table")]
    DuplicateOwner(Role),

    #[error("role '{0}' owns no path prefixes")]
    EmptyPrefixList(Role),

    #[error("invalid prefix '{prefix}' for role '{owner}': must start with '/' and name a path")]
    InvalidPrefix { owner: Role, prefix: String },

    #[error("invalid public route '{0}': must start with '/'")]
    InvalidPublicPrefix(String),

    #[error("invalid matcher pattern '{0}'")]
    InvalidMatcher(String),

    #[error("matcher pattern list is empty")]
    EmptyMatcher,

    #[error("prefix '{prefix}' for role '{owner}' is not covered by any matcher pattern")]
    UngatedPrefix { owner: Role, prefix: String },

    #[error("redirect target '{path}' is gated and owned by role '{owner}'")]
    ProtectedRedirectTarget { path: String, owner: Role },

    #[error("failed to read policy file {path}: {source}")]
    PolicyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse policy file: {0}")]
    PolicyParse(#[from] serde_json::Error),

    #[error("unknown credential mode '{0}' (expected 'cookie' or 'bearer_jwt')")]
    InvalidCredentialMode(String),

    #[error("{0} must not be empty")]
    EmptyCookieName(&'static str),

    #[error("GATE_JWT_SECRET must be set when GATE_CREDENTIAL_MODE=bearer_jwt")]
    MissingJwtSecret,
}

/// AppConfig
///
/// Holds the gate's entire configuration state. Immutable once loaded and shared
/// with every request through `FromRef`, the same way the rest of the
/// application state is.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Selects the log format.
    pub env: Env,
    // Address the HTTP listener binds to.
    pub bind_addr: String,
    // Where and how caller credentials are read.
    pub credentials: CredentialSettings,
    // Route tables and rank table.
    pub policy: Arc<GatePolicy>,
}

/// Env
///
/// Runtime context. `Local` logs in a human-readable format, `Production` logs
/// JSON for aggregation.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Built-in tables, cookie credentials, local environment. Used for test
    /// scaffolding without touching environment variables.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: "0.0.0.0:3000".to_string(),
            credentials: CredentialSettings::default(),
            policy: Arc::new(GatePolicy::default()),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables at startup.
    ///
    /// # Panics
    /// Panics if the configuration is invalid. A gate that cannot trust its own
    /// tables must not start.
    pub fn load() -> Self {
        Self::try_load().unwrap_or_else(|e| panic!("FATAL: invalid gate configuration: {e}"))
    }

    /// Fallible form of [`AppConfig::load`].
    pub fn try_load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let mode = match env::var("GATE_CREDENTIAL_MODE").as_deref() {
            Err(_) | Ok("cookie") => CredentialMode::Cookie,
            Ok("bearer_jwt") => {
                let secret = env::var("GATE_JWT_SECRET")
                    .ok()
                    .filter(|s| !s.is_empty())
                    .ok_or(ConfigError::MissingJwtSecret)?;
                CredentialMode::BearerJwt { secret }
            }
            Ok(other) => return Err(ConfigError::InvalidCredentialMode(other.to_string())),
        };

        let defaults = CredentialSettings::default();
        let credentials = CredentialSettings {
            token_cookie: cookie_name("GATE_TOKEN_COOKIE", defaults.token_cookie)?,
            role_cookie: cookie_name("GATE_ROLE_COOKIE", defaults.role_cookie)?,
            mode,
        };

        let policy = match env::var("GATE_POLICY_FILE") {
            Ok(path) => GatePolicy::from_file(path)?,
            Err(_) => GatePolicy::default(),
        };

        Ok(Self {
            env,
            bind_addr,
            credentials,
            policy: Arc::new(policy),
        })
    }
}

/// Cookie name from `var`, or `default` when unset. An empty name could never
/// match a cookie, so it is rejected.
fn cookie_name(var: &'static str, default: String) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(name) if name.is_empty() => Err(ConfigError::EmptyCookieName(var)),
        Ok(name) => Ok(name),
        Err(_) => Ok(default),
    }
}
