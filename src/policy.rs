//! Static route policy: which paths are public, which role owns which area,
//! and which paths the hosting layer runs the gate for at all.
//!
//! Everything here is built once at startup and only read afterwards.

use std::{collections::BTreeMap, fs, path::Path};

use serde::Deserialize;

use crate::{
    config::ConfigError,
    decision::{LOGIN_PATH, UNAUTHORIZED_PATH},
    roles::{Role, RoleHierarchy},
};

/// ProtectedRoute
///
/// One row of the protected route table: an owning role and the path prefixes
/// its area covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedRoute {
    pub owner: Role,
    pub prefixes: Vec<String>,
}

impl ProtectedRoute {
    pub fn new(owner: Role, prefixes: &[&str]) -> Self {
        Self {
            owner,
            prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// ProtectedRouteTable
///
/// Ordered list of [`ProtectedRoute`]s. Prefixes may overlap across roles; the
/// first row in declaration order that matches a path owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedRouteTable {
    entries: Vec<ProtectedRoute>,
}

impl ProtectedRouteTable {
    /// Validates and builds the table.
    ///
    /// Each role may appear in at most one row; a role that owns several areas
    /// lists all of their prefixes in that row. A second row for the same role
    /// is rejected with [`ConfigError::DuplicateOwner`].
    pub fn new(entries: Vec<ProtectedRoute>) -> Result<Self, ConfigError> {
        if entries.is_empty() {
            return Err(ConfigError::EmptyRouteTable);
        }

        let mut seen = Vec::with_capacity(entries.len());
        for entry in &entries {
            if seen.contains(&entry.owner) {
                return Err(ConfigError::DuplicateOwner(entry.owner));
            }
            seen.push(entry.owner);

            if entry.prefixes.is_empty() {
                return Err(ConfigError::EmptyPrefixList(entry.owner));
            }
            for prefix in &entry.prefixes {
                // A bare "/" would swallow every path behind the public set.
                if !prefix.starts_with('/') || prefix == "/" {
                    return Err(ConfigError::InvalidPrefix {
                        owner: entry.owner,
                        prefix: prefix.clone(),
                    });
                }
            }
        }

        Ok(Self { entries })
    }

    /// First owner, in declaration order, with a prefix of `path`.
    pub fn owner_of(&self, path: &str) -> Option<Role> {
        self.entries
            .iter()
            .find(|entry| entry.prefixes.iter().any(|p| path.starts_with(p.as_str())))
            .map(|entry| entry.owner)
    }

    pub fn entries(&self) -> &[ProtectedRoute] {
        &self.entries
    }
}

/// PublicRouteSet
///
/// Path prefixes that bypass the gate regardless of credentials. The home entry
/// `"/"` is the one exception to prefix matching: it matches only the root path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicRouteSet {
    prefixes: Vec<String>,
}

impl PublicRouteSet {
    pub fn new(prefixes: Vec<String>) -> Result<Self, ConfigError> {
        if let Some(bad) = prefixes.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::InvalidPublicPrefix(bad.clone()));
        }
        Ok(Self { prefixes })
    }

    pub fn contains(&self, path: &str) -> bool {
        self.prefixes.iter().any(|prefix| {
            if prefix == "/" {
                path == "/"
            } else {
                path.starts_with(prefix.as_str())
            }
        })
    }
}

/// MatcherPattern
///
/// A path pattern telling the hosting layer whether to invoke the gate at all.
/// `/ceo/**` matches `/ceo` and everything below it; any other pattern matches
/// its path exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatcherPattern {
    Subtree(String),
    Exact(String),
}

impl MatcherPattern {
    pub fn parse(pattern: &str) -> Result<Self, ConfigError> {
        if !pattern.starts_with('/') {
            return Err(ConfigError::InvalidMatcher(pattern.to_string()));
        }
        match pattern.strip_suffix("/**") {
            Some(base) if !base.contains('*') => Ok(MatcherPattern::Subtree(base.to_string())),
            None if !pattern.contains('*') => Ok(MatcherPattern::Exact(pattern.to_string())),
            _ => Err(ConfigError::InvalidMatcher(pattern.to_string())),
        }
    }

    /// The subtree pattern covering every path under `prefix`.
    pub fn subtree_of(prefix: &str) -> Self {
        MatcherPattern::Subtree(prefix.trim_end_matches('/').to_string())
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            MatcherPattern::Subtree(base) if base.is_empty() => true,
            MatcherPattern::Subtree(base) => match path.strip_prefix(base.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
            MatcherPattern::Exact(exact) => path == exact,
        }
    }
}

/// RouteMatch
///
/// What the route matcher concluded about a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMatch {
    Unprotected,
    Protected { owner: Role },
}

impl RouteMatch {
    pub fn owner(&self) -> Option<Role> {
        match self {
            RouteMatch::Unprotected => None,
            RouteMatch::Protected { owner } => Some(*owner),
        }
    }
}

/// GatePolicy
///
/// The complete, validated configuration surface of the gate: rank table,
/// protected routes, public routes and matcher patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatePolicy {
    hierarchy: RoleHierarchy,
    protected: ProtectedRouteTable,
    public: PublicRouteSet,
    matcher: Vec<MatcherPattern>,
}

impl GatePolicy {
    /// Assembles a policy. When `matcher` is `None` the gate is invoked for the
    /// subtree of every protected prefix.
    pub fn new(
        hierarchy: RoleHierarchy,
        protected: ProtectedRouteTable,
        public: PublicRouteSet,
        matcher: Option<Vec<MatcherPattern>>,
    ) -> Result<Self, ConfigError> {
        let matcher = match matcher {
            Some(patterns) if patterns.is_empty() => return Err(ConfigError::EmptyMatcher),
            Some(patterns) => patterns,
            None => derive_matcher(&protected),
        };

        let policy = Self {
            hierarchy,
            protected,
            public,
            matcher,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Cross-table checks: every protected prefix is gated, and neither
    /// redirect target is itself behind the gate.
    fn validate(&self) -> Result<(), ConfigError> {
        for entry in self.protected.entries() {
            if let Some(prefix) = entry.prefixes.iter().find(|p| !self.is_gated(p)) {
                return Err(ConfigError::UngatedPrefix {
                    owner: entry.owner,
                    prefix: prefix.clone(),
                });
            }
        }

        for target in [LOGIN_PATH, UNAUTHORIZED_PATH] {
            if let RouteMatch::Protected { owner } = self.match_route(target) {
                if self.is_gated(target) {
                    return Err(ConfigError::ProtectedRedirectTarget {
                        path: target.to_string(),
                        owner,
                    });
                }
            }
        }

        Ok(())
    }

    /// Reads a JSON policy file.
    ///
    /// ```json
    /// {
    ///   "roles": { "employee": 1, "hr": 2, "manager": 3, "admin": 4, "ceo": 5 },
    ///   "protected": [ { "role": "ceo", "prefixes": ["/ceo"] } ],
    ///   "public": ["/", "/login"],
    ///   "matcher": ["/ceo/**"]
    /// }
    /// ```
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::PolicyFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let file: PolicyFile = serde_json::from_str(raw)?;

        let hierarchy = RoleHierarchy::new(
            file.roles
                .iter()
                .map(|(name, rank)| -> Result<(Role, u32), ConfigError> {
                    Ok((name.parse::<Role>()?, *rank))
                })
                .collect::<Result<Vec<_>, ConfigError>>()?,
        )?;

        let protected = ProtectedRouteTable::new(
            file.protected
                .into_iter()
                .map(|entry| -> Result<ProtectedRoute, ConfigError> {
                    Ok(ProtectedRoute {
                        owner: entry.role.parse()?,
                        prefixes: entry.prefixes,
                    })
                })
                .collect::<Result<Vec<_>, ConfigError>>()?,
        )?;

        let public = PublicRouteSet::new(file.public)?;

        let matcher = file
            .matcher
            .map(|patterns| {
                patterns
                    .iter()
                    .map(|p| MatcherPattern::parse(p))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        Self::new(hierarchy, protected, public, matcher)
    }

    /// Route Matcher: public set first, then protected routes in declaration order.
    pub fn match_route(&self, path: &str) -> RouteMatch {
        if self.public.contains(path) {
            return RouteMatch::Unprotected;
        }
        match self.protected.owner_of(path) {
            Some(owner) => RouteMatch::Protected { owner },
            None => RouteMatch::Unprotected,
        }
    }

    /// Whether the hosting layer should run the gate for `path`.
    pub fn is_gated(&self, path: &str) -> bool {
        self.matcher.iter().any(|pattern| pattern.matches(path))
    }

    pub fn hierarchy(&self) -> &RoleHierarchy {
        &self.hierarchy
    }

    pub fn protected(&self) -> &ProtectedRouteTable {
        &self.protected
    }

    pub fn matcher(&self) -> &[MatcherPattern] {
        &self.matcher
    }
}

impl Default for GatePolicy {
    /// The built-in tables. `/reports` is declared under both `manager` and
    /// `hr`; `manager` comes first and owns it.
    fn default() -> Self {
        let protected = ProtectedRouteTable {
            entries: vec![
                ProtectedRoute::new(Role::Ceo, &["/ceo"]),
                ProtectedRoute::new(Role::Manager, &["/manager", "/reports"]),
                ProtectedRoute::new(Role::Hr, &["/hr", "/reports"]),
                ProtectedRoute::new(Role::Employee, &["/employee"]),
                ProtectedRoute::new(Role::Admin, &["/admin"]),
            ],
        };
        let public = PublicRouteSet {
            prefixes: ["/", "/login", "/signup", "/_next", "/api"]
                .into_iter()
                .map(String::from)
                .collect(),
        };
        let matcher = derive_matcher(&protected);

        Self {
            hierarchy: RoleHierarchy::default(),
            protected,
            public,
            matcher,
        }
    }
}

fn derive_matcher(protected: &ProtectedRouteTable) -> Vec<MatcherPattern> {
    let mut patterns: Vec<MatcherPattern> = Vec::new();
    for prefix in protected.entries.iter().flat_map(|e| e.prefixes.iter()) {
        let pattern = MatcherPattern::subtree_of(prefix);
        if !patterns.contains(&pattern) {
            patterns.push(pattern);
        }
    }
    patterns
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PolicyFile {
    roles: BTreeMap<String, u32>,
    protected: Vec<ProtectedRouteEntry>,
    public: Vec<String>,
    #[serde(default)]
    matcher: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProtectedRouteEntry {
    role: String,
    prefixes: Vec<String>,
}
