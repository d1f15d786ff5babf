use std::{collections::HashMap, fmt, str::FromStr};

use serde::Serialize;

use crate::config::ConfigError;

/// Role
///
/// The organizational identity classes the gate knows about. Each role owns an
/// area of the application (`/ceo`, `/manager`, ...) and carries a privilege rank
/// through the [`RoleHierarchy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Employee,
    Hr,
    Manager,
    Admin,
    Ceo,
}

impl Role {
    /// Every role, ordered from least to most senior.
    pub const ALL: [Role; 5] = [
        Role::Employee,
        Role::Hr,
        Role::Manager,
        Role::Admin,
        Role::Ceo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Hr => "hr",
            Role::Manager => "manager",
            Role::Admin => "admin",
            Role::Ceo => "ceo",
        }
    }

    /// The built-in privilege level for this role.
    pub fn default_rank(&self) -> u32 {
        match self {
            Role::Employee => 1,
            Role::Hr => 2,
            Role::Manager => 3,
            Role::Admin => 4,
            Role::Ceo => 5,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ConfigError;

    /// Role names are matched exactly; `"CEO"` is not `ceo`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownRole(s.to_string()))
    }
}

/// ClaimedRole
///
/// The role a caller *says* it has. The value comes straight from the transport
/// (cookie or token claim) and is untrusted, so anything that is not an exact
/// role name is kept as `Unrecognized` instead of being rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimedRole {
    Known(Role),
    Unrecognized(String),
}

impl ClaimedRole {
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<Role>() {
            Ok(role) => ClaimedRole::Known(role),
            Err(_) => ClaimedRole::Unrecognized(raw.to_string()),
        }
    }

    pub fn known(&self) -> Option<Role> {
        match self {
            ClaimedRole::Known(role) => Some(*role),
            ClaimedRole::Unrecognized(_) => None,
        }
    }

    /// The claim exactly as presented by the caller.
    pub fn as_str(&self) -> &str {
        match self {
            ClaimedRole::Known(role) => role.as_str(),
            ClaimedRole::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for ClaimedRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RoleHierarchy
///
/// Immutable role → rank table. Construction guarantees the table is total over
/// [`Role`] and that no two roles share a rank; after that it is only ever read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleHierarchy {
    ranks: HashMap<Role, u32>,
}

impl RoleHierarchy {
    /// Builds a hierarchy from explicit `(role, rank)` pairs.
    ///
    /// # Errors
    /// - [`ConfigError::EmptyRankTable`] when no pairs are given.
    /// - [`ConfigError::DuplicateRole`] when a role is ranked twice.
    /// - [`ConfigError::DuplicateRank`] when two roles share a rank.
    /// - [`ConfigError::MissingRank`] when any role is left unranked.
    pub fn new(entries: impl IntoIterator<Item = (Role, u32)>) -> Result<Self, ConfigError> {
        let mut ranks = HashMap::new();
        let mut by_rank: HashMap<u32, Role> = HashMap::new();

        for (role, rank) in entries {
            if ranks.insert(role, rank).is_some() {
                return Err(ConfigError::DuplicateRole(role));
            }
            if let Some(first) = by_rank.insert(rank, role) {
                return Err(ConfigError::DuplicateRank {
                    rank,
                    first,
                    second: role,
                });
            }
        }

        if ranks.is_empty() {
            return Err(ConfigError::EmptyRankTable);
        }
        if let Some(missing) = Role::ALL.into_iter().find(|role| !ranks.contains_key(role)) {
            return Err(ConfigError::MissingRank(missing));
        }

        Ok(Self { ranks })
    }

    pub fn rank(&self, role: Role) -> Option<u32> {
        self.ranks.get(&role).copied()
    }

    /// Rank of a caller's claim. Unrecognized claims have no rank.
    pub fn rank_of_claim(&self, claim: &ClaimedRole) -> Option<u32> {
        claim.known().and_then(|role| self.rank(role))
    }
}

impl Default for RoleHierarchy {
    fn default() -> Self {
        Self {
            ranks: Role::ALL
                .into_iter()
                .map(|role| (role, role.default_rank()))
                .collect(),
        }
    }
}
