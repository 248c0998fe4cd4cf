use core::str::FromStr;

use serde::{Deserialize, Serialize};

use depot_core::DomainError;

/// Role used for RBAC.
///
/// Roles form a strict ladder: `admin > manager > user`. The set is closed,
/// so an unrecognised role string never parses and therefore never grants
/// anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Manager,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::User => "user",
        }
    }

    fn level(self) -> u8 {
        match self {
            Role::Admin => 3,
            Role::Manager => 2,
            Role::User => 1,
        }
    }

    /// Whether this role meets or exceeds `minimum`.
    pub fn at_least(self, minimum: Role) -> bool {
        self.level() >= minimum.level()
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "user" => Ok(Role::User),
            _ => Err(DomainError::validation("invalid role")),
        }
    }
}

/// String-level role check; unknown roles on either side fail closed.
pub fn role_at_least(role: &str, minimum: &str) -> bool {
    match (role.parse::<Role>(), minimum.parse::<Role>()) {
        (Ok(role), Ok(minimum)) => role.at_least(minimum),
        _ => false,
    }
}
