use chrono::{DateTime, Utc};

use depot_auth::{Principal, Role};
use depot_core::UserId;

/// Principal context for a request (authenticated identity + live role),
/// plus the token it was authenticated with so it can be revoked on logout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
    token_id: String,
    token_expires_at: DateTime<Utc>,
}

impl PrincipalContext {
    pub fn new(principal: Principal, token_id: String, token_expires_at: DateTime<Utc>) -> Self {
        Self {
            principal,
            token_id,
            token_expires_at,
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }

    pub fn username(&self) -> &str {
        &self.principal.username
    }

    pub fn role(&self) -> Role {
        self.principal.role
    }

    pub fn token_id(&self) -> &str {
        &self.token_id
    }

    pub fn token_expires_at(&self) -> DateTime<Utc> {
        self.token_expires_at
    }
}
