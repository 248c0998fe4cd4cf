//! User account model.
//!
//! Users authenticate against the API; they are separate from inventory
//! owners. Usernames are unique among active users only, so a deleted
//! account's name can be issued again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use depot_core::{DomainError, UserId};

use crate::Role;

/// A user account. The password hash is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Trim and validate a username.
pub fn validate_username(username: &str) -> Result<String, DomainError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("username required"));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("username cannot contain whitespace"));
    }
    Ok(trimmed.to_string())
}
