use serde::Serialize;

use depot_core::UserId;

use crate::Role;

/// An authenticated caller, resolved against the user store.
///
/// `role` is the live role at request time, not the one baked into the token,
/// so demotions take effect immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: UserId, username: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
        }
    }
}
