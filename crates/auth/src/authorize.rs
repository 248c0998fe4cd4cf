use thiserror::Error;

use crate::{Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: requires role '{required}' or higher")]
    Forbidden { required: Role },
}

/// Authorize a principal against a minimum role.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, minimum: Role) -> Result<(), AuthzError> {
    if principal.role.at_least(minimum) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden { required: minimum })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::UserId;

    #[test]
    fn manager_may_write_but_not_administer() {
        let p = Principal::new(UserId::new(3), "mgr", Role::Manager);
        assert_eq!(authorize(&p, Role::User), Ok(()));
        assert_eq!(authorize(&p, Role::Manager), Ok(()));
        assert_eq!(
            authorize(&p, Role::Admin),
            Err(AuthzError::Forbidden { required: Role::Admin })
        );
    }
}
