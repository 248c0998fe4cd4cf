//! API-side authorization guard.
//!
//! Role checks happen in the handler before any store or engine call; the
//! Transfer Engine itself is authorization-agnostic.

use axum::http::StatusCode;
use axum::response::Response;

use depot_auth::{Role, authorize};

use crate::app::errors::json_error;
use crate::context::PrincipalContext;

/// Reject the request with 403 unless the caller's live role is at least `minimum`.
pub fn require_role(principal: &PrincipalContext, minimum: Role) -> Result<(), Response> {
    authorize(principal.principal(), minimum).map_err(|e| {
        tracing::warn!(user = principal.username(), required = %minimum, "insufficient permissions");
        json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string())
    })
}
