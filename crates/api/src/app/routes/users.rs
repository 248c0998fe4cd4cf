//! User administration. Every route requires the admin role.

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
};

use depot_auth::{Role, hash_password, validate_password};
use depot_core::UserId;

use crate::app::{dto, errors, services::AppServices};
use crate::authz::require_role;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
        .route("/:id/password", put(reset_password))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Response, Response> {
    require_role(&principal, Role::Admin)?;
    let users = services
        .store
        .list_users()
        .await
        .map_err(errors::store_error_to_response)?;
    Ok(Json(users).into_response())
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateUserRequest>,
) -> Result<Response, Response> {
    require_role(&principal, Role::Admin)?;
    if body.username.trim().is_empty() || body.password.is_empty() || body.role.is_empty() {
        return Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "username, password, and role required",
        ));
    }
    let role: Role = dto::parse(&body.role)?;
    validate_password(&body.password).map_err(errors::password_error_to_response)?;
    let hash = hash_password(&body.password).map_err(errors::password_error_to_response)?;

    let user = services
        .store
        .create_user(&body.username, &hash, role)
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(user = principal.username(), new_user = %user.username, role = %role, "user created");
    Ok((StatusCode::CREATED, Json(user)).into_response())
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Response, Response> {
    require_role(&principal, Role::Admin)?;
    let id: UserId = dto::parse(&id)?;
    let user = services
        .store
        .user(id)
        .await
        .map_err(errors::store_error_to_response)?
        .filter(|user| user.is_active())
        .ok_or_else(|| errors::json_error(StatusCode::NOT_FOUND, "not_found", "user not found"))?;
    Ok(Json(user).into_response())
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateUserRequest>,
) -> Result<Response, Response> {
    require_role(&principal, Role::Admin)?;
    let id: UserId = dto::parse(&id)?;
    let role: Role = dto::parse(&body.role)?;

    let user = services
        .store
        .set_user_role(id, role)
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(
        user = principal.username(),
        target_user = %user.username,
        new_role = %role,
        "user role updated"
    );
    Ok(Json(user).into_response())
}

pub async fn reset_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ResetPasswordRequest>,
) -> Result<Response, Response> {
    require_role(&principal, Role::Admin)?;
    let id: UserId = dto::parse(&id)?;
    if body.password.is_empty() {
        return Err(errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "password required"));
    }
    validate_password(&body.password).map_err(errors::password_error_to_response)?;
    let hash = hash_password(&body.password).map_err(errors::password_error_to_response)?;

    services
        .store
        .set_user_password(id, &hash)
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(user = principal.username(), target_user = %id, "user password reset");
    Ok(dto::Message::new("password reset").into_response())
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Response, Response> {
    require_role(&principal, Role::Admin)?;
    let id: UserId = dto::parse(&id)?;

    services
        .store
        .delete_user(id, principal.user_id())
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(user = principal.username(), deleted_user = %id, "user deleted");
    Ok(dto::Message::new("user deleted").into_response())
}
