use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{post, put},
};
use chrono::Utc;

use depot_auth::{hash_password, validate_password, verify_password};

use crate::app::{dto, errors, services::AppServices};
use crate::context::PrincipalContext;

/// Authenticated auth routes. Login is mounted publicly in `build_app`.
pub fn router() -> Router {
    Router::new()
        .route("/logout", post(logout))
        .route("/password", put(change_password))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> Result<Response, Response> {
    if body.username.trim().is_empty() || body.password.is_empty() {
        return Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "username and password required",
        ));
    }

    let invalid = || errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "invalid credentials");

    let user = services
        .store
        .user_by_username(&body.username)
        .await
        .map_err(errors::store_error_to_response)?;
    let Some(user) = user else {
        tracing::warn!(username = %body.username, "login failed: unknown user");
        return Err(invalid());
    };

    let matches =
        verify_password(&body.password, &user.password_hash).map_err(errors::password_error_to_response)?;
    if !matches {
        tracing::warn!(username = %user.username, "login failed: wrong password");
        return Err(invalid());
    }

    let issued = services
        .jwt
        .issue(user.id, &user.username, user.role, Utc::now())
        .map_err(errors::token_error_to_response)?;

    tracing::info!(user = %user.username, role = %user.role, "user logged in");
    Ok(Json(dto::LoginResponse {
        token: issued.token,
        expires_at: issued.claims.expires_at(),
    })
    .into_response())
}

pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Response, Response> {
    services
        .store
        .revoke_token(principal.token_id(), principal.token_expires_at())
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(user = principal.username(), "user logged out");
    Ok(dto::Message::new("logged out").into_response())
}

pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::ChangePasswordRequest>,
) -> Result<Response, Response> {
    if body.current_password.is_empty() || body.new_password.is_empty() {
        return Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "current and new password required",
        ));
    }

    let user = services
        .store
        .user(principal.user_id())
        .await
        .map_err(errors::store_error_to_response)?
        .ok_or_else(|| errors::json_error(StatusCode::NOT_FOUND, "not_found", "user not found"))?;

    let matches = verify_password(&body.current_password, &user.password_hash)
        .map_err(errors::password_error_to_response)?;
    if !matches {
        return Err(errors::json_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "current password is incorrect",
        ));
    }

    validate_password(&body.new_password).map_err(errors::password_error_to_response)?;
    let hash = hash_password(&body.new_password).map_err(errors::password_error_to_response)?;
    services
        .store
        .set_user_password(user.id, &hash)
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(user = principal.username(), "user changed own password");
    Ok(dto::Message::new("password updated").into_response())
}
