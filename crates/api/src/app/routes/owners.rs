use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use depot_auth::Role;
use depot_core::OwnerId;
use depot_inventory::OwnerKind;

use crate::app::{dto, errors, services::AppServices};
use crate::authz::require_role;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_owners).post(create_owner))
        .route("/:id", get(get_owner).put(rename_owner).delete(delete_owner))
        .route("/:id/inventory", get(owner_inventory))
}

pub async fn list_owners(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::OwnerListQuery>,
) -> Result<Response, Response> {
    let kind = match query.kind.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(dto::parse::<OwnerKind>(raw)?),
    };
    let owners = services
        .store
        .list_owners(kind)
        .await
        .map_err(errors::store_error_to_response)?;
    Ok(Json(owners).into_response())
}

pub async fn create_owner(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateOwnerRequest>,
) -> Result<Response, Response> {
    require_role(&principal, Role::Manager)?;
    let kind: OwnerKind = dto::parse(body.kind.trim())?;

    let owner = services
        .store
        .create_owner(&body.name, kind)
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(user = principal.username(), owner = %owner.name, kind = kind.as_str(), "owner created");
    Ok((StatusCode::CREATED, Json(owner)).into_response())
}

pub async fn get_owner(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, Response> {
    let id: OwnerId = dto::parse(&id)?;
    let owner = services
        .store
        .owner(id)
        .await
        .map_err(errors::store_error_to_response)?
        .filter(|owner| owner.is_active())
        .ok_or_else(|| errors::json_error(StatusCode::NOT_FOUND, "not_found", "owner not found"))?;
    Ok(Json(owner).into_response())
}

pub async fn rename_owner(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::RenameOwnerRequest>,
) -> Result<Response, Response> {
    require_role(&principal, Role::Manager)?;
    let id: OwnerId = dto::parse(&id)?;

    let owner = services
        .store
        .rename_owner(id, &body.name)
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(user = principal.username(), owner = %owner.name, "owner updated");
    Ok(Json(owner).into_response())
}

pub async fn delete_owner(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Response, Response> {
    require_role(&principal, Role::Manager)?;
    let id: OwnerId = dto::parse(&id)?;

    services
        .engine
        .delete_owner(id, services.op_context(&principal))
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(user = principal.username(), owner = %id, "owner deleted");
    Ok(dto::Message::new("owner deleted").into_response())
}

pub async fn owner_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, Response> {
    let id: OwnerId = dto::parse(&id)?;
    if !services
        .store
        .owner_exists(id)
        .await
        .map_err(errors::store_error_to_response)?
    {
        return Err(errors::json_error(StatusCode::NOT_FOUND, "not_found", "owner not found"));
    }

    let holdings = services
        .store
        .owner_inventory(id)
        .await
        .map_err(errors::store_error_to_response)?;
    Ok(Json(holdings).into_response())
}
