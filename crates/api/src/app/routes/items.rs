use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, multipart::MultipartError},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;

use depot_auth::Role;
use depot_core::ItemId;
use depot_inventory::{ItemStatus, MAX_IMAGE_BYTES};

use crate::app::{dto, errors, services::AppServices};
use crate::authz::require_role;
use crate::context::PrincipalContext;

/// Multipart framing on top of the image itself.
const UPLOAD_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/:id", get(get_item).put(update_item).delete(delete_item))
        .route(
            "/:id/image",
            get(get_image)
                .put(upload_image)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + UPLOAD_OVERHEAD_BYTES)),
        )
        .route("/:id/history", get(item_history))
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ItemListQuery>,
) -> Result<Response, Response> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(dto::parse::<ItemStatus>(raw)?),
    };
    let items = services
        .store
        .list_items(status)
        .await
        .map_err(errors::store_error_to_response)?;
    Ok(Json(items).into_response())
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateItemRequest>,
) -> Result<Response, Response> {
    require_role(&principal, Role::Manager)?;
    let item = services
        .store
        .create_item(&body.name, &body.description)
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(user = principal.username(), item = %item.name, "item created");
    Ok((StatusCode::CREATED, Json(item)).into_response())
}

/// The item together with who currently holds it.
pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, Response> {
    let id: ItemId = dto::parse(&id)?;
    let item = services
        .store
        .item(id)
        .await
        .map_err(errors::store_error_to_response)?
        .ok_or_else(|| errors::json_error(StatusCode::NOT_FOUND, "not_found", "item not found"))?;
    let distribution = services
        .store
        .item_distribution(id)
        .await
        .map_err(errors::store_error_to_response)?;
    Ok(Json(dto::ItemDetails { item, distribution }).into_response())
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateItemRequest>,
) -> Result<Response, Response> {
    require_role(&principal, Role::Manager)?;
    let id: ItemId = dto::parse(&id)?;
    let status = match body.status.trim() {
        "" => ItemStatus::Active,
        raw => dto::parse(raw)?,
    };

    let item = services
        .store
        .update_item(id, &body.name, &body.description, status)
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(
        user = principal.username(),
        item = %item.name,
        status = status.as_str(),
        "item updated"
    );
    Ok(Json(item).into_response())
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Response, Response> {
    require_role(&principal, Role::Manager)?;
    let id: ItemId = dto::parse(&id)?;

    services
        .store
        .delete_item(id)
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(user = principal.username(), item = %id, "item deleted");
    Ok(dto::Message::new("item deleted").into_response())
}

/// Accepts a multipart form with an `image` file field.
pub async fn upload_image(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Response, Response> {
    require_role(&principal, Role::Manager)?;
    let id: ItemId = dto::parse(&id)?;

    let mut image = None;
    while let Some(field) = multipart.next_field().await.map_err(invalid_form)? {
        if field.name() == Some("image") {
            image = Some(field.bytes().await.map_err(invalid_form)?);
            break;
        }
    }
    let image = image.ok_or_else(|| {
        errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "image file required")
    })?;

    let mime = services
        .store
        .set_item_image(id, &image)
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(
        user = principal.username(),
        item = %id,
        bytes = image.len(),
        mime = mime.as_str(),
        "item image uploaded"
    );
    Ok(Json(json!({ "message": "image uploaded", "mime": mime.as_str() })).into_response())
}

pub async fn get_image(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, Response> {
    let id: ItemId = dto::parse(&id)?;
    let (bytes, mime) = services
        .store
        .item_image(id)
        .await
        .map_err(errors::store_error_to_response)?
        .ok_or_else(|| errors::json_error(StatusCode::NOT_FOUND, "not_found", "image not found"))?;
    Ok(([(header::CONTENT_TYPE, mime.as_str())], bytes).into_response())
}

pub async fn item_history(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, Response> {
    let id: ItemId = dto::parse(&id)?;
    let exists = services
        .store
        .item(id)
        .await
        .map_err(errors::store_error_to_response)?
        .is_some();
    if !exists {
        return Err(errors::json_error(StatusCode::NOT_FOUND, "not_found", "item not found"));
    }

    let history = services
        .store
        .item_history(id)
        .await
        .map_err(errors::store_error_to_response)?;
    Ok(Json(history).into_response())
}

fn invalid_form(err: MultipartError) -> Response {
    errors::json_error(
        StatusCode::BAD_REQUEST,
        "validation_error",
        format!("file too large or invalid multipart form: {err}"),
    )
}
