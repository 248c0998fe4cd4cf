use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::app::{dto, errors, services::AppServices};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/", get(list_transfers).post(create_transfer))
}

/// Move stock between two owners. Open to every authenticated role.
pub async fn create_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateTransferRequest>,
) -> Result<Response, Response> {
    let movement = body.into_movement()?;

    let transfer = services
        .engine
        .execute(&movement, services.op_context(&principal))
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(
        user = principal.username(),
        transfer_id = %transfer.id,
        item = %transfer.item_name,
        quantity = transfer.quantity,
        from = %transfer.from_owner_name,
        to = %transfer.to_owner_name,
        "transfer created"
    );
    Ok((StatusCode::CREATED, Json(transfer)).into_response())
}

pub async fn list_transfers(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::TransferListQuery>,
) -> Result<Response, Response> {
    let filter = query.into_filter()?;
    let transfers = services
        .store
        .list_transfers(filter)
        .await
        .map_err(errors::store_error_to_response)?;
    Ok(Json(transfers).into_response())
}
