//! Ledger views and the two ledger-only mutations (stock addition and
//! adjustment), which leave no transfer record behind.

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use depot_auth::Role;

use crate::app::{dto, errors, services::AppServices};
use crate::authz::require_role;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_inventory))
        .route("/stock", post(add_stock))
        .route("/adjust", post(adjust_stock))
}

pub async fn list_inventory(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Response, Response> {
    let holdings = services
        .store
        .list_inventory()
        .await
        .map_err(errors::store_error_to_response)?;
    Ok(Json(holdings).into_response())
}

pub async fn add_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::AddStockRequest>,
) -> Result<Response, Response> {
    require_role(&principal, Role::Manager)?;
    let addition = body.into_addition()?;

    let quantity = services
        .engine
        .add_stock(&addition, services.op_context(&principal))
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(
        user = principal.username(),
        item = %addition.item_id,
        owner = %addition.owner_id,
        added = addition.quantity,
        quantity,
        "stock added"
    );
    Ok(Json(dto::StockLevel {
        item_id: addition.item_id,
        owner_id: addition.owner_id,
        quantity: Some(quantity),
    })
    .into_response())
}

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::AdjustStockRequest>,
) -> Result<Response, Response> {
    require_role(&principal, Role::Manager)?;
    let adjustment = body.into_adjustment()?;

    let quantity = services
        .engine
        .adjust_stock(&adjustment, services.op_context(&principal))
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(
        user = principal.username(),
        item = %adjustment.item_id,
        owner = %adjustment.owner_id,
        delta = adjustment.delta,
        quantity = ?quantity,
        notes = %adjustment.notes,
        "inventory adjusted"
    );
    Ok(Json(dto::StockLevel {
        item_id: adjustment.item_id,
        owner_id: adjustment.owner_id,
        quantity,
    })
    .into_response())
}
