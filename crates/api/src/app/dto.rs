use std::str::FromStr;

use axum::response::Response;
use serde::{Deserialize, Serialize};

use depot_core::{DomainError, ItemId, OwnerId};
use depot_infra::TransferFilter;
use depot_inventory::{Holding, Item, Movement, StockAddition, StockAdjustment};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateOwnerRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameOwnerRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Empty means `active`.
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransferRequest {
    pub item_id: i64,
    pub from_owner_id: i64,
    pub to_owner_id: i64,
    pub quantity: i64,
    #[serde(default)]
    pub notes: String,
}

impl CreateTransferRequest {
    pub fn into_movement(self) -> Result<Movement, Response> {
        Ok(Movement {
            item_id: ItemId::new(positive_id("item_id", self.item_id)?),
            from_owner_id: OwnerId::new(positive_id("from_owner_id", self.from_owner_id)?),
            to_owner_id: OwnerId::new(positive_id("to_owner_id", self.to_owner_id)?),
            quantity: self.quantity,
            notes: self.notes,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AddStockRequest {
    pub item_id: i64,
    pub owner_id: i64,
    pub quantity: i64,
}

impl AddStockRequest {
    pub fn into_addition(self) -> Result<StockAddition, Response> {
        Ok(StockAddition {
            item_id: ItemId::new(positive_id("item_id", self.item_id)?),
            owner_id: OwnerId::new(positive_id("owner_id", self.owner_id)?),
            quantity: self.quantity,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub item_id: i64,
    pub owner_id: i64,
    pub delta: i64,
    #[serde(default)]
    pub notes: String,
}

impl AdjustStockRequest {
    pub fn into_adjustment(self) -> Result<StockAdjustment, Response> {
        Ok(StockAdjustment {
            item_id: ItemId::new(positive_id("item_id", self.item_id)?),
            owner_id: OwnerId::new(positive_id("owner_id", self.owner_id)?),
            delta: self.delta,
            notes: self.notes,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OwnerListQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransferListQuery {
    pub item_id: Option<String>,
    pub owner_id: Option<String>,
}

impl TransferListQuery {
    pub fn into_filter(self) -> Result<TransferFilter, Response> {
        Ok(TransferFilter {
            item_id: optional_param::<ItemId>(self.item_id)?,
            owner_id: optional_param::<OwnerId>(self.owner_id)?,
        })
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct ItemDetails {
    pub item: Item,
    pub distribution: Vec<Holding>,
}

#[derive(Debug, Serialize)]
pub struct StockLevel {
    pub item_id: ItemId,
    pub owner_id: OwnerId,
    /// `None` once the holding has been emptied.
    pub quantity: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

impl Message {
    pub fn new(message: &'static str) -> axum::Json<Self> {
        axum::Json(Self { message })
    }
}

// -------------------------
// Parsing helpers
// -------------------------

/// Parse a path or query value (ids, enum tags) into a domain type.
pub fn parse<T>(raw: &str) -> Result<T, Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse().map_err(errors::domain_error_to_response)
}

fn optional_param<T>(raw: Option<String>) -> Result<Option<T>, Response>
where
    T: FromStr<Err = DomainError>,
{
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse(value).map(Some),
    }
}

fn positive_id(field: &'static str, raw: i64) -> Result<i64, Response> {
    if raw <= 0 {
        return Err(errors::domain_error_to_response(DomainError::invalid_id(format!(
            "{field} must be positive"
        ))));
    }
    Ok(raw)
}
