//! Row decoding shared by the store and the engine.
//!
//! Enum columns are stored as their lowercase names and parsed back through
//! the domain `FromStr` impls. A value outside the closed set means the row
//! was written by something other than this crate and is reported as a
//! storage failure.

use core::fmt::Display;
use core::str::FromStr;

use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use depot_auth::User;
use depot_core::{ItemId, OwnerId, TransferId, UserId};
use depot_inventory::{Holding, Item, Owner, Transfer};

use crate::error::{StoreError, map_sqlx_error};

pub(crate) const OWNER_COLUMNS: &str = "id, name, type, created_at, deleted_at";

pub(crate) const ITEM_COLUMNS: &str =
    "id, name, description, image_mime, status, created_at, updated_at, deleted_at";

pub(crate) const USER_COLUMNS: &str = "id, username, password_hash, role, created_at, deleted_at";

pub(crate) const HOLDING_SELECT: &str = r#"
    SELECT inv.item_id, inv.owner_id, inv.quantity,
           i.name AS item_name, o.name AS owner_name, o.type AS owner_type
    FROM inventory inv
    JOIN items i ON i.id = inv.item_id
    JOIN owners o ON o.id = inv.owner_id
"#;

pub(crate) const TRANSFER_SELECT: &str = r#"
    SELECT t.id, t.item_id, t.from_owner_id, t.to_owner_id, t.quantity, t.notes,
           t.transferred_at, t.transferred_by,
           i.name AS item_name, fo.name AS from_owner_name, too.name AS to_owner_name
    FROM transfers t
    JOIN items i ON i.id = t.item_id
    JOIN owners fo ON fo.id = t.from_owner_id
    JOIN owners too ON too.id = t.to_owner_id
"#;

fn get<'r, T>(row: &'r SqliteRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column)
        .map_err(|e| map_sqlx_error("decode_row", e))
}

fn parse<T>(row: &SqliteRow, column: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: Display,
{
    let raw: String = get(row, column)?;
    raw.parse()
        .map_err(|e| StoreError::corrupt(format!("{column}='{raw}': {e}")))
}

pub(crate) fn owner(row: &SqliteRow) -> Result<Owner, StoreError> {
    Ok(Owner {
        id: OwnerId::new(get(row, "id")?),
        name: get(row, "name")?,
        kind: parse(row, "type")?,
        created_at: get(row, "created_at")?,
        deleted_at: get(row, "deleted_at")?,
    })
}

pub(crate) fn item(row: &SqliteRow) -> Result<Item, StoreError> {
    let image_mime: Option<String> = get(row, "image_mime")?;
    Ok(Item {
        id: ItemId::new(get(row, "id")?),
        name: get(row, "name")?,
        description: get(row, "description")?,
        image_mime: image_mime
            .map(|m| m.parse().map_err(|e| StoreError::corrupt(format!("image_mime: {e}"))))
            .transpose()?,
        status: parse(row, "status")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
        deleted_at: get(row, "deleted_at")?,
    })
}

pub(crate) fn user(row: &SqliteRow) -> Result<User, StoreError> {
    Ok(User {
        id: UserId::new(get(row, "id")?),
        username: get(row, "username")?,
        password_hash: get(row, "password_hash")?,
        role: parse(row, "role")?,
        created_at: get(row, "created_at")?,
        deleted_at: get(row, "deleted_at")?,
    })
}

pub(crate) fn holding(row: &SqliteRow) -> Result<Holding, StoreError> {
    Ok(Holding {
        item_id: ItemId::new(get(row, "item_id")?),
        owner_id: OwnerId::new(get(row, "owner_id")?),
        quantity: get(row, "quantity")?,
        item_name: get(row, "item_name")?,
        owner_name: get(row, "owner_name")?,
        owner_type: parse(row, "owner_type")?,
    })
}

pub(crate) fn transfer(row: &SqliteRow) -> Result<Transfer, StoreError> {
    let transferred_by: Option<i64> = get(row, "transferred_by")?;
    Ok(Transfer {
        id: TransferId::new(get(row, "id")?),
        item_id: ItemId::new(get(row, "item_id")?),
        from_owner_id: OwnerId::new(get(row, "from_owner_id")?),
        to_owner_id: OwnerId::new(get(row, "to_owner_id")?),
        quantity: get(row, "quantity")?,
        notes: get(row, "notes")?,
        transferred_at: get(row, "transferred_at")?,
        transferred_by: transferred_by.map(UserId::new),
        item_name: get(row, "item_name")?,
        from_owner_name: get(row, "from_owner_name")?,
        to_owner_name: get(row, "to_owner_name")?,
    })
}
