use chrono::Utc;
use tracing::instrument;

use depot_core::{DomainError, ItemId};
use depot_inventory::{ImageMime, Item, ItemStatus, validate_name};

use super::{Store, rows};
use crate::error::{StoreError, map_sqlx_error};

impl Store {
    #[instrument(skip(self, description), err)]
    pub async fn create_item(&self, name: &str, description: &str) -> Result<Item, StoreError> {
        let name = validate_name(name)?;
        let now = Utc::now();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO items (name, description, status, created_at, updated_at)
             VALUES (?1, ?2, 'active', ?3, ?3) RETURNING id",
        )
        .bind(&name)
        .bind(description.trim())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_item", e))?;

        self.item(ItemId::new(id))
            .await?
            .ok_or_else(|| StoreError::Storage("created item vanished".into()))
    }

    /// Item by id, including soft-deleted ones.
    pub async fn item(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        let sql = format!("SELECT {} FROM items WHERE id = ?1", rows::ITEM_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_item", e))?;
        row.as_ref().map(rows::item).transpose()
    }

    /// Active items ordered by name, optionally with one status.
    pub async fn list_items(&self, status: Option<ItemStatus>) -> Result<Vec<Item>, StoreError> {
        let sql = format!(
            "SELECT {} FROM items
             WHERE deleted_at IS NULL AND (?1 IS NULL OR status = ?1)
             ORDER BY name, id",
            rows::ITEM_COLUMNS
        );
        let found = sqlx::query(&sql)
            .bind(status.map(ItemStatus::as_str))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_items", e))?;
        found.iter().map(rows::item).collect()
    }

    /// Replace an active item's metadata and bump `updated_at`.
    #[instrument(skip(self, description), err)]
    pub async fn update_item(
        &self,
        id: ItemId,
        name: &str,
        description: &str,
        status: ItemStatus,
    ) -> Result<Item, StoreError> {
        let name = validate_name(name)?;
        let result = sqlx::query(
            "UPDATE items SET name = ?1, description = ?2, status = ?3, updated_at = ?4
             WHERE id = ?5 AND deleted_at IS NULL",
        )
        .bind(&name)
        .bind(description.trim())
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(id.get())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_item", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("item").into());
        }
        self.item(id)
            .await?
            .ok_or_else(|| DomainError::not_found("item").into())
    }

    /// Soft-delete. Holdings and history stay intact and keep naming the item.
    #[instrument(skip(self), err)]
    pub async fn delete_item(&self, id: ItemId) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE items SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL")
            .bind(Utc::now())
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_item", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("item").into());
        }
        Ok(())
    }

    /// Store an uploaded picture. The format is sniffed from the bytes.
    #[instrument(skip(self, image), fields(bytes = image.len()), err)]
    pub async fn set_item_image(&self, id: ItemId, image: &[u8]) -> Result<ImageMime, StoreError> {
        let mime = ImageMime::validate_upload(image)?;
        let result = sqlx::query(
            "UPDATE items SET image = ?1, image_mime = ?2, updated_at = ?3
             WHERE id = ?4 AND deleted_at IS NULL",
        )
        .bind(image)
        .bind(mime.as_str())
        .bind(Utc::now())
        .bind(id.get())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_item_image", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("item").into());
        }
        Ok(mime)
    }

    /// Picture bytes and format; `None` when the item or its picture is missing.
    pub async fn item_image(&self, id: ItemId) -> Result<Option<(Vec<u8>, ImageMime)>, StoreError> {
        let row: Option<(Option<Vec<u8>>, Option<String>)> =
            sqlx::query_as("SELECT image, image_mime FROM items WHERE id = ?1")
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("get_item_image", e))?;

        match row {
            Some((Some(bytes), Some(mime))) => {
                let mime = mime
                    .parse()
                    .map_err(|e| StoreError::corrupt(format!("image_mime: {e}")))?;
                Ok(Some((bytes, mime)))
            }
            _ => Ok(None),
        }
    }
}
