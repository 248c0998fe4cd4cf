use chrono::Utc;
use tracing::instrument;

use depot_core::{DomainError, OwnerId};
use depot_inventory::{Owner, OwnerKind, validate_name};

use super::{Store, rows};
use crate::error::{StoreError, map_sqlx_error};

impl Store {
    #[instrument(skip(self), err)]
    pub async fn create_owner(&self, name: &str, kind: OwnerKind) -> Result<Owner, StoreError> {
        let name = validate_name(name)?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO owners (name, type, created_at) VALUES (?1, ?2, ?3) RETURNING id",
        )
        .bind(&name)
        .bind(kind.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_owner", e))?;

        self.owner(OwnerId::new(id))
            .await?
            .ok_or_else(|| StoreError::Storage("created owner vanished".into()))
    }

    /// Owner by id, including soft-deleted ones (history still names them).
    pub async fn owner(&self, id: OwnerId) -> Result<Option<Owner>, StoreError> {
        let sql = format!("SELECT {} FROM owners WHERE id = ?1", rows::OWNER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_owner", e))?;
        row.as_ref().map(rows::owner).transpose()
    }

    /// Active owners ordered by name, optionally of one kind.
    pub async fn list_owners(&self, kind: Option<OwnerKind>) -> Result<Vec<Owner>, StoreError> {
        let sql = format!(
            "SELECT {} FROM owners
             WHERE deleted_at IS NULL AND (?1 IS NULL OR type = ?1)
             ORDER BY name, id",
            rows::OWNER_COLUMNS
        );
        let found = sqlx::query(&sql)
            .bind(kind.map(OwnerKind::as_str))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_owners", e))?;
        found.iter().map(rows::owner).collect()
    }

    #[instrument(skip(self), err)]
    pub async fn rename_owner(&self, id: OwnerId, name: &str) -> Result<Owner, StoreError> {
        let name = validate_name(name)?;
        let result = sqlx::query("UPDATE owners SET name = ?1 WHERE id = ?2 AND deleted_at IS NULL")
            .bind(&name)
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("rename_owner", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("owner").into());
        }
        self.owner(id)
            .await?
            .ok_or_else(|| DomainError::not_found("owner").into())
    }

    /// Whether an active owner with this id exists.
    pub async fn owner_exists(&self, id: OwnerId) -> Result<bool, StoreError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM owners WHERE id = ?1 AND deleted_at IS NULL)")
            .bind(id.get())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("owner_exists", e))
    }

    /// Whether `id` is an active location.
    pub async fn is_location(&self, id: OwnerId) -> Result<bool, StoreError> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM owners WHERE id = ?1 AND deleted_at IS NULL AND type = 'location')",
        )
        .bind(id.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("is_location", e))
    }
}
