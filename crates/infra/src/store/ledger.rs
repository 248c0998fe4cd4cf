//! Read paths over the current-state ledger (`inventory` table).

use sqlx::{Executor, Sqlite};

use depot_core::{ItemId, OwnerId};
use depot_inventory::Holding;

use super::{Store, rows};
use crate::error::{StoreError, map_sqlx_error};

/// Current quantity of `(item, owner)`; `None` when the pair is absent.
pub(crate) async fn held<'e, E>(executor: E, item: ItemId, owner: OwnerId) -> Result<Option<i64>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar("SELECT quantity FROM inventory WHERE item_id = ?1 AND owner_id = ?2")
        .bind(item.get())
        .bind(owner.get())
        .fetch_optional(executor)
        .await
        .map_err(|e| map_sqlx_error("get_holding", e))
}

impl Store {
    /// Every holding, ordered by item name then owner name.
    pub async fn list_inventory(&self) -> Result<Vec<Holding>, StoreError> {
        let sql = format!("{} ORDER BY i.name, o.name", rows::HOLDING_SELECT);
        let found = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_inventory", e))?;
        found.iter().map(rows::holding).collect()
    }

    /// Who holds `item`, locations before people, then by name.
    pub async fn item_distribution(&self, item: ItemId) -> Result<Vec<Holding>, StoreError> {
        let sql = format!(
            "{} WHERE inv.item_id = ?1 ORDER BY o.type, o.name",
            rows::HOLDING_SELECT
        );
        let found = sqlx::query(&sql)
            .bind(item.get())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("item_distribution", e))?;
        found.iter().map(rows::holding).collect()
    }

    /// What `owner` holds, by item name.
    pub async fn owner_inventory(&self, owner: OwnerId) -> Result<Vec<Holding>, StoreError> {
        let sql = format!("{} WHERE inv.owner_id = ?1 ORDER BY i.name", rows::HOLDING_SELECT);
        let found = sqlx::query(&sql)
            .bind(owner.get())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("owner_inventory", e))?;
        found.iter().map(rows::holding).collect()
    }

    pub async fn holding(&self, item: ItemId, owner: OwnerId) -> Result<Option<i64>, StoreError> {
        held(&self.pool, item, owner).await
    }

    /// Total quantity of `item` across all owners.
    pub async fn item_total(&self, item: ItemId) -> Result<i64, StoreError> {
        sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0) FROM inventory WHERE item_id = ?1")
            .bind(item.get())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("item_total", e))
    }
}
