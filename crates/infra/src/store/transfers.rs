//! Read paths over the audit log (`transfers` table).
//!
//! Newest first by commit order (`id DESC`): ids are assigned inside the
//! write transaction, so they follow the order holdings were mutated even
//! when wall-clock timestamps tie.

use serde::Deserialize;
use sqlx::{Executor, QueryBuilder, Sqlite};

use depot_core::{ItemId, OwnerId, TransferId};
use depot_inventory::Transfer;

use super::{Store, rows};
use crate::error::{StoreError, map_sqlx_error};

/// Optional filters for [`Store::list_transfers`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TransferFilter {
    pub item_id: Option<ItemId>,
    /// Matches either side of the movement.
    pub owner_id: Option<OwnerId>,
}

pub(crate) async fn fetch_transfer<'e, E>(executor: E, id: TransferId) -> Result<Option<Transfer>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{} WHERE t.id = ?1", rows::TRANSFER_SELECT);
    let row = sqlx::query(&sql)
        .bind(id.get())
        .fetch_optional(executor)
        .await
        .map_err(|e| map_sqlx_error("get_transfer", e))?;
    row.as_ref().map(rows::transfer).transpose()
}

impl Store {
    pub async fn transfer(&self, id: TransferId) -> Result<Option<Transfer>, StoreError> {
        fetch_transfer(&self.pool, id).await
    }

    pub async fn list_transfers(&self, filter: TransferFilter) -> Result<Vec<Transfer>, StoreError> {
        let mut query = QueryBuilder::<Sqlite>::new(rows::TRANSFER_SELECT);
        query.push(" WHERE 1 = 1");
        if let Some(item) = filter.item_id {
            query.push(" AND t.item_id = ").push_bind(item.get());
        }
        if let Some(owner) = filter.owner_id {
            query
                .push(" AND (t.from_owner_id = ")
                .push_bind(owner.get())
                .push(" OR t.to_owner_id = ")
                .push_bind(owner.get())
                .push(")");
        }
        query.push(" ORDER BY t.id DESC");

        let found = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_transfers", e))?;
        found.iter().map(rows::transfer).collect()
    }

    /// Movement history of one item.
    pub async fn item_history(&self, item: ItemId) -> Result<Vec<Transfer>, StoreError> {
        self.list_transfers(TransferFilter {
            item_id: Some(item),
            owner_id: None,
        })
        .await
    }
}
