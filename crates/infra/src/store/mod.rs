//! Entity store: owners, items, users, settings and read paths over the
//! ledger and audit log.
//!
//! Everything here is a single statement (autocommit) or a read. Mutations
//! that must keep the ledger and audit log consistent live in
//! [`crate::engine`].

use sqlx::SqlitePool;

use crate::config::StoreConfig;
use crate::engine::TransferEngine;
use crate::error::StoreError;

mod items;
pub(crate) mod ledger;
mod owners;
pub(crate) mod rows;
mod settings;
pub(crate) mod transfers;
mod users;

pub use transfers::TransferFilter;

/// SQLite-backed entity store.
///
/// Cheap to clone; clones share the same pool.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect, migrate and wrap the pool.
    pub async fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        Ok(Self::new(crate::db::open(config).await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Transfer engine sharing this store's pool.
    pub fn engine(&self) -> TransferEngine {
        TransferEngine::new(self.pool.clone())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
