//! Transfer Engine: the only writer of the holdings ledger.
//!
//! Every operation runs its read-check-write sequence inside one
//! [`ImmediateTx`]. Domain rules come from `depot_inventory::holding`; this
//! module only reads the current state, asks the planner what to do and
//! applies the resulting [`HoldingChange`]s.
//!
//! ## Deadlines
//!
//! The caller's deadline covers lock acquisition and the whole
//! read-check-write sequence. It is checked once more right before `COMMIT`;
//! once `COMMIT` has been sent the operation is allowed to finish, so a
//! successful return always means the change is durable and a
//! `DeadlineExceeded` always means nothing was written.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tokio::time::Instant;
use tracing::instrument;

use depot_core::{DomainError, ItemId, OwnerId, TransferId, UserId};
use depot_inventory::{
    HoldingChange, Movement, OwnerKind, StockAddition, StockAdjustment, Transfer, plan_adjustment,
    plan_deposit, plan_withdrawal,
};

use crate::error::{StoreError, map_sqlx_error};
use crate::store::{ledger, transfers};
use crate::tx::ImmediateTx;

/// Per-call context: who is acting and by when the call must have committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpContext {
    pub actor: Option<UserId>,
    pub deadline: Option<Instant>,
}

impl OpContext {
    pub fn new(actor: Option<UserId>) -> Self {
        Self {
            actor,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|at| Instant::now() >= at)
    }

    /// Run `fut`, giving up with `DeadlineExceeded` once the deadline passes.
    /// Dropping `fut` early is safe: an open [`ImmediateTx`] closes its
    /// connection instead of going back to the pool.
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match self.deadline {
            Some(at) => tokio::time::timeout_at(at, fut)
                .await
                .map_err(|_| StoreError::DeadlineExceeded)?,
            None => fut.await,
        }
    }

    fn check_deadline<T>(&self, result: Result<T, StoreError>) -> Result<T, StoreError> {
        match result {
            Ok(_) if self.is_expired() => Err(StoreError::DeadlineExceeded),
            other => other,
        }
    }
}

/// Executes movements, stock additions, adjustments and owner deletion.
///
/// Cheap to clone; clones share the same pool.
#[derive(Debug, Clone)]
pub struct TransferEngine {
    pool: SqlitePool,
}

impl TransferEngine {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Move `movement.quantity` of an item from one owner to another and
    /// record it in the audit log, or change nothing.
    #[instrument(
        skip(self, movement, ctx),
        fields(
            item = %movement.item_id,
            from = %movement.from_owner_id,
            to = %movement.to_owner_id,
            quantity = movement.quantity,
        ),
        err
    )]
    pub async fn execute(&self, movement: &Movement, ctx: OpContext) -> Result<Transfer, StoreError> {
        movement.validate()?;

        let mut tx = ctx.bounded(ImmediateTx::begin(&self.pool)).await?;
        let result = ctx.bounded(apply_movement(tx.conn(), movement, ctx.actor)).await;
        tx.finish(ctx.check_deadline(result)).await
    }

    /// Bring external stock into a location. Ledger only: no audit entry.
    /// Returns the location's new quantity.
    #[instrument(
        skip(self, addition, ctx),
        fields(item = %addition.item_id, owner = %addition.owner_id, quantity = addition.quantity),
        err
    )]
    pub async fn add_stock(&self, addition: &StockAddition, ctx: OpContext) -> Result<i64, StoreError> {
        addition.validate()?;

        let mut tx = ctx.bounded(ImmediateTx::begin(&self.pool)).await?;
        let result = ctx.bounded(apply_addition(tx.conn(), addition)).await;
        tx.finish(ctx.check_deadline(result)).await
    }

    /// Apply a signed correction to a holding. Ledger only: no audit entry.
    /// Returns the new quantity, `None` when the holding was emptied.
    #[instrument(
        skip(self, adjustment, ctx),
        fields(item = %adjustment.item_id, owner = %adjustment.owner_id, delta = adjustment.delta),
        err
    )]
    pub async fn adjust_stock(
        &self,
        adjustment: &StockAdjustment,
        ctx: OpContext,
    ) -> Result<Option<i64>, StoreError> {
        adjustment.validate()?;

        let mut tx = ctx.bounded(ImmediateTx::begin(&self.pool)).await?;
        let result = ctx.bounded(apply_adjustment(tx.conn(), adjustment)).await;
        tx.finish(ctx.check_deadline(result)).await
    }

    /// Soft-delete an owner that holds nothing.
    #[instrument(skip(self, ctx), fields(owner = %owner), err)]
    pub async fn delete_owner(&self, owner: OwnerId, ctx: OpContext) -> Result<(), StoreError> {
        let mut tx = ctx.bounded(ImmediateTx::begin(&self.pool)).await?;
        let result = ctx.bounded(apply_owner_deletion(tx.conn(), owner)).await;
        tx.finish(ctx.check_deadline(result)).await
    }
}

async fn apply_movement(
    conn: &mut SqliteConnection,
    movement: &Movement,
    actor: Option<UserId>,
) -> Result<Transfer, StoreError> {
    let item = movement.item_id;
    let (from, to) = (movement.from_owner_id, movement.to_owner_id);

    require_active_item(conn, item).await?;
    // The source may be soft-deleted; only active owners can receive.
    require_owner(conn, from, false).await?;
    require_owner(conn, to, true).await?;

    let withdrawal = plan_withdrawal(ledger::held(&mut *conn, item, from).await?, movement.quantity)?;
    let deposit = plan_deposit(ledger::held(&mut *conn, item, to).await?, movement.quantity)?;
    apply_change(conn, item, from, withdrawal).await?;
    apply_change(conn, item, to, deposit).await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO transfers
             (item_id, from_owner_id, to_owner_id, quantity, notes, transferred_at, transferred_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING id",
    )
    .bind(item.get())
    .bind(from.get())
    .bind(to.get())
    .bind(movement.quantity)
    .bind(movement.notes.trim())
    .bind(Utc::now())
    .bind(actor.map(UserId::get))
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("insert_transfer", e))?;

    transfers::fetch_transfer(&mut *conn, TransferId::new(id))
        .await?
        .ok_or_else(|| StoreError::Storage("inserted transfer not readable".into()))
}

async fn apply_addition(conn: &mut SqliteConnection, addition: &StockAddition) -> Result<i64, StoreError> {
    require_active_item(conn, addition.item_id).await?;
    let kind = require_owner(conn, addition.owner_id, true).await?;
    if !kind.accepts_stock() {
        return Err(DomainError::OwnerVariantMismatch.into());
    }

    let held = ledger::held(&mut *conn, addition.item_id, addition.owner_id).await?;
    let change = plan_deposit(held, addition.quantity)?;
    apply_change(conn, addition.item_id, addition.owner_id, change).await?;
    change
        .resulting()
        .ok_or_else(|| StoreError::Storage("deposit emptied a holding".into()))
}

async fn apply_adjustment(
    conn: &mut SqliteConnection,
    adjustment: &StockAdjustment,
) -> Result<Option<i64>, StoreError> {
    // Soft-deleted items can still be written off.
    if item_state(conn, adjustment.item_id).await?.is_none() {
        return Err(DomainError::not_found("item").into());
    }
    require_owner(conn, adjustment.owner_id, true).await?;

    let held = ledger::held(&mut *conn, adjustment.item_id, adjustment.owner_id).await?;
    let change = plan_adjustment(held, adjustment.delta)?;
    apply_change(conn, adjustment.item_id, adjustment.owner_id, change).await?;
    Ok(change.resulting())
}

async fn apply_owner_deletion(conn: &mut SqliteConnection, owner: OwnerId) -> Result<(), StoreError> {
    require_owner(conn, owner, true).await?;

    let entries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory WHERE owner_id = ?1")
        .bind(owner.get())
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("count_owner_holdings", e))?;
    if entries > 0 {
        return Err(DomainError::OwnerHasInventory { entries }.into());
    }

    sqlx::query("UPDATE owners SET deleted_at = ?1 WHERE id = ?2")
        .bind(Utc::now())
        .bind(owner.get())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("delete_owner", e))?;
    Ok(())
}

/// Write one planned change to the `(item, owner)` holding row.
async fn apply_change(
    conn: &mut SqliteConnection,
    item: ItemId,
    owner: OwnerId,
    change: HoldingChange,
) -> Result<(), StoreError> {
    let query = match change {
        HoldingChange::Insert(quantity) => {
            sqlx::query("INSERT INTO inventory (item_id, owner_id, quantity) VALUES (?1, ?2, ?3)")
                .bind(item.get())
                .bind(owner.get())
                .bind(quantity)
        }
        HoldingChange::Update(quantity) => {
            sqlx::query("UPDATE inventory SET quantity = ?3 WHERE item_id = ?1 AND owner_id = ?2")
                .bind(item.get())
                .bind(owner.get())
                .bind(quantity)
        }
        HoldingChange::Delete => sqlx::query("DELETE FROM inventory WHERE item_id = ?1 AND owner_id = ?2")
            .bind(item.get())
            .bind(owner.get()),
    };
    query
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("write_holding", e))?;
    Ok(())
}

/// `None` if the item does not exist, otherwise whether it is active.
async fn item_state(conn: &mut SqliteConnection, item: ItemId) -> Result<Option<bool>, StoreError> {
    let deleted_at: Option<Option<DateTime<Utc>>> =
        sqlx::query_scalar("SELECT deleted_at FROM items WHERE id = ?1")
            .bind(item.get())
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("get_item_state", e))?;
    Ok(deleted_at.map(|deleted_at| deleted_at.is_none()))
}

async fn require_active_item(conn: &mut SqliteConnection, item: ItemId) -> Result<(), StoreError> {
    match item_state(conn, item).await? {
        Some(true) => Ok(()),
        _ => Err(DomainError::not_found("item").into()),
    }
}

async fn require_owner(
    conn: &mut SqliteConnection,
    owner: OwnerId,
    active_only: bool,
) -> Result<OwnerKind, StoreError> {
    let row: Option<(String, Option<DateTime<Utc>>)> =
        sqlx::query_as("SELECT type, deleted_at FROM owners WHERE id = ?1")
            .bind(owner.get())
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("get_owner_state", e))?;

    match row {
        Some((kind, deleted_at)) if !active_only || deleted_at.is_none() => kind
            .parse()
            .map_err(|e| StoreError::corrupt(format!("owners.type: {e}"))),
        _ => Err(DomainError::not_found("owner").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_without_deadline_never_expires() {
        let ctx = OpContext::new(Some(UserId::new(1)));
        assert!(!ctx.is_expired());
        assert_eq!(ctx.check_deadline(Ok(3)).unwrap(), 3);
    }

    #[tokio::test]
    async fn elapsed_deadline_turns_success_into_deadline_exceeded() {
        let ctx = OpContext::new(None).with_deadline(Instant::now());
        assert!(ctx.is_expired());
        assert!(matches!(ctx.check_deadline(Ok(())), Err(StoreError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn elapsed_deadline_keeps_domain_errors() {
        let ctx = OpContext::new(None).with_deadline(Instant::now());
        let result: Result<(), StoreError> = Err(DomainError::SelfTransfer.into());
        assert!(matches!(
            ctx.check_deadline(result),
            Err(StoreError::Domain(DomainError::SelfTransfer))
        ));
    }

    #[tokio::test]
    async fn bounded_gives_up_after_the_deadline() {
        let ctx = OpContext::new(None).with_timeout(Duration::from_millis(10));
        let result = ctx
            .bounded(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(StoreError::DeadlineExceeded)));
    }
}
