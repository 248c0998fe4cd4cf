//! Holding state machine.
//!
//! A holding is the current quantity of one item held by one owner. The pair
//! is either ABSENT (no row) or PRESENT with a strictly positive quantity:
//!
//! ```text
//! ABSENT --(stock addition | incoming transfer | positive adjustment)--> PRESENT(q)
//! PRESENT(q) --(outgoing transfer | adjustment reaching zero)--> ABSENT
//! ```
//!
//! The planners below are pure: they take the currently held quantity (if
//! any) and return the row change the storage layer must apply. They never
//! produce a zero-quantity row.

use serde::{Deserialize, Serialize};

use depot_core::{DomainError, DomainResult, ItemId, OwnerId};

use crate::owner::OwnerKind;

/// Current-state ledger row, joined with display names for read paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub item_id: ItemId,
    pub owner_id: OwnerId,
    pub quantity: i64,
    pub item_name: String,
    pub owner_name: String,
    pub owner_type: OwnerKind,
}

/// Row-level change to apply to a single `(item, owner)` holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldingChange {
    /// The pair was absent; create it with this quantity.
    Insert(i64),
    /// The pair stays present with this new quantity.
    Update(i64),
    /// The quantity reached zero; remove the row.
    Delete,
}

impl HoldingChange {
    /// Quantity held after the change (`None` means absent).
    pub fn resulting(self) -> Option<i64> {
        match self {
            HoldingChange::Insert(q) | HoldingChange::Update(q) => Some(q),
            HoldingChange::Delete => None,
        }
    }
}

/// Reject zero and negative quantities on any mutating operation.
pub fn ensure_positive(quantity: i64) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::invalid_quantity(format!(
            "quantity must be positive, got {quantity}"
        )));
    }
    Ok(())
}

/// Plan taking `quantity` units away from a holding.
pub fn plan_withdrawal(held: Option<i64>, quantity: i64) -> DomainResult<HoldingChange> {
    ensure_positive(quantity)?;
    let held = held.unwrap_or(0);
    if held < quantity {
        return Err(DomainError::InsufficientQuantity {
            held,
            requested: quantity,
        });
    }
    Ok(match held - quantity {
        0 => HoldingChange::Delete,
        remaining => HoldingChange::Update(remaining),
    })
}

/// Plan adding `quantity` units to a holding, creating it if absent.
pub fn plan_deposit(held: Option<i64>, quantity: i64) -> DomainResult<HoldingChange> {
    ensure_positive(quantity)?;
    match held {
        None => Ok(HoldingChange::Insert(quantity)),
        Some(current) => current
            .checked_add(quantity)
            .map(HoldingChange::Update)
            .ok_or_else(|| DomainError::invalid_quantity("resulting quantity overflows")),
    }
}

/// Plan a signed correction of a holding.
pub fn plan_adjustment(held: Option<i64>, delta: i64) -> DomainResult<HoldingChange> {
    if delta == 0 {
        return Err(DomainError::invalid_quantity("delta must be non-zero"));
    }
    let current = held.unwrap_or(0);
    let next = current
        .checked_add(delta)
        .ok_or_else(|| DomainError::invalid_quantity("resulting quantity overflows"))?;
    if next < 0 {
        return Err(DomainError::InvalidAdjustment {
            held: current,
            delta,
        });
    }
    Ok(match (held, next) {
        (_, 0) => HoldingChange::Delete,
        (None, q) => HoldingChange::Insert(q),
        (Some(_), q) => HoldingChange::Update(q),
    })
}
