use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use depot_core::{DomainError, DomainResult, ItemId, OwnerId, TransferId, UserId};

use crate::holding::ensure_positive;

/// Immutable audit-log entry for one committed movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub item_id: ItemId,
    pub from_owner_id: OwnerId,
    pub to_owner_id: OwnerId,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    pub transferred_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transferred_by: Option<UserId>,
    pub item_name: String,
    pub from_owner_name: String,
    pub to_owner_name: String,
}

/// Request to move `quantity` of an item between two owners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub item_id: ItemId,
    pub from_owner_id: OwnerId,
    pub to_owner_id: OwnerId,
    pub quantity: i64,
    #[serde(default)]
    pub notes: String,
}

impl Movement {
    /// Checks that need no storage access. A self-transfer is reported before
    /// the quantity so that `(a -> a, 0)` yields `SelfTransfer`.
    pub fn validate(&self) -> DomainResult<()> {
        if self.from_owner_id == self.to_owner_id {
            return Err(DomainError::SelfTransfer);
        }
        ensure_positive(self.quantity)
    }
}

/// Externally sourced stock appearing at a location. Ledger-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAddition {
    pub item_id: ItemId,
    pub owner_id: OwnerId,
    pub quantity: i64,
}

impl StockAddition {
    pub fn validate(&self) -> DomainResult<()> {
        ensure_positive(self.quantity)
    }
}

/// Signed correction of a holding (loss, recount). Ledger-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub item_id: ItemId,
    pub owner_id: OwnerId,
    pub delta: i64,
    #[serde(default)]
    pub notes: String,
}

impl StockAdjustment {
    pub fn validate(&self) -> DomainResult<()> {
        if self.delta == 0 {
            return Err(DomainError::invalid_quantity("delta must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movement(from: i64, to: i64, quantity: i64) -> Movement {
        Movement {
            item_id: ItemId::new(1),
            from_owner_id: OwnerId::new(from),
            to_owner_id: OwnerId::new(to),
            quantity,
            notes: String::new(),
        }
    }

    #[test]
    fn self_transfer_is_checked_before_quantity() {
        assert_eq!(movement(2, 2, 0).validate(), Err(DomainError::SelfTransfer));
        assert_eq!(movement(2, 2, 5).validate(), Err(DomainError::SelfTransfer));
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        assert!(matches!(
            movement(1, 2, 0).validate(),
            Err(DomainError::InvalidQuantity(_))
        ));
        assert!(matches!(
            movement(1, 2, -4).validate(),
            Err(DomainError::InvalidQuantity(_))
        ));
        assert!(movement(1, 2, 1).validate().is_ok());
    }

    #[test]
    fn zero_adjustment_is_rejected() {
        let adj = StockAdjustment {
            item_id: ItemId::new(1),
            owner_id: OwnerId::new(1),
            delta: 0,
            notes: "recount".into(),
        };
        assert!(matches!(adj.validate(), Err(DomainError::InvalidQuantity(_))));
    }

    #[test]
    fn movement_notes_default_to_empty() {
        let m: Movement = serde_json::from_str(
            r#"{"item_id":1,"from_owner_id":2,"to_owner_id":3,"quantity":4}"#,
        )
        .unwrap();
        assert_eq!(m.notes, "");
        assert_eq!(m.to_owner_id, OwnerId::new(3));
    }
}
