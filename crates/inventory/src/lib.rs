//! Inventory domain module.
//!
//! This crate contains the business rules for owners, items, holdings and
//! transfers, implemented purely as deterministic domain logic (no IO, no
//! HTTP, no storage). The storage layer asks the holding planners what to do
//! and applies the answer inside its own transaction.

pub mod holding;
pub mod item;
pub mod owner;
pub mod transfer;

pub use holding::{
    Holding, HoldingChange, ensure_positive, plan_adjustment, plan_deposit, plan_withdrawal,
};
pub use item::{ImageMime, Item, ItemStatus, MAX_IMAGE_BYTES};
pub use owner::{Owner, OwnerKind, validate_name};
pub use transfer::{Movement, StockAddition, StockAdjustment, Transfer};
