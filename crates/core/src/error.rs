//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Storage contention and IO failures belong to the
/// infrastructure layer, which wraps this type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. blank name, malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A mutating operation received a non-positive quantity (or one that would overflow).
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Source and destination of a movement are the same owner.
    #[error("cannot transfer to the same owner")]
    SelfTransfer,

    /// The source holds less than the requested quantity.
    #[error("insufficient quantity: have {held}, need {requested}")]
    InsufficientQuantity { held: i64, requested: i64 },

    /// An adjustment would drive a holding below zero.
    #[error("adjustment would result in negative quantity: {held} + {delta}")]
    InvalidAdjustment { held: i64, delta: i64 },

    /// Stock addition targeted an owner that is not a location.
    #[error("stock can only be added to locations")]
    OwnerVariantMismatch,

    /// Deletion attempted on an owner that still holds inventory.
    #[error("owner still holds {entries} inventory entries")]
    OwnerHasInventory { entries: i64 },

    /// A referenced resource does not exist (or is soft-deleted where that matters).
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A uniqueness or state conflict (e.g. username already taken).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invalid_quantity(msg: impl Into<String>) -> Self {
        Self::InvalidQuantity(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: &'static str) -> Self {
        Self::NotFound(what)
    }
}
