use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use depot_core::{DomainError, OwnerId};

/// Owner kind: who (or where) can hold inventory.
///
/// Behaviour differs only in validation: stock can be added directly to a
/// location, while a person only ever receives stock through a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    Person,
    Location,
}

impl OwnerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OwnerKind::Person => "person",
            OwnerKind::Location => "location",
        }
    }

    /// Whether externally-sourced stock may appear at this kind of owner.
    pub fn accepts_stock(self) -> bool {
        self == OwnerKind::Location
    }
}

impl core::fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OwnerKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "person" => Ok(OwnerKind::Person),
            "location" => Ok(OwnerKind::Location),
            other => Err(DomainError::validation(format!(
                "owner type must be 'person' or 'location', got '{other}'"
            ))),
        }
    }
}

/// A person or location capable of holding inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: OwnerId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OwnerKind,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Owner {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Normalise and validate an owner or item display name.
pub fn validate_name(name: &str) -> Result<String, DomainError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_locations_accept_stock() {
        assert!(OwnerKind::Location.accepts_stock());
        assert!(!OwnerKind::Person.accepts_stock());
    }

    #[test]
    fn kind_parses_closed_set() {
        assert_eq!("person".parse::<OwnerKind>().unwrap(), OwnerKind::Person);
        assert_eq!("location".parse::<OwnerKind>().unwrap(), OwnerKind::Location);
        assert!(matches!(
            "warehouse".parse::<OwnerKind>(),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn owner_serializes_kind_as_type() {
        let owner = Owner {
            id: OwnerId::new(1),
            name: "Storage".to_string(),
            kind: OwnerKind::Location,
            created_at: Utc::now(),
            deleted_at: None,
        };
        let json = serde_json::to_value(&owner).unwrap();
        assert_eq!(json["type"], "location");
        assert!(json.get("deleted_at").is_none());
    }

    #[test]
    fn blank_names_are_rejected() {
        assert_eq!(validate_name("  Alice ").unwrap(), "Alice");
        assert!(validate_name("   ").is_err());
    }
}
