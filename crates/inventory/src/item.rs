use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use depot_core::{DomainError, ItemId};

/// Largest accepted item image, in bytes (5 MiB).
pub const MAX_IMAGE_BYTES: usize = 5 << 20;

/// Item condition tag.
///
/// Informational only: a damaged or lost item can still be moved, adjusted
/// and stocked like any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Active,
    Damaged,
    Lost,
    Removed,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Active => "active",
            ItemStatus::Damaged => "damaged",
            ItemStatus::Lost => "lost",
            ItemStatus::Removed => "removed",
        }
    }
}

impl core::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ItemStatus::Active),
            "damaged" => Ok(ItemStatus::Damaged),
            "lost" => Ok(ItemStatus::Lost),
            "removed" => Ok(ItemStatus::Removed),
            other => Err(DomainError::validation(format!(
                "status must be one of active, damaged, lost, removed; got '{other}'"
            ))),
        }
    }
}

/// A quantity-tracked item type (units are fungible, not serialized).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_mime: Option<ImageMime>,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Item {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Image formats accepted for item pictures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageMime {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/gif")]
    Gif,
    #[serde(rename = "image/webp")]
    Webp,
}

impl ImageMime {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageMime::Jpeg => "image/jpeg",
            ImageMime::Png => "image/png",
            ImageMime::Gif => "image/gif",
            ImageMime::Webp => "image/webp",
        }
    }

    /// Identify the format from the leading magic bytes; the client-supplied
    /// content type is never trusted.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageMime::Jpeg)
        } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageMime::Png)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageMime::Gif)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageMime::Webp)
        } else {
            None
        }
    }

    /// Validate an uploaded image and return its detected format.
    pub fn validate_upload(bytes: &[u8]) -> Result<Self, DomainError> {
        if bytes.is_empty() {
            return Err(DomainError::validation("image file required"));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(DomainError::validation("image exceeds 5 MiB"));
        }
        Self::sniff(bytes)
            .ok_or_else(|| DomainError::validation("unsupported image format (jpeg, png, gif, webp)"))
    }
}

impl FromStr for ImageMime {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image/jpeg" => Ok(ImageMime::Jpeg),
            "image/png" => Ok(ImageMime::Png),
            "image/gif" => Ok(ImageMime::Gif),
            "image/webp" => Ok(ImageMime::Webp),
            other => Err(DomainError::validation(format!("unsupported image type '{other}'"))),
        }
    }
}

impl core::fmt::Display for ImageMime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            ItemStatus::Active,
            ItemStatus::Damaged,
            ItemStatus::Lost,
            ItemStatus::Removed,
        ] {
            assert_eq!(status.as_str().parse::<ItemStatus>().unwrap(), status);
        }
        assert!("retired".parse::<ItemStatus>().is_err());
    }

    #[test]
    fn sniffs_supported_formats() {
        assert_eq!(ImageMime::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageMime::Jpeg));
        assert_eq!(ImageMime::sniff(b"\x89PNG\r\n\x1a\n...."), Some(ImageMime::Png));
        assert_eq!(ImageMime::sniff(b"GIF89a...."), Some(ImageMime::Gif));
        assert_eq!(ImageMime::sniff(b"RIFF\0\0\0\0WEBPVP8 "), Some(ImageMime::Webp));
        assert_eq!(ImageMime::sniff(b"<svg></svg>"), None);
    }

    #[test]
    fn upload_validation_rejects_empty_and_oversized() {
        assert!(ImageMime::validate_upload(&[]).is_err());

        let mut big = vec![0u8; MAX_IMAGE_BYTES + 1];
        big[..3].copy_from_slice(&[0xFF, 0xD8, 0xFF]);
        assert!(ImageMime::validate_upload(&big).is_err());
    }
}
