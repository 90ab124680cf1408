//! Record types
//!
//! The image metadata stored per group and the group summary handed back
//! to callers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Image extensions the surrounding tools pick up when listing a directory
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["gif", "jpeg", "jpg", "png", "swf"];

/// Content rating of an image, as understood by the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rating {
    #[default]
    Unknown,
    Safe,
    Questionable,
    Explicit,
}

impl Rating {
    /// One-letter code used by the board's bulk format (`""` for unknown)
    pub fn code(&self) -> &'static str {
        match self {
            Rating::Unknown => "",
            Rating::Safe => "s",
            Rating::Questionable => "q",
            Rating::Explicit => "e",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown rating {0:?}, expected one of s, q, e")]
pub struct ParseRatingError(String);

impl FromStr for Rating {
    type Err = ParseRatingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "unknown" => Ok(Rating::Unknown),
            "s" | "safe" => Ok(Rating::Safe),
            "q" | "questionable" => Ok(Rating::Questionable),
            "e" | "explicit" => Ok(Rating::Explicit),
            _ => Err(ParseRatingError(s.to_string())),
        }
    }
}

/// Metadata of one tagged picture
///
/// `id` and `added` are owned by the store: whatever the caller puts there
/// is replaced by `add_image` and ignored by `update_image`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Image {
    pub id: u64,
    pub name: String,
    /// Space-separated tag list
    pub tags: String,
    pub source: String,
    pub rating: Rating,
    pub added: Option<DateTime<Utc>>,
    /// `None` until the first update
    pub updated: Option<DateTime<Utc>>,
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub hash: String,
    pub ext: String,
}

/// Snapshot of a group's membership
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    /// Sum of the contained images' sizes
    pub size: u64,
    /// Contained image IDs, ascending
    pub images: Vec<u64>,
}

impl Group {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }
}

/// Persisted form of a group: the public summary plus bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub name: String,
    /// Creation order across all groups
    pub order: u64,
    /// Highest image ID ever assigned in this group
    pub last_id: u64,
    pub size: u64,
    pub images: Vec<u64>,
}

impl GroupRecord {
    pub fn new(name: impl Into<String>, order: u64) -> Self {
        Self {
            name: name.into(),
            order,
            last_id: 0,
            size: 0,
            images: Vec::new(),
        }
    }

    pub fn to_group(&self) -> Group {
        Group {
            name: self.name.clone(),
            size: self.size,
            images: self.images.clone(),
        }
    }
}
