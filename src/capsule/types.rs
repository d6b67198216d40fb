use serde::{Deserialize, Serialize};

use crate::era::Era;

/// A saved narrative, matching the `capsules` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeCapsule {
    /// UUID v7, so ids sort by creation time.
    pub id: String,
    pub location: String,
    pub era: Era,
    pub content: String,
    /// RFC 3339 timestamp.
    pub created_at: String,
}

/// Input to [`CapsuleStore::add`](super::CapsuleStore::add).
#[derive(Debug, Clone, PartialEq)]
pub struct NewCapsule {
    pub location: String,
    pub era: Era,
    pub content: String,
}

impl NewCapsule {
    pub fn new(location: impl Into<String>, era: Era, content: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            era,
            content: content.into(),
        }
    }
}
