//! Parsed search result records.

use serde::{Deserialize, Serialize};

/// A single image result parsed from the feed markup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Source address of the image; never empty
    locator: String,

    /// Whatever metadata the feed rendered next to the image
    #[serde(default)]
    pub raw_metadata: serde_json::Value,
}

impl ResultRecord {
    /// Create a record, returning `None` when the locator is blank
    pub fn new(locator: impl Into<String>, raw_metadata: serde_json::Value) -> Option<Self> {
        let locator = locator.into().trim().to_string();
        if locator.is_empty() {
            return None;
        }

        Some(Self {
            locator,
            raw_metadata,
        })
    }

    /// Create a record with no metadata
    pub fn from_locator(locator: impl Into<String>) -> Option<Self> {
        Self::new(locator, serde_json::Value::Null)
    }

    /// The image source address, used as the dedup key
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Declared image type, if the feed reported one (e.g. "jpg")
    pub fn declared_type(&self) -> Option<&str> {
        self.raw_metadata
            .get("ity")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Title of the page hosting the image, if known
    pub fn title(&self) -> Option<&str> {
        self.raw_metadata.get("pt").and_then(|v| v.as_str())
    }
}
