//! Bookmark state model.
//!
//! Serialized in the Singer state layout:
//! `{"bookmarks": {"<stream>": {...}}, "currently_syncing": "<stream>"}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque stream name (e.g. `"technicians"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamName(String);

impl StreamName {
    /// Create a new stream name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StreamName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S: Into<String>> From<S> for StreamName {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

/// Per-stream sync position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    /// RFC 3339 end of the last fully emitted sync window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_until: Option<String>,
    /// Keys written by other tools; preserved untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Bookmark {
    /// Bookmark pointing at the end of a completed window.
    #[must_use]
    pub fn synced_until(value: impl Into<String>) -> Self {
        Self {
            last_synced_until: Some(value.into()),
            extra: Map::new(),
        }
    }
}

/// Whole-run state document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapState {
    #[serde(default)]
    pub bookmarks: BTreeMap<String, Bookmark>,
    /// Stream in flight when the state was written, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currently_syncing: Option<String>,
}

impl TapState {
    /// Bookmark for `stream`, if any.
    #[must_use]
    pub fn bookmark(&self, stream: &StreamName) -> Option<&Bookmark> {
        self.bookmarks.get(stream.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_name_from_and_display() {
        let sn = StreamName::from("technicians");
        assert_eq!(sn.as_str(), "technicians");
        assert_eq!(sn.to_string(), "technicians");
    }

    #[test]
    fn stream_name_serde_transparent() {
        let json = serde_json::to_string(&StreamName::new("technicians")).unwrap();
        assert_eq!(json, "\"technicians\"");
    }

    #[test]
    fn empty_document_parses() {
        let state: TapState = serde_json::from_str("{}").unwrap();
        assert!(state.bookmarks.is_empty());
        assert!(state.currently_syncing.is_none());
    }

    #[test]
    fn bookmark_preserves_foreign_keys() {
        let state: TapState = serde_json::from_value(serde_json::json!({
            "bookmarks": {
                "technician_custom_fields": {
                    "last_synced_until": "2024-03-01T00:00:00Z",
                    "note": "kept"
                }
            }
        }))
        .unwrap();
        let bm = state
            .bookmark(&StreamName::new("technician_custom_fields"))
            .unwrap();
        assert_eq!(bm.last_synced_until.as_deref(), Some("2024-03-01T00:00:00Z"));
        assert_eq!(bm.extra["note"], "kept");
    }

    #[test]
    fn currently_syncing_skipped_when_none() {
        let json = serde_json::to_value(TapState::default()).unwrap();
        assert!(json.get("currently_syncing").is_none());
        assert_eq!(json["bookmarks"], serde_json::json!({}));
    }
}
