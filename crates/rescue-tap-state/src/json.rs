//! Singer-JSON-backed implementation of [`StateBackend`].
//!
//! The state file is read once at startup. Updates stay in memory; they
//! reach the outside world as STATE messages written by the emitter.

use std::path::Path;

use rescue_tap_types::state::{Bookmark, StreamName, TapState};

use crate::backend::StateBackend;
use crate::error;

/// In-memory state seeded from an optional Singer state file.
///
/// Create with [`JsonStateBackend::open`] for a file given on the command
/// line or [`JsonStateBackend::in_memory`] when the run starts fresh.
#[derive(Debug, Clone, Default)]
pub struct JsonStateBackend {
    state: TapState,
}

impl JsonStateBackend {
    /// Load a state document from `path`.
    ///
    /// An empty file is treated as an empty state.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`](crate::StateError::Io) if the file can't
    /// be read, or [`StateError::Json`](crate::StateError::Json) if it is
    /// not a state document.
    pub fn open(path: &Path) -> error::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let backend = Self::from_json(&raw)?;
        tracing::info!(
            path = %path.display(),
            bookmarks = backend.state.bookmarks.len(),
            "Loaded state file"
        );
        Ok(backend)
    }

    /// Parse a state document from a string.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Json`](crate::StateError::Json) on malformed input.
    pub fn from_json(raw: &str) -> error::Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::in_memory());
        }
        let state: TapState = serde_json::from_str(raw)?;
        Ok(Self { state })
    }

    /// Empty state.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }
}

impl From<TapState> for JsonStateBackend {
    fn from(state: TapState) -> Self {
        Self { state }
    }
}

impl StateBackend for JsonStateBackend {
    fn get_bookmark(&self, stream: &StreamName) -> Option<Bookmark> {
        self.state.bookmark(stream).cloned()
    }

    fn set_bookmark(&mut self, stream: &StreamName, bookmark: Bookmark) {
        tracing::debug!(
            stream = stream.as_str(),
            last_synced_until = bookmark.last_synced_until.as_deref(),
            "Bookmark advanced"
        );
        self.state
            .bookmarks
            .insert(stream.as_str().to_string(), bookmark);
    }

    fn set_currently_syncing(&mut self, stream: Option<&StreamName>) {
        self.state.currently_syncing = stream.map(|s| s.as_str().to_string());
    }

    fn snapshot(&self) -> TapState {
        self.state.clone()
    }
}
