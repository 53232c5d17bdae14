//! State backend trait definition.
//!
//! [`StateBackend`] is the single mutable run-scoped object threaded through
//! a sync. Model types live in [`rescue_tap_types::state`].

use rescue_tap_types::state::{Bookmark, StreamName, TapState};

/// Storage contract for sync bookmarks.
///
/// Only the stream currently being synced writes, and only after its
/// records have been emitted.
pub trait StateBackend {
    /// Read the bookmark for `stream`.
    ///
    /// Returns `None` when nothing has been recorded yet.
    fn get_bookmark(&self, stream: &StreamName) -> Option<Bookmark>;

    /// Replace the bookmark for `stream`.
    fn set_bookmark(&mut self, stream: &StreamName, bookmark: Bookmark);

    /// Mark `stream` as in flight, or clear the marker with `None`.
    fn set_currently_syncing(&mut self, stream: Option<&StreamName>);

    /// Full state document as it stands now.
    fn snapshot(&self) -> TapState;
}
