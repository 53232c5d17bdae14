//! State backend error types.

/// Errors produced by [`StateBackend`](crate::StateBackend) operations.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// File-system I/O failure reading the state file.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// State file is not a valid Singer state document.
    #[error("invalid state document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, StateError>;
