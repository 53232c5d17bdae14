//! Tap error taxonomy.
//!
//! Every fatal condition is one [`TapError`] variant; the binary logs it
//! once and exits non-zero. Unknown catalog streams are not errors.

use rescue_tap_state::StateError;
use rescue_tap_types::error::ConnectorError;

/// Fatal tap error.
#[derive(Debug, thiserror::Error)]
pub enum TapError {
    /// One or more required config keys are absent or empty.
    #[error("config is missing required key(s): {}", .0.join(", "))]
    MissingConfigKeys(Vec<String>),

    /// Config is present but unusable.
    #[error("invalid config: {0}")]
    Config(String),

    /// Remote API failure (network, auth, malformed payload).
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    /// A selected stream needs streams that are not selected.
    #[error("{stream} requires that the following are selected: {}", .missing.join(", "))]
    RequirementsNotMet { stream: String, missing: Vec<String> },

    /// A dependent stream has no parent identifiers to sample.
    #[error("cannot infer schema for '{stream}': no parent identifiers available")]
    NoIdentifiers { stream: String },

    /// Every parent identifier returned an empty response.
    #[error(
        "cannot infer schema for '{stream}': no response obtained from {attempted} parent identifier(s)"
    )]
    NoSample { stream: String, attempted: usize },

    /// More than one distinct primary stream is selected.
    #[error("only one primary stream may be selected, found '{first}' and '{second}'")]
    MultiplePrimaries { first: String, second: String },

    /// The stream registry has no primary stream.
    #[error("no primary stream is registered")]
    UnknownPrimary,

    /// A dependent-only operation was given a primary stream.
    #[error("stream '{0}' is not a dependent stream")]
    NotDependent(String),

    /// A stored bookmark is not a timestamp.
    #[error("invalid bookmark for '{stream}': '{value}' is not an RFC 3339 timestamp")]
    InvalidBookmark { stream: String, value: String },

    #[error(transparent)]
    State(#[from] StateError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, TapError>;
