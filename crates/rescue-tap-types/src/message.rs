//! Singer message envelope written to stdout during sync.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::catalog::Schema;
use crate::state::TapState;

/// One line of Singer output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Announces a stream's schema before its first record.
    Schema {
        stream: String,
        schema: Schema,
        key_properties: Vec<String>,
    },
    /// A single extracted row.
    Record {
        stream: String,
        record: Map<String, Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_extracted: Option<String>,
    },
    /// Checkpoint of the run state.
    State { value: TapState },
}
