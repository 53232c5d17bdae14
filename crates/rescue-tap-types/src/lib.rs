//! Shared model types for the LogMeIn Rescue tap.
//!
//! Pure data: catalog and JSON Schema types, the structured connector error,
//! bookmark state and the Singer message envelope. No I/O lives here.

pub mod catalog;
pub mod error;
pub mod message;
pub mod state;
