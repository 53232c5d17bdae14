//! Singer tap for LogMeIn Rescue.
//!
//! Replicates technicians from the account hierarchy and, per technician,
//! the custom-fields report. The custom-field columns differ between
//! deployments, so the schema of `technician_custom_fields` is inferred
//! from one live report during discovery.
//!
//! Discovery: [`discovery::discover`] resolves the primary stream, samples
//! each dependent and builds the catalog. Sync: [`selection::resolve_plan`]
//! turns a user-edited catalog into a plan that [`sync::SyncContext`] runs.

pub mod catalog;
pub mod client;
pub mod config;
pub mod dependent;
pub mod discovery;
pub mod emitter;
pub mod error;
pub mod primary;
pub mod report;
pub mod schema;
pub mod selection;
pub mod streams;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, TapError};
