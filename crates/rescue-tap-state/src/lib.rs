//! Run-scoped bookmark state for the LogMeIn Rescue tap.
//!
//! Provides the [`StateBackend`] trait and a [`JsonStateBackend`]
//! implementation that loads a Singer state file and tracks bookmark
//! updates in memory for the rest of the run.

#![warn(clippy::pedantic)]

pub mod backend;
pub mod error;
pub mod json;

pub use backend::StateBackend;
pub use error::StateError;
pub use json::JsonStateBackend;
