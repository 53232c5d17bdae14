//! Turns a user-edited catalog into the sync plan.
//!
//! Unknown streams are skipped with a warning. A selected stream whose
//! requirements are not selected fails the whole run. The plan holds at most
//! one primary stream, with its selected dependents attached to it.

use rescue_tap_types::catalog::{Catalog, CatalogEntry};

use crate::error::{Result, TapError};
use crate::streams::{StreamDescriptor, StreamRegistry};

/// A selected stream paired with the catalog entry that selected it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStream {
    pub descriptor: StreamDescriptor,
    pub entry: CatalogEntry,
}

impl PlannedStream {
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.descriptor.table_name
    }
}

/// Primary stream and the dependents that run off its identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryPlan {
    pub stream: PlannedStream,
    pub dependents: Vec<PlannedStream>,
}

/// Streams to run this sync. Empty when no primary is selected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPlan {
    pub primary: Option<PrimaryPlan>,
}

impl SyncPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primary.is_none()
    }

    /// Stream names in execution order.
    #[must_use]
    pub fn stream_names(&self) -> Vec<&'static str> {
        let Some(primary) = &self.primary else {
            return Vec::new();
        };
        std::iter::once(primary.stream.name())
            .chain(primary.dependents.iter().map(PlannedStream::name))
            .collect()
    }
}

/// Resolve `catalog` against `registry`.
///
/// # Errors
///
/// [`TapError::RequirementsNotMet`] naming the missing streams, or
/// [`TapError::MultiplePrimaries`] if two distinct primary streams are
/// selected.
pub fn resolve_plan(catalog: &Catalog, registry: &StreamRegistry) -> Result<SyncPlan> {
    let mut primary: Option<PlannedStream> = None;
    let mut dependents: Vec<PlannedStream> = Vec::new();

    for entry in &catalog.streams {
        if !entry.is_selected() {
            tracing::info!(stream = %entry.stream, "Stream not marked selected, skipping");
            continue;
        }

        let Some(descriptor) = registry.find_for_entry(entry) else {
            tracing::warn!(stream = %entry.stream, "Skipping unknown stream in catalog");
            continue;
        };

        let missing = descriptor.missing_requirements(catalog);
        if !missing.is_empty() {
            return Err(TapError::RequirementsNotMet {
                stream: descriptor.table_name.to_string(),
                missing,
            });
        }

        let planned = PlannedStream {
            descriptor: *descriptor,
            entry: entry.clone(),
        };

        if descriptor.is_primary() {
            match primary.as_ref().map(PlannedStream::name) {
                Some(existing) if existing == planned.name() => {
                    tracing::warn!(stream = existing, "Ignoring duplicate catalog entry");
                }
                Some(existing) => {
                    return Err(TapError::MultiplePrimaries {
                        first: existing.to_string(),
                        second: planned.name().to_string(),
                    });
                }
                None => primary = Some(planned),
            }
        } else if dependents.iter().any(|d| d.name() == planned.name()) {
            tracing::warn!(stream = planned.name(), "Ignoring duplicate catalog entry");
        } else {
            dependents.push(planned);
        }
    }

    let Some(stream) = primary else {
        if !dependents.is_empty() {
            tracing::warn!(
                dependents = dependents.len(),
                "Dependent streams selected without a primary stream; nothing to sync"
            );
        }
        return Ok(SyncPlan::default());
    };

    tracing::info!(
        primary = stream.name(),
        dependents = dependents.len(),
        "Resolved sync plan"
    );
    Ok(SyncPlan {
        primary: Some(PrimaryPlan { stream, dependents }),
    })
}
