//! Sync execution.
//!
//! Runs a [`SyncPlan`] strictly in order: the primary stream is fully
//! fetched and emitted, then each dependent runs off the primary's
//! identifiers. A dependent's bookmark is committed only after all of its
//! records have been emitted, so a crash replays the window.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;

use rescue_tap_state::{JsonStateBackend, StateBackend};
use rescue_tap_types::catalog::CatalogEntry;
use rescue_tap_types::state::StreamName;

use crate::client::RescueApi;
use crate::config::parse_start_date;
use crate::dependent::DependentResolver;
use crate::emitter::RecordEmitter;
use crate::error::{Result, TapError};
use crate::primary::{IdentifierSet, PrimaryResolver};
use crate::report::{Record, SyncWindow};
use crate::selection::{PlannedStream, SyncPlan};

/// Records emitted per stream, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub records: IndexMap<String, u64>,
}

impl SyncSummary {
    #[must_use]
    pub fn total_records(&self) -> u64 {
        self.records.values().sum()
    }
}

/// State from a previous run, or empty state when no file is given.
///
/// # Errors
///
/// [`TapError::State`] if the file can't be read or is not a state document.
pub fn load_state(path: Option<&Path>) -> Result<JsonStateBackend> {
    match path {
        Some(path) => Ok(JsonStateBackend::open(path)?),
        None => Ok(JsonStateBackend::in_memory()),
    }
}

/// Everything a sync run touches.
///
/// `state` is the only mutable run state; only the stream currently
/// executing writes to it.
pub struct SyncContext<'a> {
    pub client: &'a dyn RescueApi,
    pub state: &'a mut dyn StateBackend,
    pub emitter: &'a mut dyn RecordEmitter,
    /// Window start for streams without a bookmark.
    pub start_date: DateTime<Utc>,
    /// Window end for every stream this run.
    pub run_started_at: DateTime<Utc>,
}

/// Keep only the fields `entry` selects.
fn project(entry: &CatalogEntry, record: Record) -> Record {
    record
        .into_iter()
        .filter(|(field, _)| entry.is_field_selected(field))
        .collect()
}

impl SyncContext<'_> {
    /// Execute `plan`.
    ///
    /// # Errors
    ///
    /// Any transport, bookmark or output error aborts the run. Bookmarks
    /// already committed stay committed.
    pub async fn run(&mut self, plan: &SyncPlan) -> Result<SyncSummary> {
        let mut summary = SyncSummary::default();
        let Some(primary) = &plan.primary else {
            tracing::info!("No primary stream selected; nothing to sync");
            return Ok(summary);
        };

        let identifiers = self.sync_primary(&primary.stream, &mut summary).await?;
        for dependent in &primary.dependents {
            self.sync_dependent(dependent, &identifiers, &mut summary)
                .await?;
        }

        self.state.set_currently_syncing(None);
        self.emitter.write_state(&self.state.snapshot())?;

        tracing::info!(
            streams = summary.records.len(),
            records = summary.total_records(),
            "Sync complete"
        );
        Ok(summary)
    }

    fn emit_stream(
        &mut self,
        planned: &PlannedStream,
        records: Vec<Record>,
        summary: &mut SyncSummary,
    ) -> Result<()> {
        let stream = planned.name();
        let count = records.len() as u64;
        self.emitter.write_schema(
            stream,
            &planned.entry.projected_schema(),
            &planned.entry.key_properties,
        )?;
        for record in records {
            self.emitter
                .write_record(stream, project(&planned.entry, record))?;
        }
        *summary.records.entry(stream.to_string()).or_default() += count;
        tracing::info!(stream, records = count, "Emitted stream");
        Ok(())
    }

    async fn sync_primary(
        &mut self,
        planned: &PlannedStream,
        summary: &mut SyncSummary,
    ) -> Result<IdentifierSet> {
        let name = StreamName::new(planned.name());
        self.state.set_currently_syncing(Some(&name));

        let fetch = PrimaryResolver::new(self.client, &planned.descriptor)
            .fetch_all()
            .await?;
        self.emit_stream(planned, fetch.records, summary)?;
        Ok(fetch.identifiers)
    }

    fn window_for(&self, name: &StreamName) -> Result<SyncWindow> {
        let start = match self
            .state
            .get_bookmark(name)
            .and_then(|b| b.last_synced_until)
        {
            Some(raw) => parse_start_date(&raw).map_err(|_| TapError::InvalidBookmark {
                stream: name.to_string(),
                value: raw.clone(),
            })?,
            None => self.start_date,
        };
        Ok(SyncWindow::new(start, self.run_started_at))
    }

    async fn sync_dependent(
        &mut self,
        planned: &PlannedStream,
        identifiers: &IdentifierSet,
        summary: &mut SyncSummary,
    ) -> Result<()> {
        let name = StreamName::new(planned.name());
        self.state.set_currently_syncing(Some(&name));

        let window = self.window_for(&name)?;
        if window.start >= window.end {
            tracing::info!(
                stream = %name,
                since = %window.start.to_rfc3339(),
                "Bookmark is at or past run start; nothing to fetch"
            );
            return Ok(());
        }
        tracing::info!(
            stream = %name,
            start = %window.start.to_rfc3339(),
            end = %window.end.to_rfc3339(),
            parents = identifiers.len(),
            "Syncing dependent stream"
        );

        let records = DependentResolver::new(self.client, &planned.descriptor, window)?
            .fetch_all(identifiers)
            .await?;
        self.emit_stream(planned, records, summary)?;

        let mut bookmark = self.state.get_bookmark(&name).unwrap_or_default();
        bookmark.last_synced_until =
            Some(window.end.to_rfc3339_opts(SecondsFormat::Secs, true));
        self.state.set_bookmark(&name, bookmark);
        self.emitter.write_state(&self.state.snapshot())?;
        Ok(())
    }
}
