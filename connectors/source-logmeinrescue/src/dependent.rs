//! Dependent stream resolution.
//!
//! A dependent stream is fetched once per parent identifier. Discovery only
//! needs one sample response; sync needs every response.

use rescue_tap_types::error::ConnectorError;
use serde_json::Value;

use crate::client::RescueApi;
use crate::error::{Result, TapError};
use crate::primary::{IdentifierSet, TechnicianId};
use crate::report::{Record, Report, ReportArea, SyncWindow};
use crate::streams::{StreamDescriptor, StreamRole, PARENT_ID_FIELD};

/// Fetches one dependent stream through a [`RescueApi`].
pub struct DependentResolver<'a> {
    client: &'a dyn RescueApi,
    descriptor: &'a StreamDescriptor,
    area: ReportArea,
    window: SyncWindow,
}

impl std::fmt::Debug for DependentResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependentResolver")
            .field("stream", &self.descriptor.table_name)
            .field("area", &self.area)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl<'a> DependentResolver<'a> {
    /// # Errors
    ///
    /// Returns [`TapError::NotDependent`] for a primary descriptor.
    pub fn new(
        client: &'a dyn RescueApi,
        descriptor: &'a StreamDescriptor,
        window: SyncWindow,
    ) -> Result<Self> {
        let StreamRole::Dependent(area) = descriptor.role else {
            return Err(TapError::NotDependent(descriptor.table_name.to_string()));
        };
        Ok(Self {
            client,
            descriptor,
            area,
            window,
        })
    }

    async fn fetch_one(&self, id: TechnicianId) -> std::result::Result<Option<Report>, ConnectorError> {
        tracing::debug!(
            stream = self.descriptor.table_name,
            technician_id = id,
            "Fetching dependent report"
        );
        let report = self.client.fetch_report(self.area, id, &self.window).await?;
        Ok(report.filter(|r| !r.is_empty()))
    }

    /// First non-empty response, trying identifiers in order. No request is
    /// made after the first hit.
    ///
    /// # Errors
    ///
    /// [`TapError::NoIdentifiers`] on an empty set, [`TapError::NoSample`]
    /// when every identifier answers empty, or the transport error.
    pub async fn fetch_sample(&self, identifiers: &IdentifierSet) -> Result<Report> {
        let stream = self.descriptor.table_name;
        if identifiers.is_empty() {
            return Err(TapError::NoIdentifiers {
                stream: stream.to_string(),
            });
        }

        for (attempt, id) in identifiers.iter().enumerate() {
            if let Some(report) = self.fetch_one(id).await? {
                tracing::info!(
                    stream,
                    technician_id = id,
                    attempts = attempt + 1,
                    columns = report.header().len(),
                    "Obtained schema sample"
                );
                return Ok(report);
            }
        }

        Err(TapError::NoSample {
            stream: stream.to_string(),
            attempted: identifiers.len(),
        })
    }

    /// Every record for every identifier, concatenated in identifier order.
    /// Each record carries its parent id in `technician_id`.
    ///
    /// # Errors
    ///
    /// Propagates the first transport error.
    pub async fn fetch_all(&self, identifiers: &IdentifierSet) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        for id in identifiers.iter() {
            let Some(report) = self.fetch_one(id).await? else {
                continue;
            };
            let before = records.len();
            records.extend(report.records().map(|mut record| {
                record.insert(PARENT_ID_FIELD.to_string(), Value::from(id));
                record
            }));
            tracing::debug!(
                stream = self.descriptor.table_name,
                technician_id = id,
                records = records.len() - before,
                "Fetched dependent report"
            );
        }
        Ok(records)
    }
}
