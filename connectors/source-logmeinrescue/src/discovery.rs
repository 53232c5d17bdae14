//! Discovery: resolve the primary stream, sample every dependent and emit
//! the catalog.

use std::io::Write;

use serde::Serialize;

use rescue_tap_types::catalog::Catalog;

use crate::catalog::{build_catalog, build_entry};
use crate::client::RescueApi;
use crate::dependent::DependentResolver;
use crate::error::{Result, TapError};
use crate::primary::PrimaryResolver;
use crate::report::SyncWindow;
use crate::schema::infer_schema;
use crate::streams::{StreamDescriptor, StreamRegistry};

/// Build the catalog for every registered stream.
///
/// The primary is fully resolved before any dependent is sampled. Each
/// dependent takes exactly one sample response over `window`.
///
/// # Errors
///
/// Fails if the registry has no primary, on any transport error, or when a
/// dependent cannot obtain a sample.
pub async fn discover(
    client: &dyn RescueApi,
    registry: &StreamRegistry,
    window: SyncWindow,
) -> Result<Catalog> {
    let primary = registry.primary().ok_or(TapError::UnknownPrimary)?;
    tracing::info!(stream = primary.table_name, "Discovering primary stream");

    let fetch = PrimaryResolver::new(client, primary).fetch_all().await?;
    let mut entries = vec![build_entry(primary, None)];

    for descriptor in registry.dependents() {
        tracing::info!(
            stream = descriptor.table_name,
            candidates = fetch.identifiers.len(),
            "Sampling dependent stream"
        );
        let sample = DependentResolver::new(client, descriptor, window)?
            .fetch_sample(&fetch.identifiers)
            .await?;
        let fragment = infer_schema(&sample);
        tracing::info!(
            stream = descriptor.table_name,
            fields = fragment.len(),
            "Inferred dependent schema"
        );
        entries.push(build_entry(descriptor, Some(&fragment)));
    }

    let descriptors: Vec<StreamDescriptor> = registry.iter().copied().collect();
    let catalog = build_catalog(entries, &descriptors);
    tracing::info!(streams = catalog.streams.len(), "Discovery complete");
    Ok(catalog)
}

/// Pretty-print `catalog` with 4-space indentation, followed by a newline.
///
/// # Errors
///
/// Returns [`TapError::Json`] or [`TapError::Io`] if writing fails.
pub fn write_catalog<W: Write>(catalog: &Catalog, mut writer: W) -> Result<()> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut writer, formatter);
    catalog.serialize(&mut ser)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;
    use crate::client::TechnicianPage;
    use crate::streams::{TECHNICIANS, TECHNICIAN_CUSTOM_FIELDS};
    use crate::testing::MockApi;

    fn window() -> SyncWindow {
        SyncWindow::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        )
    }

    fn technicians(ids: &[i64]) -> MockApi {
        MockApi::new().with_pages(vec![TechnicianPage {
            records: ids
                .iter()
                .map(|id| json!({"id": id}).as_object().cloned().unwrap())
                .collect(),
            next_page: None,
        }])
    }

    #[tokio::test]
    async fn discovers_primary_and_sampled_dependent() {
        let api = technicians(&[101, 102]).with_report(102, "field_1\tfield_2\nx\ty\n");

        let catalog = discover(&api, &StreamRegistry::default(), window())
            .await
            .unwrap();

        let names: Vec<&str> = catalog.streams.iter().map(|e| e.stream.as_str()).collect();
        assert_eq!(names, vec!["technicians", "technician_custom_fields"]);

        let custom = &catalog.streams[1].schema.properties;
        let fields: Vec<&str> = custom.keys().map(String::as_str).collect();
        assert_eq!(fields, vec!["technician_id", "field_1", "field_2"]);
        assert!(custom["field_1"].schema_type.as_ref().unwrap().includes("string"));

        assert_eq!(api.report_calls(), vec![101, 102]);
        assert!(catalog.streams.iter().all(|e| !e.is_selected()));
    }

    #[tokio::test]
    async fn no_technicians_fails_discovery() {
        let api = MockApi::new();
        let err = discover(&api, &StreamRegistry::default(), window())
            .await
            .unwrap_err();
        assert!(matches!(err, TapError::NoIdentifiers { ref stream } if stream == "technician_custom_fields"));
    }

    #[tokio::test]
    async fn primary_only_registry_skips_sampling() {
        let api = technicians(&[1]);
        let catalog = discover(&api, &StreamRegistry::new(&[TECHNICIANS]), window())
            .await
            .unwrap();
        assert_eq!(catalog.streams.len(), 1);
        assert!(api.report_calls().is_empty());
    }

    #[tokio::test]
    async fn registry_without_primary_is_an_error() {
        let api = MockApi::new();
        let err = discover(&api, &StreamRegistry::new(&[TECHNICIAN_CUSTOM_FIELDS]), window())
            .await
            .unwrap_err();
        assert!(matches!(err, TapError::UnknownPrimary));
    }

    #[test]
    fn catalog_written_with_four_space_indent() {
        let catalog = build_catalog(vec![build_entry(&TECHNICIANS, None)], &[TECHNICIANS]);
        let mut out = Vec::new();
        write_catalog(&catalog, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("{\n    \"streams\": [\n        {"));
        assert!(text.ends_with("}\n"));
        let back: Catalog = serde_json::from_str(&text).unwrap();
        assert_eq!(back, catalog);
    }
}
