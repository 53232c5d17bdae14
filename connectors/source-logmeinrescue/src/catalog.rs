//! Catalog assembly for discovery output.

use rescue_tap_types::catalog::{Catalog, CatalogEntry, Inclusion, Metadata, MetadataEntry};

use crate::schema::SchemaFragment;
use crate::streams::StreamDescriptor;

/// Pair a descriptor's static schema with optional inferred fields.
///
/// Static fields win: an inferred field with a static name is dropped with
/// a warning. Entries are never selected here.
#[must_use]
pub fn build_entry(descriptor: &StreamDescriptor, inferred: Option<&SchemaFragment>) -> CatalogEntry {
    let mut schema = descriptor.static_schema();

    for (name, field) in inferred.into_iter().flat_map(|f| f.iter()) {
        if schema.properties.contains_key(name) {
            tracing::warn!(
                stream = descriptor.table_name,
                field = name,
                "Inferred field collides with a static field; keeping the static definition"
            );
            continue;
        }
        schema
            .properties
            .insert(name.to_string(), field.clone().with_inclusion(Inclusion::Available));
    }

    let key_properties: Vec<String> = descriptor
        .key_properties
        .iter()
        .map(|k| (*k).to_string())
        .collect();

    let mut metadata = vec![MetadataEntry::stream(Metadata {
        table_key_properties: Some(key_properties.clone()),
        ..Metadata::default()
    })];
    metadata.extend(schema.properties.iter().map(|(name, field)| {
        MetadataEntry::field(
            name,
            Metadata {
                inclusion: field.inclusion,
                ..Metadata::default()
            },
        )
    }));

    CatalogEntry {
        tap_stream_id: descriptor.table_name.to_string(),
        stream: descriptor.table_name.to_string(),
        key_properties,
        schema,
        metadata,
    }
}

/// Concatenate entries with every primary ahead of every dependent.
///
/// The partition is stable, so relative order within each group is kept.
/// Entries are matched to descriptors by table name; entries without a
/// descriptor count as dependents.
#[must_use]
pub fn build_catalog(
    entries: impl IntoIterator<Item = CatalogEntry>,
    descriptors: &[StreamDescriptor],
) -> Catalog {
    let is_primary = |entry: &CatalogEntry| {
        descriptors
            .iter()
            .any(|d| d.is_primary() && d.matches_catalog_entry(entry))
    };
    let (mut streams, dependents): (Vec<_>, Vec<_>) = entries.into_iter().partition(is_primary);
    streams.extend(dependents);
    Catalog { streams }
}
