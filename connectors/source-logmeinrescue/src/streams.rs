//! Static stream descriptors and the registry of available streams.
//!
//! Each descriptor names its table, the tables it requires, its static
//! fields and key properties. Whether a stream is the primary entity is an
//! explicit [`StreamRole`], not implied by its name.

use indexmap::IndexMap;

use rescue_tap_types::catalog::{Catalog, CatalogEntry, Inclusion, Schema};

use crate::report::ReportArea;

/// How a stream is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamRole {
    /// Fetched on its own; its key values feed dependents.
    Primary,
    /// Fetched once per parent identifier from a report area.
    Dependent(ReportArea),
}

/// JSON type of a static field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Integer,
    String,
}

/// One statically known field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub nullable: bool,
}

impl FieldSpec {
    const fn new(name: &'static str, field_type: FieldType, nullable: bool) -> Self {
        Self {
            name,
            field_type,
            nullable,
        }
    }

    fn schema(&self) -> Schema {
        match self.field_type {
            FieldType::Integer => Schema::integer(self.nullable),
            FieldType::String => Schema::string(self.nullable),
        }
    }
}

/// Static metadata for one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamDescriptor {
    pub table_name: &'static str,
    pub role: StreamRole,
    /// Tables that must be selected alongside this one.
    pub requires: &'static [&'static str],
    pub fields: &'static [FieldSpec],
    pub key_properties: &'static [&'static str],
}

impl StreamDescriptor {
    #[must_use]
    pub const fn is_primary(&self) -> bool {
        matches!(self.role, StreamRole::Primary)
    }

    /// Whether `entry` describes this stream.
    #[must_use]
    pub fn matches_catalog_entry(&self, entry: &CatalogEntry) -> bool {
        entry.stream == self.table_name
    }

    /// Required tables with no selected entry in `catalog`, in declaration order.
    #[must_use]
    pub fn missing_requirements(&self, catalog: &Catalog) -> Vec<String> {
        self.requires
            .iter()
            .filter(|table| !catalog.is_selected(table))
            .map(|table| (*table).to_string())
            .collect()
    }

    /// Whether every required table is selected in `catalog`.
    #[must_use]
    pub fn requirements_met(&self, catalog: &Catalog) -> bool {
        self.missing_requirements(catalog).is_empty()
    }

    /// Whether `field` is one of the static fields.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.name == field)
    }

    /// Object schema over the static fields. Key properties are `automatic`.
    #[must_use]
    pub fn static_schema(&self) -> Schema {
        let properties: IndexMap<String, Schema> = self
            .fields
            .iter()
            .map(|f| {
                let inclusion = if self.key_properties.contains(&f.name) {
                    Inclusion::Automatic
                } else {
                    Inclusion::Available
                };
                (f.name.to_string(), f.schema().with_inclusion(inclusion))
            })
            .collect();
        Schema::object(properties)
    }
}

/// Technicians from the account hierarchy.
pub const TECHNICIANS: StreamDescriptor = StreamDescriptor {
    table_name: "technicians",
    role: StreamRole::Primary,
    requires: &[],
    fields: &[
        FieldSpec::new("id", FieldType::Integer, false),
        FieldSpec::new("name", FieldType::String, true),
        FieldSpec::new("nickname", FieldType::String, true),
        FieldSpec::new("email", FieldType::String, true),
        FieldSpec::new("type", FieldType::String, true),
        FieldSpec::new("status", FieldType::String, true),
        FieldSpec::new("description", FieldType::String, true),
        FieldSpec::new("parent_id", FieldType::Integer, true),
    ],
    key_properties: &["id"],
};

/// Per-technician custom-field report rows. Columns beyond
/// `technician_id` are discovered from a live report.
pub const TECHNICIAN_CUSTOM_FIELDS: StreamDescriptor = StreamDescriptor {
    table_name: "technician_custom_fields",
    role: StreamRole::Dependent(ReportArea::CustomFields),
    requires: &["technicians"],
    fields: &[FieldSpec::new("technician_id", FieldType::Integer, false)],
    key_properties: &[],
};

/// Every stream the tap can replicate, primary first.
pub const AVAILABLE_STREAMS: &[StreamDescriptor] = &[TECHNICIANS, TECHNICIAN_CUSTOM_FIELDS];

/// Field injected into dependent records with the parent identifier.
pub const PARENT_ID_FIELD: &str = "technician_id";

/// Lookup of descriptors by table name, in registration order.
#[derive(Debug, Clone)]
pub struct StreamRegistry {
    by_name: IndexMap<&'static str, StreamDescriptor>,
}

impl StreamRegistry {
    /// Registry over `streams`. A later duplicate table name replaces the
    /// earlier descriptor.
    #[must_use]
    pub fn new(streams: &[StreamDescriptor]) -> Self {
        Self {
            by_name: streams.iter().map(|s| (s.table_name, *s)).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, table_name: &str) -> Option<&StreamDescriptor> {
        self.by_name.get(table_name)
    }

    /// Descriptor whose table matches `entry`.
    #[must_use]
    pub fn find_for_entry(&self, entry: &CatalogEntry) -> Option<&StreamDescriptor> {
        self.by_name.values().find(|d| d.matches_catalog_entry(entry))
    }

    /// The primary stream, if one is registered.
    #[must_use]
    pub fn primary(&self) -> Option<&StreamDescriptor> {
        self.by_name.values().find(|d| d.is_primary())
    }

    /// Dependent streams in registration order.
    pub fn dependents(&self) -> impl Iterator<Item = &StreamDescriptor> {
        self.by_name.values().filter(|d| !d.is_primary())
    }

    pub fn iter(&self) -> impl Iterator<Item = &StreamDescriptor> {
        self.by_name.values()
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new(AVAILABLE_STREAMS)
    }
}
