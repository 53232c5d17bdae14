//! Stream catalog and JSON Schema types.
//!
//! A [`Catalog`] is the set of [`CatalogEntry`] values the tap exposes during
//! discovery and reads back (user-edited) during sync. Selection lives on the
//! entry itself, either as `schema.selected` or as stream-level metadata.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON Schema `type` keyword: one type name or a union of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Union(Vec<String>),
}

impl SchemaType {
    /// `["null", name]`.
    #[must_use]
    pub fn nullable(name: &str) -> Self {
        Self::Union(vec!["null".to_string(), name.to_string()])
    }

    /// Whether `name` is one of the admitted types.
    #[must_use]
    pub fn includes(&self, name: &str) -> bool {
        match self {
            Self::Single(t) => t == name,
            Self::Union(ts) => ts.iter().any(|t| t == name),
        }
    }
}

/// Whether a field is always replicated or can be deselected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Inclusion {
    /// Always emitted, selection is ignored (key properties).
    Automatic,
    /// Emitted unless explicitly deselected.
    Available,
    /// Never emitted.
    Unsupported,
}

/// JSON Schema subset used by Singer catalogs.
///
/// `properties` keeps declaration order so discovery output is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,
    #[serde(
        rename = "additionalProperties",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inclusion: Option<Inclusion>,
    /// Selection flag set by the user (stream or field level).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
}

impl Schema {
    /// Object schema over the given properties.
    #[must_use]
    pub fn object(properties: IndexMap<String, Schema>) -> Self {
        Self {
            schema_type: Some(SchemaType::Single("object".to_string())),
            properties,
            additional_properties: Some(false),
            ..Self::default()
        }
    }

    /// Scalar schema of the given JSON type.
    #[must_use]
    pub fn scalar(type_name: &str, nullable: bool) -> Self {
        let schema_type = if nullable {
            SchemaType::nullable(type_name)
        } else {
            SchemaType::Single(type_name.to_string())
        };
        Self {
            schema_type: Some(schema_type),
            ..Self::default()
        }
    }

    /// Nullable-or-not string schema.
    #[must_use]
    pub fn string(nullable: bool) -> Self {
        Self::scalar("string", nullable)
    }

    /// Nullable-or-not integer schema.
    #[must_use]
    pub fn integer(nullable: bool) -> Self {
        Self::scalar("integer", nullable)
    }

    /// Same schema with `inclusion` set.
    #[must_use]
    pub fn with_inclusion(mut self, inclusion: Inclusion) -> Self {
        self.inclusion = Some(inclusion);
        self
    }
}

/// Metadata attached to a breadcrumb (`[]` for the stream, `["properties", name]` for fields).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(
        rename = "table-key-properties",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub table_key_properties: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inclusion: Option<Inclusion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
    #[serde(
        rename = "selected-by-default",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub selected_by_default: Option<bool>,
    /// Keys this tap does not interpret; preserved on round trip.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One breadcrumb/metadata pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub breadcrumb: Vec<String>,
    pub metadata: Metadata,
}

impl MetadataEntry {
    /// Stream-level entry (empty breadcrumb).
    #[must_use]
    pub fn stream(metadata: Metadata) -> Self {
        Self {
            breadcrumb: Vec::new(),
            metadata,
        }
    }

    /// Field-level entry.
    #[must_use]
    pub fn field(name: &str, metadata: Metadata) -> Self {
        Self {
            breadcrumb: vec!["properties".to_string(), name.to_string()],
            metadata,
        }
    }

    fn is_field(&self, name: &str) -> bool {
        matches!(self.breadcrumb.as_slice(), [p, n] if p == "properties" && n == name)
    }
}

/// A discoverable stream: identity, schema and selection state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub tap_stream_id: String,
    /// Stream identity; matched against the tap's table names.
    pub stream: String,
    #[serde(default)]
    pub key_properties: Vec<String>,
    pub schema: Schema,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<MetadataEntry>,
}

impl CatalogEntry {
    /// Stream-level metadata, if present.
    #[must_use]
    pub fn stream_metadata(&self) -> Option<&Metadata> {
        self.metadata
            .iter()
            .find(|m| m.breadcrumb.is_empty())
            .map(|m| &m.metadata)
    }

    /// Field-level metadata, if present.
    #[must_use]
    pub fn field_metadata(&self, field: &str) -> Option<&Metadata> {
        self.metadata
            .iter()
            .find(|m| m.is_field(field))
            .map(|m| &m.metadata)
    }

    /// Selected via `schema.selected` or stream-level metadata.
    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.schema.selected == Some(true)
            || self.stream_metadata().and_then(|m| m.selected) == Some(true)
    }

    /// Whether `field` should be replicated.
    ///
    /// Unknown fields are never selected. `automatic` inclusion overrides an
    /// explicit deselection; `unsupported` is never selected.
    #[must_use]
    pub fn is_field_selected(&self, field: &str) -> bool {
        let Some(property) = self.schema.properties.get(field) else {
            return false;
        };
        let metadata = self.field_metadata(field);
        let inclusion = property
            .inclusion
            .or_else(|| metadata.and_then(|m| m.inclusion));
        match inclusion {
            Some(Inclusion::Automatic) => return true,
            Some(Inclusion::Unsupported) => return false,
            _ => {}
        }
        property.selected != Some(false) && metadata.and_then(|m| m.selected) != Some(false)
    }

    /// Schema restricted to selected fields, in declaration order.
    #[must_use]
    pub fn projected_schema(&self) -> Schema {
        let properties = self
            .schema
            .properties
            .iter()
            .filter(|(name, _)| self.is_field_selected(name))
            .map(|(name, schema)| (name.clone(), schema.clone()))
            .collect();
        Schema {
            properties,
            ..self.schema.clone()
        }
    }
}

/// Ordered collection of catalog entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub streams: Vec<CatalogEntry>,
}

impl Catalog {
    /// First entry for `stream`.
    #[must_use]
    pub fn get(&self, stream: &str) -> Option<&CatalogEntry> {
        self.streams.iter().find(|e| e.stream == stream)
    }

    /// Whether any entry for `stream` is selected.
    #[must_use]
    pub fn is_selected(&self, stream: &str) -> bool {
        self.streams
            .iter()
            .any(|e| e.stream == stream && e.is_selected())
    }
}
