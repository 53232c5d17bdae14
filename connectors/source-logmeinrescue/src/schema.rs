//! Schema inference for dependent streams.
//!
//! The custom fields of a deployment are only known from a live report, so
//! the schema of a dependent stream is derived from the header of one sample
//! response. Inference is pure: same sample in, same fragment out.

use indexmap::IndexMap;

use rescue_tap_types::catalog::Schema;

use crate::report::Report;

/// Fields inferred from one sample, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaFragment {
    fields: IndexMap<String, Schema>,
}

impl SchemaFragment {
    /// Field names in header order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Schema)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.fields.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One nullable string field per distinct, non-empty header column.
///
/// A repeated column name keeps its first position.
#[must_use]
pub fn infer_schema(sample: &Report) -> SchemaFragment {
    let mut fields = IndexMap::new();
    for name in sample.header() {
        if name.is_empty() || fields.contains_key(name) {
            continue;
        }
        fields.insert(name.clone(), Schema::string(true));
    }
    SchemaFragment { fields }
}
