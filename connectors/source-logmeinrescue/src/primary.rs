//! Primary stream resolution: every technician plus the identifier set that
//! feeds dependent streams.

use std::collections::HashSet;

use rescue_tap_types::error::ConnectorError;

use crate::client::RescueApi;
use crate::error::Result;
use crate::report::Record;
use crate::streams::StreamDescriptor;

/// Technician node id.
pub type TechnicianId = i64;

/// Ordered, deduplicated primary identifiers. First-seen order wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierSet {
    ids: Vec<TechnicianId>,
    seen: HashSet<TechnicianId>,
}

impl IdentifierSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id` unless already present. Returns whether it was added.
    pub fn insert(&mut self, id: TechnicianId) -> bool {
        let added = self.seen.insert(id);
        if added {
            self.ids.push(id);
        }
        added
    }

    pub fn iter(&self) -> impl Iterator<Item = TechnicianId> + '_ {
        self.ids.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[TechnicianId] {
        &self.ids
    }
}

impl FromIterator<TechnicianId> for IdentifierSet {
    fn from_iter<I: IntoIterator<Item = TechnicianId>>(iter: I) -> Self {
        let mut set = Self::new();
        iter.into_iter().for_each(|id| {
            set.insert(id);
        });
        set
    }
}

/// Output of a full primary fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrimaryFetch {
    /// Every record in API order, duplicates included.
    pub records: Vec<Record>,
    pub identifiers: IdentifierSet,
}

/// Fetches the primary stream through a [`RescueApi`].
pub struct PrimaryResolver<'a> {
    client: &'a dyn RescueApi,
    descriptor: &'a StreamDescriptor,
}

impl<'a> PrimaryResolver<'a> {
    #[must_use]
    pub fn new(client: &'a dyn RescueApi, descriptor: &'a StreamDescriptor) -> Self {
        Self { client, descriptor }
    }

    fn key_field(&self) -> &'static str {
        self.descriptor.key_properties.first().copied().unwrap_or("id")
    }

    fn identifier(&self, record: &Record) -> Result<TechnicianId> {
        let key = self.key_field();
        record.get(key).and_then(serde_json::Value::as_i64).ok_or_else(|| {
            ConnectorError::data(
                "MISSING_PRIMARY_KEY",
                format!(
                    "{} record has no integer '{key}' value",
                    self.descriptor.table_name
                ),
            )
            .into()
        })
    }

    /// Fetch every page until the transport reports end of data.
    ///
    /// # Errors
    ///
    /// Propagates transport errors, and fails with a data error when a
    /// record carries no integer key.
    pub async fn fetch_all(&self) -> Result<PrimaryFetch> {
        let stream = self.descriptor.table_name;
        let mut fetch = PrimaryFetch::default();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.client.fetch_technicians(page_token.as_deref()).await?;
            pages += 1;
            for record in page.records {
                let id = self.identifier(&record)?;
                fetch.identifiers.insert(id);
                fetch.records.push(record);
            }
            match page.next_page {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        tracing::info!(
            stream,
            pages,
            records = fetch.records.len(),
            identifiers = fetch.identifiers.len(),
            "Fetched primary stream"
        );
        Ok(fetch)
    }
}
