//! Tab-delimited report tables returned by the Rescue API.
//!
//! A table is one header line followed by zero or more data rows. The same
//! shape backs the technician hierarchy and every per-technician report.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// One replicated row, keyed by field name.
pub type Record = Map<String, Value>;

/// Report areas the tap requests through `setReportArea`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportArea {
    /// Session custom fields, one row per session.
    CustomFields,
}

impl ReportArea {
    /// Numeric area code sent to the API.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::CustomFields => 5,
        }
    }
}

/// Half-open date range `[start, end)` a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SyncWindow {
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }
}

/// Parsed report table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    header: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Report {
    /// Build a report from a header and rows. Rows are normalized to the
    /// header width.
    #[must_use]
    pub fn new(header: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let width = header.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self { header, rows }
    }

    /// Parse a tab-delimited table. Empty lines are skipped, `\r` is
    /// stripped and empty cells become `None`. A line of bare tabs is a
    /// row of nulls.
    #[must_use]
    pub fn parse(table: &str) -> Self {
        let mut lines = table
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.is_empty());

        let Some(header_line) = lines.next() else {
            return Self::default();
        };
        let header = header_line
            .split('\t')
            .map(|h| h.trim().to_string())
            .collect();

        let rows = lines
            .map(|line| {
                line.split('\t')
                    .map(|cell| {
                        let cell = cell.trim();
                        (!cell.is_empty()).then(|| cell.to_string())
                    })
                    .collect()
            })
            .collect();

        Self::new(header, rows)
    }

    /// Column names in response order.
    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// A report with no data rows carries no data, whatever its header.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as records. On duplicate column names the first column wins.
    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        self.rows.iter().map(|row| {
            let mut record = Record::new();
            for (name, cell) in self.header.iter().zip(row) {
                if name.is_empty() || record.contains_key(name) {
                    continue;
                }
                let value = cell.clone().map_or(Value::Null, Value::String);
                record.insert(name.clone(), value);
            }
            record
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_rows() {
        let report = Report::parse("Session ID\tCustom 1\r\n42\tred\r\n43\t\r\n");
        assert_eq!(report.header(), ["Session ID", "Custom 1"]);
        assert_eq!(report.len(), 2);
        let records: Vec<Record> = report.records().collect();
        assert_eq!(records[0]["Custom 1"], "red");
        assert_eq!(records[1]["Custom 1"], Value::Null);
    }

    #[test]
    fn header_only_is_empty() {
        let report = Report::parse("a\tb\n");
        assert!(report.is_empty());
        assert_eq!(report.header().len(), 2);
    }

    #[test]
    fn blank_input_has_no_header() {
        let report = Report::parse("\n\n");
        assert!(report.is_empty());
        assert!(report.header().is_empty());
    }

    #[test]
    fn all_empty_row_is_a_row_of_nulls() {
        let report = Report::parse("a\tb\tc\r\n\t\t\r\n");
        assert_eq!(report.len(), 1);
        let record = report.records().next().unwrap();
        assert!(record.values().all(Value::is_null));
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn short_rows_padded_and_long_rows_truncated() {
        let report = Report::parse("a\tb\n1\n1\t2\t3\n");
        let records: Vec<Record> = report.records().collect();
        assert_eq!(records[0]["b"], Value::Null);
        assert_eq!(records[1].len(), 2);
    }

    #[test]
    fn duplicate_columns_keep_first() {
        let report = Report::parse("a\ta\nfirst\tsecond\n");
        let record = report.records().next().unwrap();
        assert_eq!(record["a"], "first");
    }

    #[test]
    fn custom_fields_area_code() {
        assert_eq!(ReportArea::CustomFields.code(), 5);
    }
}
