//! Flat tables of named columns, as delivered by the extract jobs.

mod store;

pub use store::DirectoryStore;

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io::Read;

/// Cell values treated as missing when an extract is parsed.
pub const MISSING_SENTINELS: [&str; 7] = ["", "NaN", "nan", "NaT", "None", "null", "NULL"];

/// How raw CSV cells become table cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CellPolicy {
    /// Cells are trimmed and any of [`MISSING_SENTINELS`] reads as missing.
    #[default]
    Extract,
    /// Cells are kept byte for byte; only empty cells read as missing.
    Verbatim,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("extract '{0}' not found")]
    NotFound(String),
    #[error("failed to read extract '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid CSV data in '{key}': {source}")]
    Csv {
        key: String,
        #[source]
        source: csv::Error,
    },
}

/// Key/value access to extract files, keyed by file name.
pub trait TableSource {
    fn fetch_table_with(&self, key: &str, policy: CellPolicy) -> Result<Table, ExtractError>;

    fn fetch_table(&self, key: &str) -> Result<Table, ExtractError> {
        self.fetch_table_with(key, CellPolicy::Extract)
    }

    /// When the stored object was last written, if the store tracks it.
    fn last_modified(&self, _key: &str) -> Result<Option<DateTime<Utc>>, ExtractError> {
        Ok(None)
    }
}

/// An in-memory table of optional string cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        let index = columns
            .iter()
            .enumerate()
            .map(|(position, column)| (normalize_header(column), position))
            .collect();
        Self {
            name: name.into(),
            columns,
            index,
            rows: Vec::new(),
        }
    }

    pub fn from_csv_reader<R: Read>(name: &str, reader: R) -> Result<Self, ExtractError> {
        Self::from_csv_reader_with(name, reader, CellPolicy::Extract)
    }

    pub fn from_csv_reader_with<R: Read>(
        name: &str,
        reader: R,
        policy: CellPolicy,
    ) -> Result<Self, ExtractError> {
        let csv_error = |source| ExtractError::Csv {
            key: name.to_string(),
            source,
        };

        let trim = match policy {
            CellPolicy::Extract => csv::Trim::All,
            CellPolicy::Verbatim => csv::Trim::None,
        };
        let mut csv_reader = csv::ReaderBuilder::new().trim(trim).from_reader(reader);
        let headers = csv_reader.headers().map_err(csv_error)?;
        let columns = headers
            .iter()
            .map(|header| header.trim_start_matches('\u{feff}').to_string())
            .collect();
        let mut table = Table::new(name, columns);

        for record in csv_reader.records() {
            let record = record.map_err(csv_error)?;
            table.push_row(record.iter().map(|cell| clean_cell(cell, policy)).collect());
        }

        Ok(table)
    }

    /// Appends a row, padding or truncating it to the column count.
    pub fn push_row(&mut self, mut values: Vec<Option<String>>) {
        values.resize(self.columns.len(), None);
        self.rows.push(values);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the first alias present in the table. Matching ignores
    /// case, whitespace and underscores.
    pub fn position_of(&self, aliases: &[&str]) -> Option<usize> {
        aliases
            .iter()
            .find_map(|alias| self.index.get(&normalize_header(alias)).copied())
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Option<String>]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

/// Canonical lookup key for a column header.
pub fn normalize_header(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn clean_cell(value: &str, policy: CellPolicy) -> Option<String> {
    match policy {
        CellPolicy::Extract => {
            let trimmed = value.trim();
            (!MISSING_SENTINELS.contains(&trimmed)).then(|| trimmed.to_string())
        }
        CellPolicy::Verbatim => (!value.is_empty()).then(|| value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn csv_cells_map_missing_sentinels_to_none() {
        let table = Table::from_csv_reader(
            "permits.csv",
            Cursor::new("FOLDERRSN,CONTRACTOR,EXPIRY_DATE\n100, Acme ,NaT\n101,,2024-01-02\n"),
        )
        .expect("parse");

        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1].as_deref(), Some("Acme"));
        assert_eq!(rows[0][2], None);
        assert_eq!(rows[1][1], None);
    }

    #[test]
    fn verbatim_cells_keep_sentinel_text_and_whitespace() {
        let table = Table::from_csv_reader_with(
            "lde_site_plan_reviews.csv",
            Cursor::new("CASE_ID,Conditions,Notes\nSP-1,None, see plan \nSP-2,NULL,\n"),
            CellPolicy::Verbatim,
        )
        .expect("parse");

        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows[0][1].as_deref(), Some("None"));
        assert_eq!(rows[0][2].as_deref(), Some(" see plan "));
        assert_eq!(rows[1][1].as_deref(), Some("NULL"));
        assert_eq!(rows[1][2], None);
    }

    #[test]
    fn position_lookup_ignores_case_and_separators() {
        let table = Table::new(
            "segments.csv",
            vec!["FOLDERRSN".to_string(), "Is Primary".to_string()],
        );
        assert_eq!(table.position_of(&["folder_rsn"]), Some(0));
        assert_eq!(table.position_of(&["missing", "IS_PRIMARY"]), Some(1));
        assert_eq!(table.position_of(&["segment_id"]), None);
    }

    #[test]
    fn ragged_rows_are_rejected_as_csv_errors() {
        let error = Table::from_csv_reader("bad.csv", Cursor::new("A,B\n1,2,3\n"))
            .expect_err("ragged row");
        assert!(matches!(error, ExtractError::Csv { ref key, .. } if key == "bad.csv"));
    }

    #[test]
    fn push_row_pads_short_rows() {
        let mut table = Table::new("t", vec!["a".to_string(), "b".to_string()]);
        table.push_row(vec![Some("1".to_string())]);
        let row = table.rows().next().expect("row");
        assert_eq!(row, &[Some("1".to_string()), None]);
    }
}
