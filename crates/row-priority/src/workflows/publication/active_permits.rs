use super::datasets::{publish_summary, DatasetSyncError, SummaryReport};
use super::{portal_column, PublicationSink, PublishMode, PublishRecord};
use crate::extracts::{Table, TableSource};
use crate::workflows::prioritization::normalizer::canonical_timestamp;
use chrono::{Local, NaiveDateTime};
use serde_json::{Number, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Column stamped on every log row with the extract's write time.
pub const PUBLISHED_DATE: &str = "published_date";

const FOLDER_TYPE: [&str; 2] = ["foldertype", "folder_type"];

/// Appends the current active permit counts to a rolling log dataset.
pub struct ActivePermitsLog<'a> {
    source: &'a dyn TableSource,
    sink: &'a dyn PublicationSink,
}

impl<'a> ActivePermitsLog<'a> {
    pub fn new(source: &'a dyn TableSource, sink: &'a dyn PublicationSink) -> Self {
        Self { source, sink }
    }

    /// Rows are stamped with the extract's modification time in the host's
    /// local time zone and upserted.
    pub fn publish(&self, key: &str, dataset_id: &str) -> Result<SummaryReport, DatasetSyncError> {
        let table = self.source.fetch_table(key)?;
        let published = self
            .source
            .last_modified(key)?
            .ok_or_else(|| DatasetSyncError::MissingTimestamp(key.to_string()))?
            .with_timezone(&Local)
            .naive_local();

        let records = pivot_active_permits(&table, published)?;
        publish_summary(
            self.sink,
            "active_permits",
            dataset_id,
            PublishMode::Upsert,
            records,
        )
    }
}

/// Turns one row per folder type into one row per numeric column, with a
/// field per folder type holding that type's mean. Columns without any
/// numeric cell are skipped.
pub fn pivot_active_permits(
    table: &Table,
    published: NaiveDateTime,
) -> Result<Vec<PublishRecord>, DatasetSyncError> {
    let type_position = table
        .position_of(&FOLDER_TYPE)
        .ok_or_else(|| DatasetSyncError::MissingColumn {
            key: table.name().to_string(),
            column: "FOLDERTYPE",
        })?;

    let folder_types: BTreeSet<String> = table
        .rows()
        .filter_map(|row| row[type_position].as_deref().map(portal_column))
        .collect();

    let mut value_columns: Vec<(usize, &str)> = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(position, _)| *position != type_position)
        .map(|(position, column)| (position, column.as_str()))
        .collect();
    value_columns.sort_by(|left, right| left.1.cmp(right.1));

    let stamp = Value::from(canonical_timestamp(published));
    let mut records = Vec::new();
    for (position, column) in value_columns {
        let mut sums: BTreeMap<String, (f64, u32)> = BTreeMap::new();
        for row in table.rows() {
            let Some(folder_type) = row[type_position].as_deref() else {
                continue;
            };
            let Some(value) = row[position].as_deref().and_then(|cell| cell.parse::<f64>().ok())
            else {
                continue;
            };
            let entry = sums.entry(portal_column(folder_type)).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }

        if sums.is_empty() {
            warn!(table = table.name(), column, "non-numeric column left out of the log");
            continue;
        }

        let mut record: PublishRecord = folder_types
            .iter()
            .map(|folder_type| {
                let value = sums
                    .get(folder_type)
                    .map_or(Value::Null, |(sum, count)| number(sum / f64::from(*count)));
                (folder_type.clone(), value)
            })
            .collect();
        record.insert(PUBLISHED_DATE.to_string(), stamp.clone());
        records.push(record);
    }

    Ok(records)
}

fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}
