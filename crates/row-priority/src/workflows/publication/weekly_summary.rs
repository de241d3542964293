use super::datasets::{publish_summary, DatasetSyncError, SummaryReport};
use super::{portal_column, PublicationSink, PublishMode, PublishRecord};
use crate::extracts::{Table, TableSource};
use crate::workflows::prioritization::normalizer::{parse_count, parse_timestamp};
use chrono::{Datelike, Duration, NaiveDate};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// Folder types broken out by the AMANDA measures.
const SUMMARY_FOLDER_TYPES: [&str; 3] = ["DS", "EX", "RW"];
const FOLDER_TYPE: [&str; 2] = ["foldertype", "folder_type"];
const COUNT_PERMITS: &str = "Count Permits";

/// How a measure turns its rows into weekly totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureCounts {
    /// Sums `count_column` per folder type into `"<TYPE> <measure>"` columns.
    ByFolderType { count_column: &'static str },
    /// Sums the pre-counted `Count Permits` column into `column`.
    Total { column: &'static str },
    /// Sums `Count Permits` and adds it onto another measure's column.
    AddTo { column: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyMeasure {
    pub name: &'static str,
    pub file_name: &'static str,
    pub date_column: &'static str,
    pub counts: MeasureCounts,
}

impl WeeklyMeasure {
    fn output_columns(&self) -> Vec<String> {
        match self.counts {
            MeasureCounts::ByFolderType { .. } => SUMMARY_FOLDER_TYPES
                .iter()
                .map(|folder_type| format!("{folder_type} {}", self.name))
                .collect(),
            MeasureCounts::Total { column } => vec![column.to_string()],
            MeasureCounts::AddTo { .. } => Vec::new(),
        }
    }
}

/// Weekly permit activity, one row per week ending on Saturday.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklySummary {
    measures: Vec<WeeklyMeasure>,
}

impl WeeklySummary {
    pub fn new(measures: Vec<WeeklyMeasure>) -> Self {
        Self { measures }
    }

    /// AMANDA application and issuance counts plus the smartsheet request
    /// logs. Smartsheet DS requests are folded into DS applications.
    pub fn standard() -> Self {
        Self::new(vec![
            WeeklyMeasure {
                name: "Applications Received",
                file_name: "applications_received.csv",
                date_column: "TO_CHAR(ROUND(INDATE,'DDD'),'YYYY-MM-DD')",
                counts: MeasureCounts::ByFolderType {
                    count_column: "ISSUEDROWPERMITS",
                },
            },
            WeeklyMeasure {
                name: "Permits Issued",
                file_name: "issued_permits.csv",
                date_column: "TO_CHAR(ROUND(ISSUEDATE,'DDD'),'YYYY-MM-DD')",
                counts: MeasureCounts::ByFolderType {
                    count_column: "ISSUEDROWPERMITS",
                },
            },
            WeeklyMeasure {
                name: "Commercial DS Permit Requests",
                file_name: "Commercial DS Permit Requests.csv",
                date_column: "Date Created",
                counts: MeasureCounts::AddTo {
                    column: "DS Applications Received",
                },
            },
            WeeklyMeasure {
                name: "Extension Requests",
                file_name: "Extension and Revision Requests.csv",
                date_column: "Created",
                counts: MeasureCounts::Total {
                    column: "Extension Requests",
                },
            },
            WeeklyMeasure {
                name: "Residential DS Permit Requests",
                file_name: "Residential DS Permits.csv",
                date_column: "Date Created",
                counts: MeasureCounts::AddTo {
                    column: "DS Applications Received",
                },
            },
        ])
    }

    pub fn measures(&self) -> &[WeeklyMeasure] {
        &self.measures
    }

    /// Loads every measure's extract, summarizes and replaces the dataset.
    pub fn publish(
        &self,
        source: &dyn TableSource,
        sink: &dyn PublicationSink,
        dataset_id: &str,
    ) -> Result<SummaryReport, DatasetSyncError> {
        let tables = self
            .measures
            .iter()
            .map(|measure| source.fetch_table(measure.file_name))
            .collect::<Result<Vec<_>, _>>()?;
        let inputs: Vec<_> = self.measures.iter().zip(&tables).collect();

        let records = summarize_weekly(&inputs)?;
        publish_summary(sink, "weekly_summary", dataset_id, PublishMode::Replace, records)
    }
}

/// Saturday closing the week that contains `date`.
fn week_ending(date: NaiveDate) -> NaiveDate {
    date + Duration::days(6 - i64::from(date.weekday().num_days_from_sunday()))
}

/// Weekly totals keyed by output column then week.
type WeeklyTotals = BTreeMap<String, BTreeMap<NaiveDate, i64>>;

/// A measure's totals plus every week from its first to its last row.
fn measure_totals(
    measure: &WeeklyMeasure,
    table: &Table,
) -> Result<(WeeklyTotals, BTreeSet<NaiveDate>), DatasetSyncError> {
    let missing = |column: &'static str| DatasetSyncError::MissingColumn {
        key: table.name().to_string(),
        column,
    };
    let date_position = table
        .position_of(&[measure.date_column])
        .ok_or_else(|| missing(measure.date_column))?;

    // (position of the count, position of the folder type when broken out)
    let (count_position, type_position) = match measure.counts {
        MeasureCounts::ByFolderType { count_column } => (
            table
                .position_of(&[count_column])
                .ok_or_else(|| missing(count_column))?,
            Some(
                table
                    .position_of(&FOLDER_TYPE)
                    .ok_or_else(|| missing("FOLDERTYPE"))?,
            ),
        ),
        MeasureCounts::Total { .. } | MeasureCounts::AddTo { .. } => (
            table
                .position_of(&[COUNT_PERMITS])
                .ok_or_else(|| missing(COUNT_PERMITS))?,
            None,
        ),
    };

    let mut totals = WeeklyTotals::new();
    let mut weeks = BTreeSet::new();
    for row in table.rows() {
        let Some(date) = row[date_position].as_deref().and_then(parse_timestamp) else {
            warn!(
                table = table.name(),
                value = row[date_position].as_deref().unwrap_or(""),
                "row without a readable date left out of the weekly summary"
            );
            continue;
        };
        let week = week_ending(date.date());
        weeks.insert(week);

        let column = match (measure.counts, type_position) {
            (MeasureCounts::ByFolderType { .. }, Some(position)) => {
                match row[position].as_deref() {
                    Some(folder_type) if SUMMARY_FOLDER_TYPES.contains(&folder_type) => {
                        format!("{folder_type} {}", measure.name)
                    }
                    _ => continue,
                }
            }
            (MeasureCounts::Total { column }, _) | (MeasureCounts::AddTo { column }, _) => {
                column.to_string()
            }
            (MeasureCounts::ByFolderType { .. }, None) => continue,
        };
        let count = row[count_position].as_deref().and_then(parse_count).unwrap_or(0);
        *totals.entry(column).or_default().entry(week).or_insert(0) += count;
    }

    let range = match (weeks.first(), weeks.last()) {
        (Some(first), Some(last)) => {
            let mut range = BTreeSet::new();
            let mut week = *first;
            while week <= *last {
                range.insert(week);
                week += Duration::days(7);
            }
            range
        }
        _ => BTreeSet::new(),
    };

    Ok((totals, range))
}

/// One record per week across all measures. Measures that add onto another
/// column are summed into it; weeks a measure does not cover count as zero.
pub fn summarize_weekly(
    inputs: &[(&WeeklyMeasure, &Table)],
) -> Result<Vec<PublishRecord>, DatasetSyncError> {
    let mut columns: BTreeSet<String> = BTreeSet::new();
    let mut weeks: BTreeSet<NaiveDate> = BTreeSet::new();
    let mut totals = WeeklyTotals::new();

    for (measure, table) in inputs {
        columns.extend(measure.output_columns());
        let (measure_totals, range) = measure_totals(measure, table)?;
        weeks.extend(range);
        for (column, by_week) in measure_totals {
            let merged = totals.entry(column).or_default();
            for (week, count) in by_week {
                *merged.entry(week).or_insert(0) += count;
            }
        }
    }

    let records: Vec<PublishRecord> = weeks
        .iter()
        .map(|week| {
            let mut record: PublishRecord = columns
                .iter()
                .map(|column| {
                    let count = totals
                        .get(column)
                        .and_then(|by_week| by_week.get(week))
                        .copied()
                        .unwrap_or(0);
                    (portal_column(column), Value::from(count))
                })
                .collect();
            record.insert(
                "date".to_string(),
                Value::from(format!("{}T00:00:00.000", week.format("%Y-%m-%d"))),
            );
            record
        })
        .collect();

    info!(weeks = records.len(), columns = columns.len(), "weekly summary built");
    Ok(records)
}
