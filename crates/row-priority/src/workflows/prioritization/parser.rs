use super::domain::{FolderRsn, FolderType, Permit, PermitKind, SegmentAssociation, SegmentId};
use super::normalizer::{parse_count, parse_flag, parse_timestamp};
use super::totalizer::is_reserved_column;
use crate::extracts::Table;
use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

/// Permit columns the engine reads. Everything else passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermitField {
    FolderRsn,
    FolderType,
    ExpiryDate,
    IssueDate,
    StartDate,
    EndDate,
    ExtensionStartDate,
    ExtensionEndDate,
    EventStartDate,
    TotalDays,
    WzDuration,
    CountDeficiencies,
    MostRecentInspection,
}

impl PermitField {
    pub const ALL: [Self; 13] = [
        Self::FolderRsn,
        Self::FolderType,
        Self::ExpiryDate,
        Self::IssueDate,
        Self::StartDate,
        Self::EndDate,
        Self::ExtensionStartDate,
        Self::ExtensionEndDate,
        Self::EventStartDate,
        Self::TotalDays,
        Self::WzDuration,
        Self::CountDeficiencies,
        Self::MostRecentInspection,
    ];

    /// Name of the column in the published table. Lookups in the extract
    /// ignore case and underscores, so `FOLDERRSN` matches `folder_rsn`.
    pub const fn column(self) -> &'static str {
        match self {
            Self::FolderRsn => "folder_rsn",
            Self::FolderType => "folder_type",
            Self::ExpiryDate => "expiry_date",
            Self::IssueDate => "issue_date",
            Self::StartDate => "start_date",
            Self::EndDate => "end_date",
            Self::ExtensionStartDate => "extension_start_date",
            Self::ExtensionEndDate => "extension_end_date",
            Self::EventStartDate => "event_start_date",
            Self::TotalDays => "total_days",
            Self::WzDuration => "wz_duration",
            Self::CountDeficiencies => "count_deficiencies",
            Self::MostRecentInspection => "most_recent_inspection",
        }
    }
}

/// A permit row that could not be read as expected. The row is kept and the
/// affected score falls back to its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMismatch {
    pub table: String,
    pub column: &'static str,
    pub folder_rsn: FolderRsn,
    pub kind: MismatchKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MismatchKind {
    MissingColumn,
    Unparsable(String),
    UnknownFolderType(String),
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            MismatchKind::MissingColumn => write!(
                f,
                "{}: permit {} needs column '{}' which is absent",
                self.table, self.folder_rsn, self.column
            ),
            MismatchKind::Unparsable(value) => write!(
                f,
                "{}: permit {} has unreadable {} '{}'",
                self.table, self.folder_rsn, self.column, value
            ),
            MismatchKind::UnknownFolderType(value) => write!(
                f,
                "{}: permit {} has unknown folder type '{}'",
                self.table, self.folder_rsn, value
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("extract '{table}' has no '{column}' column")]
pub struct MissingKeyColumn {
    pub table: String,
    pub column: &'static str,
}

#[derive(Debug, Default)]
pub(crate) struct ParsedPermits {
    pub(crate) permits: Vec<Permit>,
    pub(crate) mismatches: Vec<SchemaMismatch>,
}

pub(crate) fn parse_permits(table: &Table) -> Result<ParsedPermits, MissingKeyColumn> {
    let positions: Vec<(PermitField, Option<usize>)> = PermitField::ALL
        .iter()
        .map(|field| (*field, table.position_of(&[field.column()])))
        .collect();
    let position = |field: PermitField| {
        positions
            .iter()
            .find(|(candidate, _)| *candidate == field)
            .and_then(|(_, position)| *position)
    };

    let key_position = position(PermitField::FolderRsn).ok_or_else(|| MissingKeyColumn {
        table: table.name().to_string(),
        column: PermitField::FolderRsn.column(),
    })?;

    let consumed: HashSet<usize> = positions.iter().filter_map(|(_, p)| *p).collect();
    let mut passthrough_columns = Vec::new();
    for (index, column) in table.columns().iter().enumerate() {
        if consumed.contains(&index) {
            continue;
        }
        let output = output_column_name(column);
        if is_reserved_column(&output) {
            warn!(table = table.name(), column = %column, "dropping extract column that collides with a score column");
            continue;
        }
        passthrough_columns.push((index, output));
    }

    let mut parsed = ParsedPermits::default();
    for row in table.rows() {
        let folder_rsn = FolderRsn::new(row[key_position].as_deref().unwrap_or_default());
        let mut reader = RowReader {
            table: table.name(),
            folder_rsn: &folder_rsn,
            row,
            position: &position,
            mismatches: &mut parsed.mismatches,
        };

        let kind = reader.permit_kind();
        let mut permit = Permit::new(folder_rsn.clone(), kind);
        permit.dates.expiry = reader.timestamp(PermitField::ExpiryDate, false);
        permit.dates.issue = reader.timestamp(PermitField::IssueDate, false);
        permit.dates.extension_start = reader.timestamp(PermitField::ExtensionStartDate, false);
        permit.dates.extension_end = reader.timestamp(PermitField::ExtensionEndDate, false);
        permit.dates.event_start = reader.timestamp(PermitField::EventStartDate, false);

        let window_required = matches!(permit.kind, PermitKind::Excavation)
            && !(permit.dates.extension_start.is_some() && permit.dates.extension_end.is_some());
        permit.dates.start = reader.timestamp(PermitField::StartDate, window_required);
        permit.dates.end = reader.timestamp(PermitField::EndDate, window_required);

        permit.count_deficiencies = reader.count(PermitField::CountDeficiencies, true);
        permit.most_recent_inspection = reader.timestamp(PermitField::MostRecentInspection, true);
        permit.passthrough = passthrough_columns
            .iter()
            .map(|(index, name)| (name.clone(), row[*index].clone()))
            .collect();

        parsed.permits.push(permit);
    }

    Ok(parsed)
}

/// Column name as published: lower case with spaces replaced by underscores.
pub(crate) fn output_column_name(column: &str) -> String {
    column.trim().to_lowercase().replace(' ', "_")
}

struct RowReader<'a, P> {
    table: &'a str,
    folder_rsn: &'a FolderRsn,
    row: &'a [Option<String>],
    position: &'a P,
    mismatches: &'a mut Vec<SchemaMismatch>,
}

impl<P> RowReader<'_, P>
where
    P: Fn(PermitField) -> Option<usize>,
{
    fn record(&mut self, field: PermitField, kind: MismatchKind) {
        self.mismatches.push(SchemaMismatch {
            table: self.table.to_string(),
            column: field.column(),
            folder_rsn: self.folder_rsn.clone(),
            kind,
        });
    }

    /// Raw cell for `field`. A missing column is recorded only when the
    /// field is required for this row.
    fn cell(&mut self, field: PermitField, required: bool) -> Option<&str> {
        match (self.position)(field) {
            Some(index) => self.row[index].as_deref(),
            None => {
                if required {
                    self.record(field, MismatchKind::MissingColumn);
                }
                None
            }
        }
    }

    fn timestamp(&mut self, field: PermitField, required: bool) -> Option<NaiveDateTime> {
        let raw = self.cell(field, required)?.to_string();
        let parsed = parse_timestamp(&raw);
        if parsed.is_none() {
            self.record(field, MismatchKind::Unparsable(raw));
        }
        parsed
    }

    fn count(&mut self, field: PermitField, required: bool) -> Option<i64> {
        let raw = self.cell(field, required)?.to_string();
        let parsed = parse_count(&raw);
        if parsed.is_none() {
            self.record(field, MismatchKind::Unparsable(raw));
        }
        parsed
    }

    fn permit_kind(&mut self) -> PermitKind {
        let raw = self
            .cell(PermitField::FolderType, true)
            .map(str::to_string);
        let Some(raw) = raw else {
            return PermitKind::Unrecognized { folder_type: None };
        };

        match FolderType::parse(&raw) {
            Some(FolderType::RightOfWay) => PermitKind::RightOfWay {
                total_days: self.count(PermitField::TotalDays, true),
            },
            Some(FolderType::DrivewaySidewalk) => PermitKind::DrivewaySidewalk {
                wz_duration: self.count(PermitField::WzDuration, true),
            },
            Some(FolderType::Excavation) => PermitKind::Excavation,
            None => {
                self.record(
                    PermitField::FolderType,
                    MismatchKind::UnknownFolderType(raw.clone()),
                );
                PermitKind::Unrecognized {
                    folder_type: Some(raw),
                }
            }
        }
    }
}

const SEGMENT_FOLDER_ALIASES: [&str; 1] = ["folder_rsn"];
const SEGMENT_ID_ALIASES: [&str; 2] = ["segment_id", "propertyrsn"];
const SEGMENT_PRIMARY_ALIASES: [&str; 1] = ["is_primary"];

pub(crate) fn parse_segments(table: &Table) -> Result<Vec<SegmentAssociation>, MissingKeyColumn> {
    let missing = |column: &'static str| MissingKeyColumn {
        table: table.name().to_string(),
        column,
    };
    let folder_position = table
        .position_of(&SEGMENT_FOLDER_ALIASES)
        .ok_or_else(|| missing("folder_rsn"))?;
    let segment_position = table
        .position_of(&SEGMENT_ID_ALIASES)
        .ok_or_else(|| missing("segment_id"))?;
    let primary_position = table.position_of(&SEGMENT_PRIMARY_ALIASES);

    let mut associations = Vec::with_capacity(table.len());
    let mut skipped = 0usize;
    for row in table.rows() {
        let (Some(folder_rsn), Some(segment_id)) = (
            row[folder_position].as_deref(),
            row[segment_position].as_deref(),
        ) else {
            skipped += 1;
            continue;
        };

        let is_primary = primary_position
            .and_then(|index| row[index].as_deref())
            .and_then(parse_flag)
            .unwrap_or(false);

        associations.push(SegmentAssociation {
            folder_rsn: FolderRsn::new(folder_rsn),
            segment_id: SegmentId::new(segment_id),
            is_primary,
        });
    }

    if skipped > 0 {
        debug!(table = table.name(), skipped, "segment rows without a permit or segment id");
    }

    Ok(associations)
}
