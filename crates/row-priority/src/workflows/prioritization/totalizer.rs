use super::aggregate::SegmentRollup;
use super::domain::{Permit, PermitKind, ZoneId};
use super::normalizer::canonical_timestamp;
use super::parser::PermitField;
use super::rules::ScoreFactor;
use super::ScoreComponent;
use crate::workflows::publication::PublishRecord;
use chrono::NaiveDateTime;
use serde_json::Value;

pub const SCORING_SUFFIX: &str = "_scoring";
pub const TOTAL_SCORE: &str = "total_score";
pub const ROW_INSPECTOR_ZONE: &str = "row_inspector_zone";
pub const COUNT_SEGMENTS: &str = "count_segments";

/// Output columns owned by the engine. Extract columns with these names, or
/// with the scoring suffix, are not passed through.
pub(crate) fn is_reserved_column(name: &str) -> bool {
    name.ends_with(SCORING_SUFFIX)
        || [TOTAL_SCORE, ROW_INSPECTOR_ZONE, COUNT_SEGMENTS].contains(&name)
        || PermitField::ALL.iter().any(|field| field.column() == name)
}

/// A permit with its score breakdown, ready for publication.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPermit {
    pub permit: Permit,
    pub components: Vec<ScoreComponent>,
    pub total_score: u32,
    pub count_segments: usize,
    pub row_inspector_zone: Option<ZoneId>,
}

impl ScoredPermit {
    pub(crate) fn new(permit: Permit, components: Vec<ScoreComponent>, rollup: &SegmentRollup) -> Self {
        let total_score = components.iter().map(|component| component.score).sum();
        Self {
            permit,
            components,
            total_score,
            count_segments: rollup.count_segments,
            row_inspector_zone: rollup.row_inspector_zone.clone(),
        }
    }

    pub fn score_for(&self, factor: ScoreFactor) -> u32 {
        self.components
            .iter()
            .filter(|component| component.factor == factor)
            .map(|component| component.score)
            .sum()
    }

    /// Flat record for the open-data sink. Missing values are explicit nulls
    /// and timestamps use the canonical layout.
    pub fn to_record(&self) -> PublishRecord {
        let permit = &self.permit;
        let mut record = PublishRecord::new();

        record.insert(
            PermitField::FolderRsn.column().to_string(),
            Value::from(permit.folder_rsn.as_str()),
        );
        record.insert(
            PermitField::FolderType.column().to_string(),
            optional(permit.kind.code()),
        );

        let dates = &permit.dates;
        for (field, value) in [
            (PermitField::ExpiryDate, dates.expiry),
            (PermitField::IssueDate, dates.issue),
            (PermitField::StartDate, dates.start),
            (PermitField::EndDate, dates.end),
            (PermitField::ExtensionStartDate, dates.extension_start),
            (PermitField::ExtensionEndDate, dates.extension_end),
            (PermitField::EventStartDate, dates.event_start),
            (PermitField::MostRecentInspection, permit.most_recent_inspection),
        ] {
            record.insert(field.column().to_string(), timestamp(value));
        }

        let (total_days, wz_duration) = match &permit.kind {
            PermitKind::RightOfWay { total_days } => (*total_days, None),
            PermitKind::DrivewaySidewalk { wz_duration } => (None, *wz_duration),
            _ => (None, None),
        };
        record.insert(PermitField::TotalDays.column().to_string(), number(total_days));
        record.insert(PermitField::WzDuration.column().to_string(), number(wz_duration));
        record.insert(
            PermitField::CountDeficiencies.column().to_string(),
            number(permit.count_deficiencies),
        );

        for (column, value) in &permit.passthrough {
            record.insert(column.clone(), optional(value.as_deref()));
        }

        for component in &self.components {
            record.insert(
                component.factor.column().to_string(),
                Value::from(component.score),
            );
        }
        record.insert(COUNT_SEGMENTS.to_string(), Value::from(self.count_segments));
        record.insert(TOTAL_SCORE.to_string(), Value::from(self.total_score));
        record.insert(
            ROW_INSPECTOR_ZONE.to_string(),
            optional(self.row_inspector_zone.as_ref().map(ZoneId::as_str)),
        );

        record
    }
}

fn optional(value: Option<&str>) -> Value {
    value.map_or(Value::Null, Value::from)
}

fn number(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::from)
}

fn timestamp(value: Option<NaiveDateTime>) -> Value {
    value.map_or(Value::Null, |at| Value::from(canonical_timestamp(at)))
}

/// Highest total first; ties resolve by folder in natural order.
pub(crate) fn rank(permits: &mut [ScoredPermit]) {
    permits.sort_by(|left, right| {
        right
            .total_score
            .cmp(&left.total_score)
            .then_with(|| left.permit.folder_rsn.cmp(&right.permit.folder_rsn))
    });
}
