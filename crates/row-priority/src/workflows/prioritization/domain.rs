use super::normalizer::normalize_identifier;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Orders identifiers numerically when both sides are integers, otherwise
/// falls back to plain string order with integers first.
pub(crate) fn natural_cmp(left: &str, right: &str) -> Ordering {
    match (left.parse::<i64>(), right.parse::<i64>()) {
        (Ok(l), Ok(r)) => l.cmp(&r).then_with(|| left.cmp(right)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => left.cmp(right),
    }
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: &str) -> Self {
                Self(normalize_identifier(raw))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> Ordering {
                natural_cmp(&self.0, &other.0)
            }
        }

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

identifier!(
    /// Permit folder key.
    FolderRsn
);
identifier!(
    /// Roadway segment key in the external segment catalog.
    SegmentId
);
identifier!(
    /// ROW inspector zone used to route a permit to a field inspector.
    ZoneId
);

/// Permit folder types tracked by the ROW division.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FolderType {
    RightOfWay,
    DrivewaySidewalk,
    Excavation,
}

impl FolderType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "RW" => Some(Self::RightOfWay),
            "DS" => Some(Self::DrivewaySidewalk),
            "EX" => Some(Self::Excavation),
            _ => None,
        }
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::RightOfWay => "RW",
            Self::DrivewaySidewalk => "DS",
            Self::Excavation => "EX",
        }
    }
}

/// Type-specific duration data. Each folder type carries only the field
/// that is meaningful for it.
#[derive(Debug, Clone, PartialEq)]
pub enum PermitKind {
    RightOfWay { total_days: Option<i64> },
    DrivewaySidewalk { wz_duration: Option<i64> },
    Excavation,
    Unrecognized { folder_type: Option<String> },
}

impl PermitKind {
    pub fn folder_type(&self) -> Option<FolderType> {
        match self {
            Self::RightOfWay { .. } => Some(FolderType::RightOfWay),
            Self::DrivewaySidewalk { .. } => Some(FolderType::DrivewaySidewalk),
            Self::Excavation => Some(FolderType::Excavation),
            Self::Unrecognized { .. } => None,
        }
    }

    /// Folder type as it should appear in the published table.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Unrecognized { folder_type } => folder_type.as_deref(),
            known => known.folder_type().map(FolderType::code),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PermitDates {
    pub expiry: Option<NaiveDateTime>,
    pub issue: Option<NaiveDateTime>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub extension_start: Option<NaiveDateTime>,
    pub extension_end: Option<NaiveDateTime>,
    pub event_start: Option<NaiveDateTime>,
}

impl PermitDates {
    /// Length of the work window in whole days. The extension window wins
    /// when both of its dates are present.
    pub fn work_window_days(&self) -> Option<i64> {
        let (start, end) = match (self.extension_start, self.extension_end) {
            (Some(start), Some(end)) => (start, end),
            _ => (self.start?, self.end?),
        };
        Some((end - start).num_days())
    }
}

/// One permit folder row from the permits extract.
#[derive(Debug, Clone, PartialEq)]
pub struct Permit {
    pub folder_rsn: FolderRsn,
    pub kind: PermitKind,
    pub dates: PermitDates,
    pub count_deficiencies: Option<i64>,
    pub most_recent_inspection: Option<NaiveDateTime>,
    /// Display columns carried through unscored, in extract order.
    pub passthrough: Vec<(String, Option<String>)>,
}

impl Permit {
    pub fn new(folder_rsn: FolderRsn, kind: PermitKind) -> Self {
        Self {
            folder_rsn,
            kind,
            dates: PermitDates::default(),
            count_deficiencies: None,
            most_recent_inspection: None,
            passthrough: Vec::new(),
        }
    }

    /// Duration in days for the permit's folder type.
    pub fn duration_days(&self) -> Option<i64> {
        match &self.kind {
            PermitKind::RightOfWay { total_days } => *total_days,
            PermitKind::DrivewaySidewalk { wz_duration } => *wz_duration,
            PermitKind::Excavation => self.dates.work_window_days(),
            PermitKind::Unrecognized { .. } => None,
        }
    }
}

/// Link between a permit and one roadway segment it touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentAssociation {
    pub folder_rsn: FolderRsn,
    pub segment_id: SegmentId,
    pub is_primary: bool,
}

/// Per-segment attributes supplied by the segment catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentAttributes {
    pub segment_id: SegmentId,
    pub road_class: Option<i64>,
    pub special_zone_id: Option<String>,
    pub inspector_zone_id: Option<ZoneId>,
}

/// A segment association joined with its catalog attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedSegment {
    pub folder_rsn: FolderRsn,
    pub segment_id: SegmentId,
    pub is_primary: bool,
    pub road_class: Option<i64>,
    pub special_zone_id: Option<String>,
    pub inspector_zone_id: Option<ZoneId>,
}

impl EnrichedSegment {
    pub fn join(association: &SegmentAssociation, attributes: &SegmentAttributes) -> Self {
        Self {
            folder_rsn: association.folder_rsn.clone(),
            segment_id: association.segment_id.clone(),
            is_primary: association.is_primary,
            road_class: attributes.road_class,
            special_zone_id: attributes.special_zone_id.clone(),
            inspector_zone_id: attributes.inspector_zone_id.clone(),
        }
    }
}
