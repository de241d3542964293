use std::cell::RefCell;
use std::io::Cursor;

use chrono::{NaiveDate, NaiveDateTime};

use crate::extracts::Table;
use crate::workflows::prioritization::{
    EnrichedSegment, EngineConfig, FolderRsn, PriorityEngine, ProviderError,
    SegmentAttributeProvider, SegmentAttributes, SegmentId, ZoneId,
};

pub(super) const PERMIT_HEADER: &str = "FOLDERRSN,FOLDERTYPE,TOTAL_DAYS,WZ_DURATION,START_DATE,END_DATE,EXTENSION_START_DATE,EXTENSION_END_DATE,EXPIRY_DATE,COUNT_DEFICIENCIES,MOST_RECENT_INSPECTION,CONTRACTOR";

pub(super) fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .expect("valid date")
        .and_hms_opt(hour, minute, 0)
        .expect("valid time")
}

/// Fixed clock for every scoring test.
pub(super) fn now() -> NaiveDateTime {
    at(2024, 3, 15, 12, 0)
}

pub(super) fn table(name: &str, csv: &str) -> Table {
    Table::from_csv_reader(name, Cursor::new(csv.to_string())).expect("fixture csv parses")
}

/// Permit extract with the standard header and the given data lines.
pub(super) fn permits(rows: &[&str]) -> Table {
    let mut csv = format!("{PERMIT_HEADER}\n");
    for row in rows {
        csv.push_str(row);
        csv.push('\n');
    }
    table("row_inspector_permit_list.csv", &csv)
}

pub(super) fn segments(rows: &[&str]) -> Table {
    let mut csv = "FOLDERRSN,PROPERTYRSN,IS_PRIMARY\n".to_string();
    for row in rows {
        csv.push_str(row);
        csv.push('\n');
    }
    table("row_inspector_segment_list.csv", &csv)
}

pub(super) fn attributes(
    segment_id: &str,
    road_class: Option<i64>,
    special_zone: Option<&str>,
    inspector_zone: Option<&str>,
) -> SegmentAttributes {
    SegmentAttributes {
        segment_id: SegmentId::new(segment_id),
        road_class,
        special_zone_id: special_zone.map(str::to_string),
        inspector_zone_id: inspector_zone.map(ZoneId::new),
    }
}

pub(super) fn enriched(
    folder_rsn: &str,
    segment_id: &str,
    road_class: Option<i64>,
    special_zone: Option<&str>,
    inspector_zone: Option<&str>,
    is_primary: bool,
) -> EnrichedSegment {
    EnrichedSegment {
        folder_rsn: FolderRsn::new(folder_rsn),
        segment_id: SegmentId::new(segment_id),
        is_primary,
        road_class,
        special_zone_id: special_zone.map(str::to_string),
        inspector_zone_id: inspector_zone.map(ZoneId::new),
    }
}

pub(super) fn engine() -> PriorityEngine {
    PriorityEngine::new(EngineConfig::default())
}

/// In-memory segment catalog that records every batch it is asked for.
#[derive(Debug, Default)]
pub(super) struct FakeProvider {
    rows: Vec<SegmentAttributes>,
    fail: bool,
    pub(super) calls: RefCell<Vec<Vec<SegmentId>>>,
}

impl FakeProvider {
    pub(super) fn with_rows(rows: Vec<SegmentAttributes>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub(super) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(super) fn requested(&self) -> Vec<Vec<String>> {
        self.calls
            .borrow()
            .iter()
            .map(|batch| batch.iter().map(|id| id.as_str().to_string()).collect())
            .collect()
    }
}

impl SegmentAttributeProvider for FakeProvider {
    fn fetch_segment_attributes(
        &self,
        segment_ids: &[SegmentId],
    ) -> Result<Vec<SegmentAttributes>, ProviderError> {
        self.calls.borrow_mut().push(segment_ids.to_vec());
        if self.fail {
            return Err(ProviderError::Backend("catalog offline".to_string()));
        }
        Ok(self
            .rows
            .iter()
            .filter(|row| segment_ids.contains(&row.segment_id))
            .cloned()
            .collect())
    }
}
