use super::domain::{EnrichedSegment, FolderRsn, ZoneId};
use super::rules::{dapcz_score, road_class_score};
use std::collections::HashMap;

/// Segment-level results reduced to one permit. The default value is the
/// fallback for permits without enriched segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentRollup {
    pub count_segments: usize,
    pub road_class_score: u32,
    /// Road class of the segment that set `road_class_score`.
    pub max_road_class: Option<i64>,
    pub dapcz_score: u32,
    pub row_inspector_zone: Option<ZoneId>,
}

impl SegmentRollup {
    fn absorb(&mut self, segment: &EnrichedSegment, zone_from_primary_only: bool) {
        self.count_segments += 1;

        let road_class = road_class_score(segment.road_class);
        if road_class > self.road_class_score {
            self.road_class_score = road_class;
            self.max_road_class = segment.road_class;
        }

        self.dapcz_score = self
            .dapcz_score
            .max(dapcz_score(segment.special_zone_id.as_deref()));

        if zone_from_primary_only && !segment.is_primary {
            return;
        }
        if let Some(zone) = &segment.inspector_zone_id {
            if self.row_inspector_zone.as_ref().map_or(true, |current| zone > current) {
                self.row_inspector_zone = Some(zone.clone());
            }
        }
    }
}

/// Per-permit maxima over the enriched segments, keyed by folder.
pub(crate) fn rollup_segments(
    segments: &[EnrichedSegment],
    zone_from_primary_only: bool,
) -> HashMap<FolderRsn, SegmentRollup> {
    let mut rollups: HashMap<FolderRsn, SegmentRollup> = HashMap::new();
    for segment in segments {
        rollups
            .entry(segment.folder_rsn.clone())
            .or_default()
            .absorb(segment, zone_from_primary_only);
    }
    rollups
}
