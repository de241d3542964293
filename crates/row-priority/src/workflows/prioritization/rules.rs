use super::aggregate::SegmentRollup;
use super::domain::{Permit, PermitKind};
use super::{EngineConfig, ScoreComponent};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Additive components of the inspection priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFactor {
    SegmentCount,
    Duration,
    RoadClass,
    SpecialZone,
    ActiveDeficiencies,
    RecentInspection,
}

impl ScoreFactor {
    pub const ALL: [Self; 6] = [
        Self::SegmentCount,
        Self::Duration,
        Self::RoadClass,
        Self::SpecialZone,
        Self::ActiveDeficiencies,
        Self::RecentInspection,
    ];

    /// Published column holding this component.
    pub const fn column(self) -> &'static str {
        match self {
            Self::SegmentCount => "count_segment_scoring",
            Self::Duration => "duration_scoring",
            Self::RoadClass => "road_class_scoring",
            Self::SpecialZone => "dapcz_scoring",
            Self::ActiveDeficiencies => "active_deficiencies_scoring",
            Self::RecentInspection => "recent_inspection_scoring",
        }
    }
}

/// Permits with no resolved segments fall back to 0.
pub fn count_segment_score(count: usize) -> u32 {
    match count {
        0 => 0,
        1 => 5,
        _ => 10,
    }
}

/// Shorter permits score higher. Bucket edges are inclusive; an unknown
/// duration lands in the last bucket.
pub fn duration_score(days: Option<i64>) -> u32 {
    match days {
        Some(days) if days <= 6 => 10,
        Some(days) if days <= 15 => 5,
        Some(days) if days <= 30 => 3,
        _ => 1,
    }
}

/// Critical roads 10, minor arterials 7, collectors 5, everything else 3.
pub fn road_class_score(road_class: Option<i64>) -> u32 {
    match road_class {
        Some(1 | 2 | 4) => 10,
        Some(5) => 7,
        Some(8) => 5,
        _ => 3,
    }
}

pub fn dapcz_score(special_zone_id: Option<&str>) -> u32 {
    if special_zone_id.is_some() {
        10
    } else {
        0
    }
}

pub fn active_deficiencies_score(count_deficiencies: Option<i64>) -> u32 {
    match count_deficiencies {
        Some(count) if count > 0 => 5,
        _ => 0,
    }
}

/// 5 points when the last inspection falls on one of the trailing
/// `window_days` calendar dates ending with today. Future inspections do not
/// count.
pub fn recent_inspection_score(
    most_recent_inspection: Option<NaiveDateTime>,
    now: NaiveDateTime,
    window_days: i64,
) -> u32 {
    match most_recent_inspection {
        Some(at) if at <= now && (now.date() - at.date()).num_days() < window_days => 5,
        _ => 0,
    }
}

pub(crate) fn score_permit(
    permit: &Permit,
    rollup: &SegmentRollup,
    config: &EngineConfig,
    now: NaiveDateTime,
) -> Vec<ScoreComponent> {
    let mut components = Vec::with_capacity(ScoreFactor::ALL.len());

    let count = rollup.count_segments;
    components.push(ScoreComponent {
        factor: ScoreFactor::SegmentCount,
        score: count_segment_score(count),
        notes: match count {
            0 => "no resolved segments".to_string(),
            1 => "single segment".to_string(),
            _ => format!("{count} segments"),
        },
    });

    let days = permit.duration_days();
    let source = match &permit.kind {
        PermitKind::RightOfWay { .. } => "total days",
        PermitKind::DrivewaySidewalk { .. } => "work zone duration",
        PermitKind::Excavation => "work window",
        PermitKind::Unrecognized { .. } => "unknown folder type",
    };
    components.push(ScoreComponent {
        factor: ScoreFactor::Duration,
        score: duration_score(days),
        notes: match days {
            Some(days) => format!("{source}: {days} day(s)"),
            None => format!("{source}: duration unavailable"),
        },
    });

    components.push(ScoreComponent {
        factor: ScoreFactor::RoadClass,
        score: rollup.road_class_score,
        notes: match rollup.max_road_class {
            _ if count == 0 => "no road class".to_string(),
            Some(code) => format!("highest scoring road class {code}"),
            None => "road class unknown".to_string(),
        },
    });

    components.push(ScoreComponent {
        factor: ScoreFactor::SpecialZone,
        score: rollup.dapcz_score,
        notes: if rollup.dapcz_score > 0 {
            "segment inside DAPCZ".to_string()
        } else {
            "outside DAPCZ".to_string()
        },
    });

    let deficiencies = permit.count_deficiencies.unwrap_or(0);
    components.push(ScoreComponent {
        factor: ScoreFactor::ActiveDeficiencies,
        score: active_deficiencies_score(permit.count_deficiencies),
        notes: format!("{deficiencies} open deficiency(ies)"),
    });

    components.push(ScoreComponent {
        factor: ScoreFactor::RecentInspection,
        score: recent_inspection_score(
            permit.most_recent_inspection,
            now,
            config.recent_inspection_days,
        ),
        notes: match permit.most_recent_inspection {
            Some(at) => format!("last inspected {}", at.format("%Y-%m-%d")),
            None => "never inspected".to_string(),
        },
    });

    components
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn road_class_without_code_scores_as_local_street() {
        assert_eq!(road_class_score(None), 3);
        assert_eq!(road_class_score(Some(1)), 10);
        assert_eq!(road_class_score(Some(2)), 10);
        assert_eq!(road_class_score(Some(3)), 3);
    }

    #[test]
    fn negative_durations_fall_in_the_shortest_bucket() {
        assert_eq!(duration_score(Some(-2)), 10);
        assert_eq!(duration_score(None), 1);
    }

    #[test]
    fn columns_share_the_scoring_suffix() {
        for factor in ScoreFactor::ALL {
            assert!(factor.column().ends_with("_scoring"), "{factor:?}");
        }
    }
}
