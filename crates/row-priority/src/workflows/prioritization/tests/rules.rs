use super::common::*;
use crate::workflows::prioritization::{
    active_deficiencies_score, count_segment_score, dapcz_score, duration_score,
    recent_inspection_score, road_class_score,
};

#[test]
fn duration_buckets_are_inclusive_at_their_upper_edge() {
    let cases = [(6, 10), (7, 5), (15, 5), (16, 3), (30, 3), (31, 1), (0, 10), (365, 1)];
    for (days, expected) in cases {
        assert_eq!(duration_score(Some(days)), expected, "{days} day(s)");
    }
}

#[test]
fn road_classes_map_to_their_weights() {
    assert_eq!(road_class_score(Some(4)), 10);
    assert_eq!(road_class_score(Some(5)), 7);
    assert_eq!(road_class_score(Some(8)), 5);
    assert_eq!(road_class_score(Some(99)), 3);
}

#[test]
fn segment_count_rewards_multi_segment_permits() {
    assert_eq!(count_segment_score(0), 0);
    assert_eq!(count_segment_score(1), 5);
    assert_eq!(count_segment_score(2), 10);
    assert_eq!(count_segment_score(12), 10);
}

#[test]
fn special_zone_and_deficiencies_are_flat_bonuses() {
    assert_eq!(dapcz_score(Some("DAPCZ")), 10);
    assert_eq!(dapcz_score(None), 0);
    assert_eq!(active_deficiencies_score(Some(2)), 5);
    assert_eq!(active_deficiencies_score(Some(0)), 0);
    assert_eq!(active_deficiencies_score(None), 0);
}

#[test]
fn recent_inspection_window_counts_calendar_days() {
    let now = now();
    assert_eq!(recent_inspection_score(Some(at(2024, 3, 15, 9, 0)), now, 7), 5);
    assert_eq!(recent_inspection_score(Some(at(2024, 3, 9, 0, 0)), now, 7), 5);
    assert_eq!(recent_inspection_score(Some(at(2024, 3, 8, 0, 0)), now, 7), 0);
    assert_eq!(recent_inspection_score(Some(at(2024, 3, 8, 23, 59)), now, 7), 0);
    assert_eq!(recent_inspection_score(None, now, 7), 0);
}

#[test]
fn future_inspections_do_not_count_as_recent() {
    let now = now();
    assert_eq!(recent_inspection_score(Some(at(2024, 3, 15, 12, 1)), now, 7), 0);
    assert_eq!(recent_inspection_score(Some(at(2024, 3, 16, 8, 0)), now, 7), 0);
}

#[test]
fn recent_inspection_window_is_configurable() {
    let inspected = Some(at(2024, 3, 1, 10, 0));
    assert_eq!(recent_inspection_score(inspected, now(), 7), 0);
    assert_eq!(recent_inspection_score(inspected, now(), 14), 0);
    assert_eq!(recent_inspection_score(inspected, now(), 15), 5);
}

#[test]
fn recent_window_covers_exactly_seven_calendar_dates() {
    let now = now();
    let qualifying: Vec<u32> = (1..=16)
        .filter(|day| recent_inspection_score(Some(at(2024, 3, *day, 12, 0)), now, 7) == 5)
        .collect();
    assert_eq!(qualifying, [9, 10, 11, 12, 13, 14, 15]);
}
