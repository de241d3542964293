use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Timestamp layout expected by the open-data sink. Seconds are always zeroed.
pub const CANONICAL_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:00.000";

const DATETIME_FORMATS: [&str; 12] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%m-%d-%Y %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y", "%Y/%m/%d", "%d-%b-%Y"];

/// Parses the mixed timestamp layouts found in the extracts. Offsets are
/// dropped and the wall-clock time is kept.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_local());
    }

    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
    {
        return Some(dt);
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

pub fn canonical_timestamp(value: NaiveDateTime) -> String {
    value.format(CANONICAL_TIMESTAMP).to_string()
}

/// Integers exported as floats (`"2.0"`) are accepted; fractions truncate.
pub fn parse_count(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if let Ok(count) = trimmed.parse::<i64>() {
        return Some(count);
    }

    trimmed
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
        .map(|number| number.trunc() as i64)
}

pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" | "1.0" => Some(true),
        "false" | "f" | "no" | "n" | "0" | "0.0" => Some(false),
        _ => None,
    }
}

/// Strips whitespace and the `.0` suffix that numeric keys pick up when an
/// extract round-trips through a float column.
pub(crate) fn normalize_identifier(value: &str) -> String {
    let trimmed = value.trim();
    if let Some((whole, fraction)) = trimmed.split_once('.') {
        let integral = !whole.is_empty() && whole.chars().all(|c| c.is_ascii_digit());
        let zeros = !fraction.is_empty() && fraction.chars().all(|c| c == '0');
        if integral && zeros {
            return whole.to_string();
        }
    }
    trimmed.to_string()
}
