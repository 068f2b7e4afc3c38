//! Timestamp parsing for embedded metadata strings.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Layout of EXIF date tags
const EXIF_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Naive layouts seen in container `creation_time` tags
const CONTAINER_NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y:%m:%d %H:%M:%S",
];

/// Offset-carrying layouts that are not valid RFC 3339
const CONTAINER_OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Parse an EXIF value such as `2024:01:15 10:30:00`.
///
/// Values that carry only a date resolve to midnight.
pub fn parse_exif_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim().trim_end_matches('\0');
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, EXIF_FORMAT) {
        return Some(parsed);
    }

    let date_part = value.split_whitespace().next()?;
    NaiveDate::parse_from_str(date_part, "%Y:%m:%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Parse a container creation time.
///
/// Zoned values keep their wall-clock reading; the offset is dropped rather
/// than converted so a clip filmed abroad lands on the day it was filmed.
pub fn parse_container_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_local());
    }

    for format in CONTAINER_OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(value, format) {
            return Some(parsed.naive_local());
        }
    }

    let naive = value.trim_end_matches(['Z', 'z']);
    for format in CONTAINER_NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(parsed);
        }
    }

    let date_part = naive.get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn ymd(value: NaiveDateTime) -> (i32, u32, u32) {
        (value.year(), value.month(), value.day())
    }

    #[test]
    fn exif_full_timestamp() {
        let parsed = parse_exif_datetime("2024:01:15 10:30:00").unwrap();
        assert_eq!(ymd(parsed), (2024, 1, 15));
        assert_eq!(parsed.hour(), 10);
    }

    #[test]
    fn exif_date_only_and_trailing_nul() {
        let parsed = parse_exif_datetime("2023:06:01").unwrap();
        assert_eq!(ymd(parsed), (2023, 6, 1));
        assert_eq!(parsed.hour(), 0);

        let parsed = parse_exif_datetime("2022:12:31 23:59:59\0").unwrap();
        assert_eq!(ymd(parsed), (2022, 12, 31));
    }

    #[test]
    fn exif_garbage_is_rejected() {
        assert!(parse_exif_datetime("").is_none());
        assert!(parse_exif_datetime("0000:00:00 00:00:00").is_none());
        assert!(parse_exif_datetime("not a date").is_none());
    }

    #[test]
    fn container_formats() {
        let cases = [
            "2024-01-15T10:30:00.000000Z",
            "2024-01-15T10:30:00Z",
            "2024-01-15T10:30:00+02:00",
            "2024-01-15T10:30:00+0200",
            "2024-01-15T10:30:00",
            "2024-01-15 10:30:00",
            "2024:01:15 10:30:00",
        ];
        for case in cases {
            let parsed = parse_container_datetime(case)
                .unwrap_or_else(|| panic!("failed to parse {case}"));
            assert_eq!(ymd(parsed), (2024, 1, 15), "{case}");
            assert_eq!(parsed.hour(), 10, "{case}");
        }
    }

    #[test]
    fn container_offset_keeps_wall_clock() {
        let parsed = parse_container_datetime("2024-01-15T23:30:00-05:00").unwrap();
        assert_eq!(ymd(parsed), (2024, 1, 15));
    }

    #[test]
    fn container_date_only_fallback() {
        let parsed = parse_container_datetime("2023-06-01").unwrap();
        assert_eq!(ymd(parsed), (2023, 6, 1));
        assert!(parse_container_datetime("garbage").is_none());
        assert!(parse_container_datetime("   ").is_none());
    }
}
