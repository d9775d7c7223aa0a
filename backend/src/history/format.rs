//! Long-form date rendering ("April 9th, 2024").

use chrono::{Datelike, FixedOffset};
use student_living_common::StoreDate;

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Render a store date as a long-form calendar date in the given offset.
///
/// Both store representations of the same instant render identically.
/// Returns `None` for timestamps chrono cannot represent.
pub fn format_long_date(date: &StoreDate, offset: &FixedOffset) -> Option<String> {
    let local = date.to_datetime()?.with_timezone(offset);
    Some(format!(
        "{} {}{}, {}",
        local.format("%B"),
        local.day(),
        ordinal_suffix(local.day()),
        local.year()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use rstest::rstest;
    use student_living_common::StoreTimestamp;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[rstest]
    #[case(1, "st")]
    #[case(2, "nd")]
    #[case(3, "rd")]
    #[case(4, "th")]
    #[case(11, "th")]
    #[case(12, "th")]
    #[case(13, "th")]
    #[case(21, "st")]
    #[case(22, "nd")]
    #[case(23, "rd")]
    #[case(30, "th")]
    #[case(31, "st")]
    fn test_ordinal_suffix(#[case] day: u32, #[case] expected: &str) {
        assert_eq!(ordinal_suffix(day), expected);
    }

    #[test]
    fn test_native_and_plain_dates_render_identically() {
        let instant = Utc.with_ymd_and_hms(2024, 4, 9, 15, 30, 0).unwrap();
        let native = StoreDate::Timestamp(StoreTimestamp::from(instant));
        let plain = StoreDate::Instant(instant);

        assert_eq!(format_long_date(&native, &utc()).as_deref(), Some("April 9th, 2024"));
        assert_eq!(format_long_date(&plain, &utc()).as_deref(), Some("April 9th, 2024"));
    }

    #[test]
    fn test_calendar_date_renders() {
        let date = StoreDate::Date(NaiveDate::from_ymd_opt(2023, 12, 22).unwrap());
        assert_eq!(format_long_date(&date, &utc()).as_deref(), Some("December 22nd, 2023"));
    }

    #[test]
    fn test_offset_can_move_the_calendar_day() {
        let late_evening = Utc.with_ymd_and_hms(2024, 4, 9, 23, 0, 0).unwrap();
        let sast = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(
            format_long_date(&StoreDate::Instant(late_evening), &sast).as_deref(),
            Some("April 10th, 2024")
        );
    }

    #[test]
    fn test_out_of_range_timestamp() {
        let date = StoreDate::Timestamp(StoreTimestamp {
            seconds: i64::MAX,
            nanoseconds: 0,
        });
        assert_eq!(format_long_date(&date, &utc()), None);
    }
}
