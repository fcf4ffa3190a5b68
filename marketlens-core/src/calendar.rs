//! Timestamp normalization onto the naive daily calendar.
//!
//! Providers report dates as plain `YYYY-MM-DD`, RFC 3339 timestamps with an
//! offset, or epoch seconds/milliseconds. Everything is reduced to a
//! `NaiveDate` in the exchange's local wall-clock time before it enters a
//! `TimeSeries`, so series from different providers line up on merge.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, Weekday};

/// Parse a provider date string.
///
/// Offsets are dropped without converting: `2024-03-01T23:00:00-05:00`
/// is March 1st local, not March 2nd UTC.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local().date());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    None
}

/// Epoch seconds → local date at the given GMT offset (seconds east of UTC).
pub fn date_from_epoch_secs(secs: i64, gmt_offset_secs: i32) -> Option<NaiveDate> {
    let offset = FixedOffset::east_opt(gmt_offset_secs)?;
    DateTime::from_timestamp(secs, 0).map(|dt| dt.with_timezone(&offset).date_naive())
}

/// Epoch milliseconds (as reported by chart JSON feeds) → UTC date.
pub fn date_from_epoch_millis(millis: f64) -> Option<NaiveDate> {
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64).map(|dt| dt.date_naive())
}

/// The business day before `today` (Mon → previous Fri, weekends → Fri).
pub fn previous_business_day(today: NaiveDate) -> NaiveDate {
    let back = match today.weekday() {
        Weekday::Mon => 3,
        Weekday::Sun => 2,
        _ => 1,
    };
    today - Duration::days(back)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn plain_dates_pass_through() {
        assert_eq!(parse_date("2024-03-01"), Some(d(2024, 3, 1)));
        assert_eq!(parse_date(" 2024-03-01 "), Some(d(2024, 3, 1)));
    }

    #[test]
    fn offset_timestamps_keep_local_date() {
        assert_eq!(parse_date("2024-03-01T23:00:00-05:00"), Some(d(2024, 3, 1)));
        assert_eq!(parse_date("2024-03-01T00:00:00Z"), Some(d(2024, 3, 1)));
        assert_eq!(parse_date("2024-03-01T09:30:00+09:00"), Some(d(2024, 3, 1)));
    }

    #[test]
    fn naive_timestamps_parse() {
        assert_eq!(parse_date("2024-03-01 16:00:00"), Some(d(2024, 3, 1)));
        assert_eq!(parse_date("2024-03-01T16:00:00"), Some(d(2024, 3, 1)));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn epoch_seconds_use_exchange_offset() {
        // 2024-03-01 13:30 UTC; the New York open at -05:00 is still March 1st,
        // Tokyo at +09:00 is already 22:30 March 1st.
        let ts = 1_709_299_800;
        assert_eq!(date_from_epoch_secs(ts, -5 * 3600), Some(d(2024, 3, 1)));
        assert_eq!(date_from_epoch_secs(ts, 9 * 3600), Some(d(2024, 3, 1)));
        // 2024-03-01 02:00 UTC is February 29th in New York.
        assert_eq!(
            date_from_epoch_secs(1_709_258_400, -5 * 3600),
            Some(d(2024, 2, 29))
        );
    }

    #[test]
    fn epoch_millis_convert() {
        assert_eq!(date_from_epoch_millis(1_709_258_400_000.0), Some(d(2024, 3, 1)));
        assert_eq!(date_from_epoch_millis(f64::NAN), None);
    }

    #[test]
    fn previous_business_day_skips_weekends() {
        assert_eq!(previous_business_day(d(2024, 3, 4)), d(2024, 3, 1)); // Mon
        assert_eq!(previous_business_day(d(2024, 3, 3)), d(2024, 3, 1)); // Sun
        assert_eq!(previous_business_day(d(2024, 3, 2)), d(2024, 3, 1)); // Sat
        assert_eq!(previous_business_day(d(2024, 3, 5)), d(2024, 3, 4)); // Tue
    }
}
