//! Business-time helpers.
//!
//! Every date key in the system derives from a fixed business-timezone
//! offset, never from host-local time.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc};

/// Builds the fixed business-timezone offset from whole hours east of UTC.
/// Out-of-range values fall back to UTC; config validates the range up front.
pub fn business_offset(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
}

/// Returns the current time rendered in the business timezone.
pub fn now_business(offset: FixedOffset) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&offset)
}

/// Derives the canonical date key of a timestamp in business time.
pub fn date_key(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

/// Interprets a business-local date and wall-clock time as a UTC instant.
pub fn business_datetime(date: NaiveDate, time: NaiveTime, offset: FixedOffset) -> DateTime<Utc> {
    let local: NaiveDateTime = date.and_time(time);
    (local - Duration::seconds(offset.local_minus_utc() as i64)).and_utc()
}

/// Parses a `YYYY-MM` month selector into its first and last day.
pub fn month_bounds(month: &str) -> Option<(NaiveDate, NaiveDate)> {
    let (year, month) = month.split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = first
        .checked_add_months(chrono::Months::new(1))?
        .checked_sub_signed(Duration::days(1))?;
    Some((first, last))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plus7() -> FixedOffset {
        business_offset(7)
    }

    #[test]
    fn date_key_crosses_midnight_in_business_time() {
        // 18:30 UTC is 01:30 the next day at +07:00.
        let at = DateTime::parse_from_rfc3339("2026-02-05T18:30:00Z")
            .expect("timestamp")
            .with_timezone(&Utc);
        assert_eq!(
            date_key(at, plus7()),
            NaiveDate::from_ymd_opt(2026, 2, 6).expect("date")
        );
    }

    #[test]
    fn business_datetime_converts_back_to_utc() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 5).expect("date");
        let time = NaiveTime::from_hms_opt(8, 30, 0).expect("time");
        let at = business_datetime(date, time, plus7());
        assert_eq!(at.to_rfc3339(), "2026-02-05T01:30:00+00:00");
        assert_eq!(date_key(at, plus7()), date);
    }

    #[test]
    fn month_bounds_handles_leap_february() {
        let (first, last) = month_bounds("2024-02").expect("bounds");
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 2, 1).expect("first"));
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 2, 29).expect("last"));
    }

    #[test]
    fn month_bounds_rejects_garbage() {
        assert!(month_bounds("2026-13").is_none());
        assert!(month_bounds("2026").is_none());
        assert!(month_bounds("not-a-month").is_none());
    }
}
