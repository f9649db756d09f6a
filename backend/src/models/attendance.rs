//! Models for per-day work sessions and the status derived from them.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::types::{AttendanceId, UserId};
use crate::utils::time::business_datetime;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
/// A single work session on a user's nominal date. A session may cross
/// midnight; `date` always names the check-in's business day.
pub struct Attendance {
    /// Unique identifier for the attendance record.
    pub id: AttendanceId,
    /// Identifier of the employee that owns the record.
    pub user_id: UserId,
    /// Nominal business day the session belongs to.
    pub date: NaiveDate,
    /// Instant the employee checked in.
    pub check_in_at: DateTime<Utc>,
    /// Instant the employee checked out, once recorded.
    pub check_out_at: Option<DateTime<Utc>>,
    /// Set when an approved overtime request covers this session.
    pub ot_approved: bool,
    /// Creation timestamp for auditing.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp for auditing.
    pub updated_at: DateTime<Utc>,
}

impl Attendance {
    /// Builds a new open session starting at `check_in_at`.
    pub fn new(user_id: UserId, date: NaiveDate, check_in_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id: AttendanceId::new(),
            user_id,
            date,
            check_in_at,
            check_out_at: None,
            ot_approved: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` while no check-out has been recorded.
    pub fn is_open(&self) -> bool {
        self.check_out_at.is_none()
    }

    /// An open session older than the grace window can no longer be closed by
    /// the employee and needs administrator attention.
    pub fn is_stale(&self, now: DateTime<Utc>, grace_hours: i64) -> bool {
        self.is_open() && now - self.check_in_at > Duration::hours(grace_hours)
    }
}

/// Wall-clock boundaries of the business day, taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct ShiftTimes {
    pub shift_start: NaiveTime,
    pub shift_end: NaiveTime,
    pub ot_start: NaiveTime,
    pub min_ot_duration_minutes: i64,
}

impl ShiftTimes {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            shift_start: config.shift_start,
            shift_end: config.shift_end,
            ot_start: config.ot_start,
            min_ot_duration_minutes: config.min_ot_duration_minutes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
/// Status derived for a (user, date) pair when reading attendance.
pub enum DayStatus {
    WeekendOrHoliday,
    Absent,
    Working,
    MissingCheckout,
    OnTime,
    Late,
    EarlyLeave,
    LateAndEarly,
}

/// Derives the per-day status for `date` given the attendance record (if
/// any). Returns `None` for future days and for today before check-in.
pub fn derive_day_status(
    record: Option<&Attendance>,
    date: NaiveDate,
    today: NaiveDate,
    is_non_workday: bool,
    shift: &ShiftTimes,
    offset: FixedOffset,
) -> Option<DayStatus> {
    if is_non_workday {
        return Some(DayStatus::WeekendOrHoliday);
    }

    let record = match record {
        Some(record) => record,
        None => {
            return if date < today {
                Some(DayStatus::Absent)
            } else {
                None
            };
        }
    };

    let check_out_at = match record.check_out_at {
        Some(check_out_at) => check_out_at,
        None => {
            return if date < today {
                Some(DayStatus::MissingCheckout)
            } else if date == today {
                Some(DayStatus::Working)
            } else {
                None
            };
        }
    };

    let shift_start = business_datetime(date, shift.shift_start, offset);
    let shift_end = business_datetime(date, shift.shift_end, offset);
    let late = record.check_in_at > shift_start;
    let early = check_out_at < shift_end;

    Some(match (late, early) {
        (true, true) => DayStatus::LateAndEarly,
        (true, false) => DayStatus::Late,
        (false, true) => DayStatus::EarlyLeave,
        (false, false) => DayStatus::OnTime,
    })
}

/// Overtime accrues from 17:31 business time on the check-in's nominal date,
/// continuously through midnight, and only counts once checked out. Sessions
/// below the minimum duration contribute nothing.
pub fn overtime_minutes(record: &Attendance, shift: &ShiftTimes, offset: FixedOffset) -> i64 {
    let check_out_at = match record.check_out_at {
        Some(check_out_at) => check_out_at,
        None => return 0,
    };

    let ot_start = business_datetime(record.date, shift.ot_start, offset);
    let minutes = (check_out_at - ot_start).num_minutes();
    if minutes < shift.min_ot_duration_minutes {
        0
    } else {
        minutes
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// API representation of an attendance record.
pub struct AttendanceResponse {
    pub id: AttendanceId,
    pub user_id: UserId,
    pub date: NaiveDate,
    pub check_in_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out_at: Option<DateTime<Utc>>,
    pub ot_approved: bool,
}

impl From<Attendance> for AttendanceResponse {
    fn from(a: Attendance) -> Self {
        Self {
            id: a.id,
            user_id: a.user_id,
            date: a.date,
            check_in_at: a.check_in_at,
            check_out_at: a.check_out_at,
            ot_approved: a.ot_approved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time::business_offset;

    fn plus7() -> FixedOffset {
        business_offset(7)
    }

    fn shift() -> ShiftTimes {
        ShiftTimes {
            shift_start: NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
            shift_end: NaiveTime::from_hms_opt(17, 30, 0).unwrap(),
            ot_start: NaiveTime::from_hms_opt(17, 31, 0).unwrap(),
            min_ot_duration_minutes: 30,
        }
    }

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .expect("timestamp")
            .with_timezone(&Utc)
    }

    fn session(date: (i32, u32, u32), check_in: &str, check_out: Option<&str>) -> Attendance {
        let mut record = Attendance::new(
            UserId::new(),
            NaiveDate::from_ymd_opt(date.0, date.1, date.2).expect("date"),
            at(check_in),
        );
        record.check_out_at = check_out.map(at);
        record
    }

    #[test]
    fn weekend_or_holiday_wins_over_everything() {
        let record = session((2026, 2, 7), "2026-02-07T08:00:00+07:00", None);
        let date = record.date;
        let status = derive_day_status(Some(&record), date, date, true, &shift(), plus7());
        assert_eq!(status, Some(DayStatus::WeekendOrHoliday));
    }

    #[test]
    fn missing_record_is_absent_only_in_the_past() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 6).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2026, 2, 5).unwrap();
        let tomorrow = NaiveDate::from_ymd_opt(2026, 2, 7).unwrap();

        assert_eq!(
            derive_day_status(None, yesterday, today, false, &shift(), plus7()),
            Some(DayStatus::Absent)
        );
        assert_eq!(
            derive_day_status(None, today, today, false, &shift(), plus7()),
            None
        );
        assert_eq!(
            derive_day_status(None, tomorrow, today, false, &shift(), plus7()),
            None
        );
    }

    #[test]
    fn open_session_is_working_today_and_missing_checkout_later() {
        let record = session((2026, 2, 5), "2026-02-05T08:30:00+07:00", None);
        let date = record.date;
        let tomorrow = NaiveDate::from_ymd_opt(2026, 2, 6).unwrap();

        assert_eq!(
            derive_day_status(Some(&record), date, date, false, &shift(), plus7()),
            Some(DayStatus::Working)
        );
        assert_eq!(
            derive_day_status(Some(&record), date, tomorrow, false, &shift(), plus7()),
            Some(DayStatus::MissingCheckout)
        );
    }

    #[test]
    fn closed_session_classifies_late_and_early() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 5).unwrap();
        let cases = [
            ("2026-02-05T08:30:00+07:00", "2026-02-05T17:30:00+07:00", DayStatus::OnTime),
            ("2026-02-05T08:31:00+07:00", "2026-02-05T17:30:00+07:00", DayStatus::Late),
            ("2026-02-05T08:00:00+07:00", "2026-02-05T17:00:00+07:00", DayStatus::EarlyLeave),
            ("2026-02-05T09:00:00+07:00", "2026-02-05T16:00:00+07:00", DayStatus::LateAndEarly),
        ];

        for (check_in, check_out, expected) in cases {
            let record = session((2026, 2, 5), check_in, Some(check_out));
            let status = derive_day_status(Some(&record), date, date, false, &shift(), plus7());
            assert_eq!(status, Some(expected), "{check_in} .. {check_out}");
        }
    }

    #[test]
    fn cross_midnight_checkout_is_never_early() {
        let record = session(
            (2026, 2, 5),
            "2026-02-05T22:00:00+07:00",
            Some("2026-02-06T02:00:00+07:00"),
        );
        let status = derive_day_status(
            Some(&record),
            record.date,
            NaiveDate::from_ymd_opt(2026, 2, 6).unwrap(),
            false,
            &shift(),
            plus7(),
        );
        assert_eq!(status, Some(DayStatus::Late));
    }

    #[test]
    fn overtime_accrues_through_midnight_from_the_nominal_date() {
        // Check-in 22:00, check-out 02:00 the next day: OT runs from 17:31 on
        // the nominal date, 8h29m = 509 minutes.
        let record = session(
            (2026, 2, 5),
            "2026-02-05T22:00:00+07:00",
            Some("2026-02-06T02:00:00+07:00"),
        );
        assert_eq!(overtime_minutes(&record, &shift(), plus7()), 509);
    }

    #[test]
    fn overtime_below_minimum_counts_as_zero() {
        let record = session(
            (2026, 2, 5),
            "2026-02-05T08:30:00+07:00",
            Some("2026-02-05T17:55:00+07:00"),
        );
        // 24 minutes past 17:31 is below the 30-minute threshold.
        assert_eq!(overtime_minutes(&record, &shift(), plus7()), 0);

        let record = session(
            (2026, 2, 5),
            "2026-02-05T08:30:00+07:00",
            Some("2026-02-05T18:01:00+07:00"),
        );
        assert_eq!(overtime_minutes(&record, &shift(), plus7()), 30);
    }

    #[test]
    fn open_session_accrues_no_overtime() {
        let record = session((2026, 2, 5), "2026-02-05T08:30:00+07:00", None);
        assert_eq!(overtime_minutes(&record, &shift(), plus7()), 0);
    }

    #[test]
    fn staleness_follows_the_grace_window() {
        let record = session((2026, 2, 3), "2026-02-03T09:00:00+07:00", None);
        let within = at("2026-02-04T08:00:00+07:00");
        let beyond = at("2026-02-05T17:00:00+07:00");

        assert!(!record.is_stale(within, 24));
        assert!(record.is_stale(beyond, 24));

        let closed = session(
            (2026, 2, 3),
            "2026-02-03T09:00:00+07:00",
            Some("2026-02-03T18:00:00+07:00"),
        );
        assert!(!closed.is_stale(beyond, 24));
    }
}
