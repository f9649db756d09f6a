//! Calendar service: weekend/holiday classification and workday counting in
//! business time.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::HashSet;

use crate::db::connection::DbPool;
use crate::error::AppError;
use crate::repositories::HolidayRepository;

/// Classification of a single business date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayClass {
    Workday,
    Weekend,
    Holiday,
}

impl DayClass {
    /// Weekends and holidays both suppress attendance expectations.
    pub fn is_non_workday(&self) -> bool {
        !matches!(self, DayClass::Workday)
    }
}

/// Saturday and Sunday are non-working in business time.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Pure workday count over an inclusive range given the holiday set.
pub fn count_workdays(from: NaiveDate, to: NaiveDate, holidays: &HashSet<NaiveDate>) -> i64 {
    from.iter_days()
        .take_while(|date| *date <= to)
        .filter(|date| !is_weekend(*date) && !holidays.contains(date))
        .count() as i64
}

#[async_trait]
pub trait CalendarServiceTrait: Send + Sync {
    /// Classifies one date against the weekend rule and the holiday store.
    async fn classify(&self, date: NaiveDate) -> Result<DayClass, AppError>;

    /// Holiday dates within an inclusive range.
    async fn holidays_in(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<HashSet<NaiveDate>, AppError>;

    /// Workdays within an inclusive range: every day that is neither a
    /// weekend nor a stored holiday.
    async fn workdays_between(&self, from: NaiveDate, to: NaiveDate) -> Result<i64, AppError> {
        let holidays = self.holidays_in(from, to).await?;
        Ok(count_workdays(from, to, &holidays))
    }
}

/// Store-backed calendar.
pub struct CalendarService {
    pool: DbPool,
}

impl CalendarService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CalendarServiceTrait for CalendarService {
    async fn classify(&self, date: NaiveDate) -> Result<DayClass, AppError> {
        if is_weekend(date) {
            return Ok(DayClass::Weekend);
        }
        let repo = HolidayRepository::new();
        if repo.exists_on(&self.pool, date).await? {
            return Ok(DayClass::Holiday);
        }
        Ok(DayClass::Workday)
    }

    async fn holidays_in(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<HashSet<NaiveDate>, AppError> {
        let repo = HolidayRepository::new();
        let dates = repo.dates_in_range(&self.pool, from, to).await?;
        Ok(dates.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    #[test]
    fn weekend_detection_matches_the_calendar() {
        assert!(is_weekend(date(2026, 2, 7))); // Saturday
        assert!(is_weekend(date(2026, 2, 8))); // Sunday
        assert!(!is_weekend(date(2026, 2, 9))); // Monday
    }

    #[test]
    fn count_workdays_excludes_weekends_and_holidays() {
        // 2026-02-02 (Mon) .. 2026-02-08 (Sun): five weekdays.
        let mut holidays = HashSet::new();
        assert_eq!(count_workdays(date(2026, 2, 2), date(2026, 2, 8), &holidays), 5);

        holidays.insert(date(2026, 2, 4));
        assert_eq!(count_workdays(date(2026, 2, 2), date(2026, 2, 8), &holidays), 4);

        // A holiday falling on a weekend changes nothing.
        holidays.insert(date(2026, 2, 7));
        assert_eq!(count_workdays(date(2026, 2, 2), date(2026, 2, 8), &holidays), 4);
    }

    #[test]
    fn count_workdays_handles_single_day_ranges() {
        let holidays = HashSet::new();
        assert_eq!(count_workdays(date(2026, 2, 9), date(2026, 2, 9), &holidays), 1);
        assert_eq!(count_workdays(date(2026, 2, 7), date(2026, 2, 7), &holidays), 0);
    }

    struct FixedCalendar {
        holidays: HashSet<NaiveDate>,
    }

    #[async_trait]
    impl CalendarServiceTrait for FixedCalendar {
        async fn classify(&self, date: NaiveDate) -> Result<DayClass, AppError> {
            if is_weekend(date) {
                Ok(DayClass::Weekend)
            } else if self.holidays.contains(&date) {
                Ok(DayClass::Holiday)
            } else {
                Ok(DayClass::Workday)
            }
        }

        async fn holidays_in(
            &self,
            from: NaiveDate,
            to: NaiveDate,
        ) -> Result<HashSet<NaiveDate>, AppError> {
            Ok(self
                .holidays
                .iter()
                .copied()
                .filter(|d| *d >= from && *d <= to)
                .collect())
        }
    }

    #[tokio::test]
    async fn workdays_between_uses_the_holiday_store() {
        let calendar = FixedCalendar {
            holidays: [date(2026, 2, 4)].into_iter().collect(),
        };
        let workdays = calendar
            .workdays_between(date(2026, 2, 2), date(2026, 2, 8))
            .await
            .expect("count");
        assert_eq!(workdays, 4);
    }
}
