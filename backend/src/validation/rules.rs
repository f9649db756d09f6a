//! Common validation rules shared across request payloads.

use crate::error::AppError;

/// Longest accepted free-text reason on a request.
pub const MAX_REASON_LENGTH: usize = 1000;

/// Longest accepted leave span in calendar days (inclusive).
pub const MAX_LEAVE_SPAN_DAYS: i64 = 30;

/// Hard cap on page size for listings.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Validates the free-text reason attached to a request.
pub fn validate_reason(reason: &str) -> Result<(), AppError> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("reason is required".into()));
    }
    if reason.chars().count() > MAX_REASON_LENGTH {
        return Err(AppError::BadRequest(format!(
            "reason must be at most {} characters",
            MAX_REASON_LENGTH
        )));
    }
    Ok(())
}

/// Normalizes pagination input: page below 1 becomes 1, limit is clamped to
/// `1..=MAX_PAGE_LIMIT`.
pub fn clamp_page_limit(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(20).clamp(1, MAX_PAGE_LIMIT);
    (page, limit)
}

/// Inclusive number of calendar days between two dates.
pub fn span_days(start: chrono::NaiveDate, end: chrono::NaiveDate) -> i64 {
    (end - start).num_days() + 1
}
