//! Request repository.
//!
//! Status transitions are compare-and-set: every approve/reject update is
//! gated on `status = 'pending'`, so of two racing approvers exactly one
//! wins and the loser observes zero rows. The adjust-time approval couples
//! the status flip with the attendance upsert in one transaction.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use crate::error::AppError;
use crate::models::attendance::Attendance;
use crate::models::request::Request;
use crate::repositories::repository::{transaction, Repository};
use crate::types::{RequestId, UserId};

const TABLE_NAME: &str = "requests";
const SELECT_COLUMNS: &str = "id, user_id, request_type, status, date, check_in_date, \
check_out_date, requested_check_in_at, requested_check_out_at, leave_start_date, \
leave_end_date, leave_type, leave_days_count, estimated_end_time, actual_ot_minutes, \
reason, approved_by, approved_at, created_at, updated_at";

const ATTENDANCE_COLUMNS: &str =
    "id, user_id, date, check_in_at, check_out_at, ot_approved, created_at, updated_at";

#[derive(Debug, Default, Clone, Copy)]
pub struct RequestRepository;

impl RequestRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_by_user(
        &self,
        db: &PgPool,
        user_id: UserId,
    ) -> Result<Vec<Request>, AppError> {
        let query = format!(
            "SELECT {} FROM {} WHERE user_id = $1 ORDER BY created_at DESC",
            SELECT_COLUMNS, TABLE_NAME
        );
        let rows = sqlx::query_as::<_, Request>(&query)
            .bind(user_id)
            .fetch_all(db)
            .await?;
        Ok(rows)
    }

    /// Pending requests visible to an approver. A manager sees submissions
    /// from live users of one team; an admin passes `None` and sees all.
    pub async fn find_pending_for_approver(
        &self,
        db: &PgPool,
        team_id: Option<crate::types::TeamId>,
    ) -> Result<Vec<Request>, AppError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM {} r WHERE r.status = 'pending'",
            prefixed_columns("r"),
            TABLE_NAME
        ));
        if let Some(team_id) = team_id {
            builder
                .push(
                    " AND EXISTS (SELECT 1 FROM users u WHERE u.id = r.user_id \
                     AND u.deleted_at IS NULL AND u.team_id = ",
                )
                .push_bind(team_id)
                .push(")");
        }
        builder.push(" ORDER BY r.created_at DESC");
        let rows = builder.build_query_as::<Request>().fetch_all(db).await?;
        Ok(rows)
    }

    /// An APPROVED or PENDING leave whose range intersects the given one.
    /// Adjacent ranges (touching only at the day boundary outside the range)
    /// do not intersect and are allowed.
    pub async fn find_overlapping_leave(
        &self,
        db: &PgPool,
        user_id: UserId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Option<Request>, AppError> {
        let query = format!(
            "SELECT {} FROM {} WHERE user_id = $1 AND request_type = 'leave' \
             AND status IN ('pending', 'approved') \
             AND leave_start_date <= $2 AND leave_end_date >= $3 \
             ORDER BY created_at LIMIT 1",
            SELECT_COLUMNS, TABLE_NAME
        );
        let row = sqlx::query_as::<_, Request>(&query)
            .bind(user_id)
            .bind(end_date)
            .bind(start_date)
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    /// Approves a request with no attendance side-effects (LEAVE and
    /// OT_REQUEST). Returns the updated row, or `None` when the request was
    /// no longer pending.
    pub async fn approve_simple(
        &self,
        db: &PgPool,
        id: RequestId,
        approver_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Request>, AppError> {
        let query = format!(
            "UPDATE {} SET status = 'approved', approved_by = $1, approved_at = $2, \
             updated_at = $2 WHERE id = $3 AND status = 'pending' RETURNING {}",
            TABLE_NAME, SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, Request>(&query)
            .bind(approver_id)
            .bind(now)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    /// Rejects a pending request. Same CAS shape as approval.
    pub async fn reject(
        &self,
        db: &PgPool,
        id: RequestId,
        approver_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Request>, AppError> {
        let query = format!(
            "UPDATE {} SET status = 'rejected', approved_by = $1, approved_at = $2, \
             updated_at = $2 WHERE id = $3 AND status = 'pending' RETURNING {}",
            TABLE_NAME, SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, Request>(&query)
            .bind(approver_id)
            .bind(now)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    /// Approves an adjust-time request and applies it to attendance as one
    /// atomic compound write. The anchor is re-resolved and the submission
    /// window re-checked inside the transaction; any failure rolls the
    /// status flip back.
    pub async fn approve_adjust_time(
        &self,
        db: &PgPool,
        id: RequestId,
        approver_id: UserId,
        now: DateTime<Utc>,
        grace_hours: i64,
        submit_window_days: i64,
    ) -> Result<Request, AppError> {
        let mut tx = transaction::begin_transaction(db).await?;

        let query = format!(
            "UPDATE {} SET status = 'approved', approved_by = $1, approved_at = $2, \
             updated_at = $2 WHERE id = $3 AND status = 'pending' RETURNING {}",
            TABLE_NAME, SELECT_COLUMNS
        );
        let request = sqlx::query_as::<_, Request>(&query)
            .bind(approver_id)
            .bind(now)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::Conflict("Request has already been processed".into()))?;

        let date = request
            .date
            .ok_or_else(|| AppError::Conflict("Adjust-time request has no nominal date".into()))?;

        let existing = sqlx::query_as::<_, Attendance>(&format!(
            "SELECT {} FROM attendance WHERE user_id = $1 AND date = $2 FOR UPDATE",
            ATTENDANCE_COLUMNS
        ))
        .bind(request.user_id)
        .bind(date)
        .fetch_optional(&mut *tx)
        .await?;

        let anchor = request
            .requested_check_in_at
            .or(existing.as_ref().map(|a| a.check_in_at))
            .ok_or_else(|| {
                AppError::BadRequest("Missing check-in reference for this date".into())
            })?;

        if now - anchor > Duration::days(submit_window_days) {
            return Err(AppError::BadRequest(format!(
                "Request submitted more than {} days after check-in",
                submit_window_days
            )));
        }

        if let Some(check_out_at) = request.requested_check_out_at {
            if check_out_at - anchor > Duration::hours(grace_hours) {
                return Err(AppError::BadRequest(format!(
                    "Session exceeds {} hours",
                    grace_hours
                )));
            }
        }

        apply_adjustment(&mut tx, &request, existing.as_ref(), date, now).await?;

        transaction::commit_transaction(tx).await?;
        Ok(request)
    }

    /// Writes the measured overtime minutes back onto an approved overtime
    /// request at checkout time.
    pub async fn record_actual_ot_minutes(
        &self,
        db: &PgPool,
        user_id: UserId,
        date: NaiveDate,
        minutes: i64,
    ) -> Result<bool, AppError> {
        let query = format!(
            "UPDATE {} SET actual_ot_minutes = $1, updated_at = $2 \
             WHERE user_id = $3 AND date = $4 AND request_type = 'ot_request' \
             AND status = 'approved'",
            TABLE_NAME
        );
        let result = sqlx::query(&query)
            .bind(minutes as i32)
            .bind(Utc::now())
            .bind(user_id)
            .bind(date)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Applies the requested times to attendance. Creation uses the requested
/// pair; a checkout-only request closes the existing record; a checkin-only
/// request overwrites the check-in. Guards keep check-out after check-in.
async fn apply_adjustment(
    tx: &mut Transaction<'_, Postgres>,
    request: &Request,
    existing: Option<&Attendance>,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    match existing {
        None => {
            // Validated at creation: a checkout-only request never gets here
            // without an anchor, so a check-in is present.
            let check_in_at = request.requested_check_in_at.ok_or_else(|| {
                AppError::BadRequest("Missing check-in reference for this date".into())
            })?;
            if let Some(check_out_at) = request.requested_check_out_at {
                if check_out_at <= check_in_at {
                    return Err(AppError::Conflict(
                        "Adjusted check-out must be after check-in".into(),
                    ));
                }
            }
            let record = Attendance {
                check_out_at: request.requested_check_out_at,
                ..Attendance::new(request.user_id, date, check_in_at)
            };
            sqlx::query(&format!(
                "INSERT INTO attendance ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                ATTENDANCE_COLUMNS
            ))
            .bind(record.id)
            .bind(record.user_id)
            .bind(record.date)
            .bind(record.check_in_at)
            .bind(record.check_out_at)
            .bind(record.ot_approved)
            .bind(record.created_at)
            .bind(record.updated_at)
            .execute(&mut **tx)
            .await?;
        }
        Some(existing) => {
            let check_in_at = request.requested_check_in_at.unwrap_or(existing.check_in_at);
            let check_out_at = request.requested_check_out_at.or(existing.check_out_at);
            if let Some(check_out_at) = check_out_at {
                if check_out_at <= check_in_at {
                    return Err(AppError::Conflict(
                        "Adjusted check-out must be after check-in".into(),
                    ));
                }
            }
            let updated = sqlx::query(
                "UPDATE attendance SET check_in_at = $1, check_out_at = $2, updated_at = $3 \
                 WHERE id = $4 AND ($2::timestamptz IS NULL OR $2 > $1)",
            )
            .bind(check_in_at)
            .bind(check_out_at)
            .bind(now)
            .bind(existing.id)
            .execute(&mut **tx)
            .await?;
            if updated.rows_affected() == 0 {
                return Err(AppError::Conflict(
                    "Adjusted check-out must be after check-in".into(),
                ));
            }
        }
    }
    Ok(())
}

fn prefixed_columns(alias: &str) -> String {
    SELECT_COLUMNS
        .split(", ")
        .map(|column| format!("{}.{}", alias, column))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Repository<Request> for RequestRepository {
    const TABLE: &'static str = TABLE_NAME;
    type Id = RequestId;

    async fn find_by_id(&self, db: &PgPool, id: RequestId) -> Result<Request, AppError> {
        let query = format!("SELECT {} FROM {} WHERE id = $1", SELECT_COLUMNS, TABLE_NAME);
        let result = sqlx::query_as::<_, Request>(&query)
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::NotFound("Request not found".into()))?;
        Ok(result)
    }

    /// The partial unique indexes on pending (user, date, type) pairs turn a
    /// duplicate pending submission into a conflict here.
    async fn create(&self, db: &PgPool, item: &Request) -> Result<Request, AppError> {
        let query = format!(
            "INSERT INTO {} (id, user_id, request_type, status, date, check_in_date, \
             check_out_date, requested_check_in_at, requested_check_out_at, leave_start_date, \
             leave_end_date, leave_type, leave_days_count, estimated_end_time, actual_ot_minutes, \
             reason, approved_by, approved_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19, $20) RETURNING {}",
            TABLE_NAME, SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, Request>(&query)
            .bind(item.id)
            .bind(item.user_id)
            .bind(item.request_type.db_value())
            .bind(item.status.db_value())
            .bind(item.date)
            .bind(item.check_in_date)
            .bind(item.check_out_date)
            .bind(item.requested_check_in_at)
            .bind(item.requested_check_out_at)
            .bind(item.leave_start_date)
            .bind(item.leave_end_date)
            .bind(item.leave_type.map(|t| t.db_value()))
            .bind(item.leave_days_count)
            .bind(item.estimated_end_time)
            .bind(item.actual_ot_minutes)
            .bind(&item.reason)
            .bind(item.approved_by)
            .bind(item.approved_at)
            .bind(item.created_at)
            .bind(item.updated_at)
            .fetch_one(db)
            .await?;
        Ok(row)
    }

    async fn delete(&self, db: &PgPool, id: RequestId) -> Result<(), AppError> {
        let query = format!("DELETE FROM {} WHERE id = $1", TABLE_NAME);
        sqlx::query(&query).bind(id).execute(db).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_select_columns_include_variant_fields() {
        assert!(SELECT_COLUMNS.contains("requested_check_out_at"));
        assert!(SELECT_COLUMNS.contains("leave_days_count"));
        assert!(SELECT_COLUMNS.contains("actual_ot_minutes"));
    }

    #[test]
    fn prefixed_columns_qualifies_every_column() {
        let prefixed = prefixed_columns("r");
        assert!(prefixed.starts_with("r.id"));
        assert!(prefixed.contains("r.leave_type"));
        assert!(!prefixed.contains(", id"));
    }
}
