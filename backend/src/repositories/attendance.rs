//! Attendance repository.
//!
//! Open-session scans and the guarded writes that keep the one-open-session
//! and monotonic-checkout invariants intact under concurrency.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::attendance::Attendance;
use crate::repositories::repository::Repository;
use crate::types::{AttendanceId, UserId};

const TABLE_NAME: &str = "attendance";
const SELECT_COLUMNS: &str =
    "id, user_id, date, check_in_at, check_out_at, ot_approved, created_at, updated_at";

#[derive(Debug, Default, Clone, Copy)]
pub struct AttendanceRepository;

impl AttendanceRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_by_user_and_date(
        &self,
        db: &PgPool,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<Attendance>, AppError> {
        let query = format!(
            "SELECT {} FROM {} WHERE user_id = $1 AND date = $2",
            SELECT_COLUMNS, TABLE_NAME
        );
        let row = sqlx::query_as::<_, Attendance>(&query)
            .bind(user_id)
            .bind(date)
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    /// Defensive scan: the invariant says at most one, but the engine never
    /// assumes it. Most recent check-in first.
    pub async fn find_open_sessions(
        &self,
        db: &PgPool,
        user_id: UserId,
    ) -> Result<Vec<Attendance>, AppError> {
        let query = format!(
            "SELECT {} FROM {} WHERE user_id = $1 AND check_out_at IS NULL \
             ORDER BY check_in_at DESC",
            SELECT_COLUMNS, TABLE_NAME
        );
        let rows = sqlx::query_as::<_, Attendance>(&query)
            .bind(user_id)
            .fetch_all(db)
            .await?;
        Ok(rows)
    }

    pub async fn find_by_user_and_range(
        &self,
        db: &PgPool,
        user_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Attendance>, AppError> {
        let query = format!(
            "SELECT {} FROM {} WHERE user_id = $1 AND date >= $2 AND date <= $3 ORDER BY date",
            SELECT_COLUMNS, TABLE_NAME
        );
        let rows = sqlx::query_as::<_, Attendance>(&query)
            .bind(user_id)
            .bind(from)
            .bind(to)
            .fetch_all(db)
            .await?;
        Ok(rows)
    }

    /// First attendance date inside an inclusive range, if any. Used to
    /// refuse leave over days that were actually worked.
    pub async fn first_date_in_range(
        &self,
        db: &PgPool,
        user_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Option<NaiveDate>, AppError> {
        let row: Option<(NaiveDate,)> = sqlx::query_as(
            "SELECT date FROM attendance WHERE user_id = $1 AND date >= $2 AND date <= $3 \
             ORDER BY date LIMIT 1",
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_optional(db)
        .await?;
        Ok(row.map(|(date,)| date))
    }

    /// Records for a set of users on one date, keyed by owner in the caller.
    pub async fn find_by_users_on_date(
        &self,
        db: &PgPool,
        user_ids: &[String],
        date: NaiveDate,
    ) -> Result<Vec<Attendance>, AppError> {
        let query = format!(
            "SELECT {} FROM {} WHERE user_id = ANY($1) AND date = $2",
            SELECT_COLUMNS, TABLE_NAME
        );
        let rows = sqlx::query_as::<_, Attendance>(&query)
            .bind(user_ids)
            .bind(date)
            .fetch_all(db)
            .await?;
        Ok(rows)
    }

    /// Closes a session. The guard re-checks openness and monotonicity so a
    /// racing close or a bad timestamp surfaces as zero rows, never as a
    /// corrupt record.
    pub async fn close_session(
        &self,
        db: &PgPool,
        id: AttendanceId,
        check_out_at: DateTime<Utc>,
    ) -> Result<Option<Attendance>, AppError> {
        let query = format!(
            "UPDATE {} SET check_out_at = $1, updated_at = $2 \
             WHERE id = $3 AND check_out_at IS NULL AND $1 > check_in_at \
             RETURNING {}",
            TABLE_NAME, SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, Attendance>(&query)
            .bind(check_out_at)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    /// Flags the session as covered by an approved overtime request.
    pub async fn mark_ot_approved(
        &self,
        db: &PgPool,
        id: AttendanceId,
    ) -> Result<(), AppError> {
        let query = format!(
            "UPDATE {} SET ot_approved = TRUE, updated_at = $1 WHERE id = $2",
            TABLE_NAME
        );
        sqlx::query(&query)
            .bind(Utc::now())
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}

impl Repository<Attendance> for AttendanceRepository {
    const TABLE: &'static str = TABLE_NAME;
    type Id = AttendanceId;

    async fn find_by_id(&self, db: &PgPool, id: AttendanceId) -> Result<Attendance, AppError> {
        let query = format!("SELECT {} FROM {} WHERE id = $1", SELECT_COLUMNS, TABLE_NAME);
        let result = sqlx::query_as::<_, Attendance>(&query)
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::NotFound("Attendance record not found".into()))?;
        Ok(result)
    }

    /// The partial unique index on open sessions makes the loser of a
    /// concurrent double check-in surface a conflict here.
    async fn create(&self, db: &PgPool, item: &Attendance) -> Result<Attendance, AppError> {
        let query = format!(
            "INSERT INTO {} (id, user_id, date, check_in_at, check_out_at, ot_approved, \
             created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            TABLE_NAME, SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, Attendance>(&query)
            .bind(item.id)
            .bind(item.user_id)
            .bind(item.date)
            .bind(item.check_in_at)
            .bind(item.check_out_at)
            .bind(item.ot_approved)
            .bind(item.created_at)
            .bind(item.updated_at)
            .fetch_one(db)
            .await?;
        Ok(row)
    }

    async fn delete(&self, db: &PgPool, id: AttendanceId) -> Result<(), AppError> {
        let query = format!("DELETE FROM {} WHERE id = $1", TABLE_NAME);
        sqlx::query(&query).bind(id).execute(db).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attendance_select_columns_include_expected_fields() {
        assert!(SELECT_COLUMNS.contains("check_in_at"));
        assert!(SELECT_COLUMNS.contains("check_out_at"));
        assert!(SELECT_COLUMNS.contains("ot_approved"));
    }
}
