//! Holiday repository.

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::holiday::Holiday;
use crate::repositories::repository::Repository;
use crate::types::HolidayId;

const TABLE_NAME: &str = "holidays";
const SELECT_COLUMNS: &str = "id, date, name, created_at, updated_at";

#[derive(Debug, Default, Clone, Copy)]
pub struct HolidayRepository;

impl HolidayRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_all(&self, db: &PgPool) -> Result<Vec<Holiday>, AppError> {
        let query = format!("SELECT {} FROM {} ORDER BY date", SELECT_COLUMNS, TABLE_NAME);
        let rows = sqlx::query_as::<_, Holiday>(&query).fetch_all(db).await?;
        Ok(rows)
    }

    pub async fn exists_on(&self, db: &PgPool, date: NaiveDate) -> Result<bool, AppError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM holidays WHERE date = $1")
            .bind(date)
            .fetch_optional(db)
            .await?;
        Ok(row.is_some())
    }

    /// Holiday dates inside an inclusive range, for workday counting.
    pub async fn dates_in_range(
        &self,
        db: &PgPool,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<NaiveDate>, AppError> {
        let rows: Vec<(NaiveDate,)> =
            sqlx::query_as("SELECT date FROM holidays WHERE date >= $1 AND date <= $2")
                .bind(from)
                .bind(to)
                .fetch_all(db)
                .await?;
        Ok(rows.into_iter().map(|(date,)| date).collect())
    }
}

impl Repository<Holiday> for HolidayRepository {
    const TABLE: &'static str = TABLE_NAME;
    type Id = HolidayId;

    async fn find_by_id(&self, db: &PgPool, id: HolidayId) -> Result<Holiday, AppError> {
        let query = format!("SELECT {} FROM {} WHERE id = $1", SELECT_COLUMNS, TABLE_NAME);
        let result = sqlx::query_as::<_, Holiday>(&query)
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::NotFound("Holiday not found".into()))?;
        Ok(result)
    }

    async fn create(&self, db: &PgPool, item: &Holiday) -> Result<Holiday, AppError> {
        let query = format!(
            "INSERT INTO {} (id, date, name, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            TABLE_NAME, SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, Holiday>(&query)
            .bind(item.id)
            .bind(item.date)
            .bind(&item.name)
            .bind(item.created_at)
            .bind(item.updated_at)
            .fetch_one(db)
            .await?;
        Ok(row)
    }

    async fn delete(&self, db: &PgPool, id: HolidayId) -> Result<(), AppError> {
        let query = format!("DELETE FROM {} WHERE id = $1", TABLE_NAME);
        let result = sqlx::query(&query).bind(id).execute(db).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Holiday not found".into()));
        }
        Ok(())
    }
}
