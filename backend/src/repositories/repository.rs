//! Repository trait and common functionality
//!
//! This module defines the standard repository trait that all repository modules
//! should implement, along with transaction management utilities.

use crate::error::AppError;
use sqlx::PgPool;

/// Standard repository trait for database operations
///
/// All repository modules should implement this trait to ensure consistent
/// data access patterns and transaction handling.
#[allow(async_fn_in_trait)]
pub trait Repository<T> {
    /// Target table name.
    const TABLE: &'static str;
    /// Primary key type for the record.
    type Id;

    /// Find a single record by ID
    async fn find_by_id(&self, db: &PgPool, id: Self::Id) -> Result<T, AppError>;

    /// Create a new record
    async fn create(&self, db: &PgPool, item: &T) -> Result<T, AppError>;

    /// Delete a record by ID
    async fn delete(&self, db: &PgPool, id: Self::Id) -> Result<(), AppError>;
}

/// Transaction management for database operations
///
/// Provides begin and commit utilities for compound writes that must be
/// atomic. Dropping an uncommitted transaction rolls it back.
pub mod transaction {
    use crate::error::AppError;
    use sqlx::postgres::PgTransaction;
    use sqlx::PgPool;

    /// Begin a new database transaction
    pub async fn begin_transaction(db: &PgPool) -> Result<PgTransaction<'_>, AppError> {
        db.begin()
            .await
            .map_err(|e| AppError::InternalServerError(e.into()))
    }

    /// Commit a transaction
    pub async fn commit_transaction(tx: PgTransaction<'_>) -> Result<(), AppError> {
        tx.commit()
            .await
            .map_err(|e| AppError::InternalServerError(e.into()))
    }
}
