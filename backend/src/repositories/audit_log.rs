//! Audit log repository.

use sqlx::PgPool;

use crate::error::AppError;
use crate::models::audit_log::AuditLog;

const TABLE_NAME: &str = "audit_log";

#[derive(Debug, Default, Clone, Copy)]
pub struct AuditLogRepository;

impl AuditLogRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn record(&self, db: &PgPool, entry: &AuditLog) -> Result<(), AppError> {
        let query = format!(
            "INSERT INTO {} (id, occurred_at, actor_id, event_type, target_type, target_id, \
             metadata) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            TABLE_NAME
        );
        sqlx::query(&query)
            .bind(entry.id)
            .bind(entry.occurred_at)
            .bind(entry.actor_id)
            .bind(&entry.event_type)
            .bind(&entry.target_type)
            .bind(&entry.target_id)
            .bind(&entry.metadata)
            .execute(db)
            .await?;
        Ok(())
    }
}
