//! User repository.
//!
//! Soft-delete aware lookups, whitelisted updates, and the retention-window
//! purge with cascade.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::AppError;
use crate::models::user::User;
use crate::repositories::common::{escape_like, push_clause};
use crate::repositories::repository::{transaction, Repository};
use crate::types::{TeamId, UserId};

const TABLE_NAME: &str = "users";
const SELECT_COLUMNS: &str = "id, employee_code, email, username, password_hash, name, role, \
team_id, start_date, is_active, deleted_at, created_at, updated_at";

/// Filters for the admin user listing.
#[derive(Debug, Clone, Default)]
pub struct UserListFilters {
    /// Case-insensitive substring over name, email, and employee code.
    pub search: Option<String>,
    /// When false (the default) soft-deleted rows are excluded.
    pub include_deleted: bool,
}

/// Outcome of a retention purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeOutcome {
    pub purged: u64,
    pub attendances: u64,
    pub requests: u64,
}

/// Whitelisted column changes for a user update. `team_id` distinguishes
/// "leave unchanged" (`None`) from "clear" (`Some(None)`).
#[derive(Debug, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub team_id: Option<Option<TeamId>>,
    pub is_active: Option<bool>,
    pub start_date: Option<NaiveDate>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.username.is_none()
            && self.team_id.is_none()
            && self.is_active.is_none()
            && self.start_date.is_none()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UserRepository;

impl UserRepository {
    pub fn new() -> Self {
        Self
    }

    /// Resolves a login identifier against live users: lower-cased email,
    /// employee code, or username.
    pub async fn find_live_by_identifier(
        &self,
        db: &PgPool,
        identifier: &str,
    ) -> Result<Option<User>, AppError> {
        let query = format!(
            "SELECT {} FROM {} WHERE deleted_at IS NULL \
             AND (email = $1 OR employee_code = $2 OR username = $2)",
            SELECT_COLUMNS, TABLE_NAME
        );
        let row = sqlx::query_as::<_, User>(&query)
            .bind(identifier.trim().to_lowercase())
            .bind(identifier.trim())
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    /// Finds a user that has not been soft-deleted.
    pub async fn find_live_by_id(
        &self,
        db: &PgPool,
        id: UserId,
    ) -> Result<Option<User>, AppError> {
        let query = format!(
            "SELECT {} FROM {} WHERE id = $1 AND deleted_at IS NULL",
            SELECT_COLUMNS, TABLE_NAME
        );
        let row = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    /// Finds a user regardless of soft-delete state.
    pub async fn find_any_by_id(
        &self,
        db: &PgPool,
        id: UserId,
    ) -> Result<Option<User>, AppError> {
        let query = format!("SELECT {} FROM {} WHERE id = $1", SELECT_COLUMNS, TABLE_NAME);
        let row = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    /// Live, active members of a team, ordered by name.
    pub async fn find_live_by_team(
        &self,
        db: &PgPool,
        team_id: TeamId,
    ) -> Result<Vec<User>, AppError> {
        let query = format!(
            "SELECT {} FROM {} WHERE team_id = $1 AND deleted_at IS NULL AND is_active \
             ORDER BY name",
            SELECT_COLUMNS, TABLE_NAME
        );
        let rows = sqlx::query_as::<_, User>(&query)
            .bind(team_id)
            .fetch_all(db)
            .await?;
        Ok(rows)
    }

    /// All live, active users, ordered by name.
    pub async fn find_all_live(&self, db: &PgPool) -> Result<Vec<User>, AppError> {
        let query = format!(
            "SELECT {} FROM {} WHERE deleted_at IS NULL AND is_active ORDER BY name",
            SELECT_COLUMNS, TABLE_NAME
        );
        let rows = sqlx::query_as::<_, User>(&query).fetch_all(db).await?;
        Ok(rows)
    }

    /// Paginated listing with search; returns the page plus the total count.
    pub async fn list(
        &self,
        db: &PgPool,
        filters: &UserListFilters,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64), AppError> {
        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", TABLE_NAME));
        apply_list_filters(&mut count_builder, filters);
        let (total,): (i64,) = count_builder.build_query_as().fetch_one(db).await?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM {}", SELECT_COLUMNS, TABLE_NAME));
        apply_list_filters(&mut builder, filters);
        builder
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let rows = builder.build_query_as::<User>().fetch_all(db).await?;

        Ok((rows, total))
    }

    /// Applies a whitelisted partial update to a live user.
    pub async fn update_fields(
        &self,
        db: &PgPool,
        id: UserId,
        changes: &UserChanges,
    ) -> Result<Option<User>, AppError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("UPDATE {} SET updated_at = ", TABLE_NAME));
        builder.push_bind(Utc::now());

        if let Some(ref name) = changes.name {
            builder.push(", name = ").push_bind(name);
        }
        if let Some(ref email) = changes.email {
            builder.push(", email = ").push_bind(email);
        }
        if let Some(ref username) = changes.username {
            builder.push(", username = ").push_bind(username);
        }
        if let Some(ref team_id) = changes.team_id {
            builder.push(", team_id = ").push_bind(*team_id);
        }
        if let Some(is_active) = changes.is_active {
            builder.push(", is_active = ").push_bind(is_active);
        }
        if let Some(start_date) = changes.start_date {
            builder.push(", start_date = ").push_bind(start_date);
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND deleted_at IS NULL RETURNING ")
            .push(SELECT_COLUMNS);

        let row = builder.build_query_as::<User>().fetch_optional(db).await?;
        Ok(row)
    }

    /// Replaces the password hash of a live user.
    pub async fn update_password_hash(
        &self,
        db: &PgPool,
        id: UserId,
        password_hash: &str,
    ) -> Result<bool, AppError> {
        let query = format!(
            "UPDATE {} SET password_hash = $1, updated_at = $2 \
             WHERE id = $3 AND deleted_at IS NULL",
            TABLE_NAME
        );
        let result = sqlx::query(&query)
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Marks a live user soft-deleted. The `deleted_at IS NULL` guard makes a
    /// repeated delete lose cleanly.
    pub async fn soft_delete(
        &self,
        db: &PgPool,
        id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, AppError> {
        let query = format!(
            "UPDATE {} SET deleted_at = $1, updated_at = $1 \
             WHERE id = $2 AND deleted_at IS NULL RETURNING {}",
            TABLE_NAME, SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, User>(&query)
            .bind(now)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    /// Clears the soft-delete marker of a deleted user.
    pub async fn restore(&self, db: &PgPool, id: UserId) -> Result<Option<User>, AppError> {
        let query = format!(
            "UPDATE {} SET deleted_at = NULL, updated_at = $1 \
             WHERE id = $2 AND deleted_at IS NOT NULL RETURNING {}",
            TABLE_NAME, SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, User>(&query)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    /// Hard-deletes users soft-deleted before `cutoff`, cascading their
    /// attendance and request rows inside one transaction. Running it again
    /// with no newly expired deletions is a no-op.
    pub async fn purge_expired(
        &self,
        db: &PgPool,
        cutoff: DateTime<Utc>,
    ) -> Result<PurgeOutcome, AppError> {
        let mut tx = transaction::begin_transaction(db).await?;

        let ids: Vec<(String,)> =
            sqlx::query_as("SELECT id FROM users WHERE deleted_at IS NOT NULL AND deleted_at < $1")
                .bind(cutoff)
                .fetch_all(&mut *tx)
                .await?;
        let ids: Vec<String> = ids.into_iter().map(|(id,)| id).collect();

        if ids.is_empty() {
            return Ok(PurgeOutcome::default());
        }

        let attendances = sqlx::query("DELETE FROM attendance WHERE user_id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let requests = sqlx::query("DELETE FROM requests WHERE user_id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let purged = sqlx::query("DELETE FROM users WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        transaction::commit_transaction(tx).await?;

        Ok(PurgeOutcome {
            purged,
            attendances,
            requests,
        })
    }
}

fn apply_list_filters<'a>(
    builder: &mut QueryBuilder<'a, Postgres>,
    filters: &'a UserListFilters,
) {
    let mut has_clause = false;
    if !filters.include_deleted {
        push_clause(builder, &mut has_clause);
        builder.push("deleted_at IS NULL");
    }
    if let Some(ref search) = filters.search {
        push_clause(builder, &mut has_clause);
        let pattern = format!("%{}%", escape_like(search));
        builder
            .push("(name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR employee_code ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

impl Repository<User> for UserRepository {
    const TABLE: &'static str = TABLE_NAME;
    type Id = UserId;

    async fn find_by_id(&self, db: &PgPool, id: UserId) -> Result<User, AppError> {
        self.find_any_by_id(db, id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    async fn create(&self, db: &PgPool, item: &User) -> Result<User, AppError> {
        let query = format!(
            "INSERT INTO {} (id, employee_code, email, username, password_hash, name, role, \
             team_id, start_date, is_active, deleted_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {}",
            TABLE_NAME, SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, User>(&query)
            .bind(item.id)
            .bind(&item.employee_code)
            .bind(&item.email)
            .bind(&item.username)
            .bind(&item.password_hash)
            .bind(&item.name)
            .bind(item.role.db_value())
            .bind(item.team_id)
            .bind(item.start_date)
            .bind(item.is_active)
            .bind(item.deleted_at)
            .bind(item.created_at)
            .bind(item.updated_at)
            .fetch_one(db)
            .await?;
        Ok(row)
    }

    async fn delete(&self, db: &PgPool, id: UserId) -> Result<(), AppError> {
        let query = format!("DELETE FROM {} WHERE id = $1", TABLE_NAME);
        sqlx::query(&query).bind(id).execute(db).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_select_columns_include_soft_delete_fields() {
        assert!(SELECT_COLUMNS.contains("deleted_at"));
        assert!(SELECT_COLUMNS.contains("employee_code"));
        assert!(SELECT_COLUMNS.contains("team_id"));
    }

    #[test]
    fn empty_changes_are_detected() {
        assert!(UserChanges::default().is_empty());
        let changes = UserChanges {
            name: Some("New Name".into()),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }
}
