use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    error::{AppError, AppJson},
    models::{
        audit_log::{
            AuditLog, EVENT_USERS_PURGED, EVENT_USER_CREATED, EVENT_USER_RESTORED,
            EVENT_USER_SOFT_DELETED,
        },
        user::{
            CreateUserPayload, ResetPasswordPayload, UpdateUserPayload, User, UserResponse,
        },
    },
    repositories::{
        repository::Repository, AuditLogRepository, UserChanges, UserListFilters, UserRepository,
    },
    state::AppState,
    types::{TeamId, UserId},
    utils::password::hash_password_blocking,
    validation::rules::clamp_page_limit,
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    pub items: Vec<UserResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    #[serde(default)]
    pub include_deleted: Option<bool>,
}

/// Creates a user account. Uniqueness of employee code, email, and username
/// is enforced by the store and surfaces as a conflict with a field hint.
pub async fn create_user(
    State(state): State<AppState>,
    Extension(admin): Extension<User>,
    AppJson(payload): AppJson<CreateUserPayload>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    if !admin.is_admin() {
        return Err(AppError::access_denied());
    }
    payload.validate()?;

    let employee_code = payload.employee_code.trim().to_string();
    let email = payload.email.trim().to_lowercase();
    let name = payload.name.trim().to_string();
    let username = payload
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string);

    let password_hash = hash_password_blocking(payload.password).await?;

    let user = User::new(
        employee_code,
        email,
        username,
        password_hash,
        name,
        payload.role,
        payload.team_id,
        payload.start_date,
        payload.is_active.unwrap_or(true),
    );

    let repo = UserRepository::new();
    let saved = repo.create(&state.pool, &user).await?;

    AuditLogRepository::new()
        .record(
            &state.pool,
            &AuditLog::new(
                Some(admin.id),
                EVENT_USER_CREATED,
                Some("user"),
                Some(saved.id.to_string()),
                None,
            ),
        )
        .await?;

    tracing::info!(user_id = %saved.id, admin_id = %admin.id, "user created");

    Ok((StatusCode::CREATED, Json(UserResponse::from(saved))))
}

/// Paginated, searchable user listing. Soft-deleted users are hidden unless
/// `includeDeleted` is set.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(admin): Extension<User>,
    Query(params): Query<UserListQuery>,
) -> Result<Json<UserListResponse>, AppError> {
    if !admin.is_admin() {
        return Err(AppError::access_denied());
    }

    let (page, limit) = clamp_page_limit(params.page, params.limit);
    let offset = (page - 1) * limit;

    let filters = UserListFilters {
        search: params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        include_deleted: params.include_deleted.unwrap_or(false),
    };

    let repo = UserRepository::new();
    let (users, total) = repo.list(&state.pool, &filters, limit, offset).await?;

    let total_pages = if total == 0 { 0 } else { (total + limit - 1) / limit };

    Ok(Json(UserListResponse {
        items: users.into_iter().map(UserResponse::from).collect(),
        pagination: Pagination {
            page,
            limit,
            total,
            total_pages,
        },
    }))
}

/// Applies a whitelisted partial update. `teamId: ""` clears the assignment;
/// an explicit `null` is rejected; absent fields stay unchanged.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(admin): Extension<User>,
    Path(user_id): Path<String>,
    AppJson(payload): AppJson<UpdateUserPayload>,
) -> Result<Json<UserResponse>, AppError> {
    if !admin.is_admin() {
        return Err(AppError::access_denied());
    }

    let user_id =
        UserId::from_str(&user_id).map_err(|_| AppError::BadRequest("Invalid user ID".into()))?;

    let changes = build_changes(payload)?;

    let repo = UserRepository::new();
    let updated = repo.update_fields(&state.pool, user_id, &changes).await?;

    match updated {
        Some(user) => Ok(Json(UserResponse::from(user))),
        None => match repo.find_any_by_id(&state.pool, user_id).await? {
            Some(_) => Err(AppError::BadRequest("Cannot update a deleted user".into())),
            None => Err(AppError::NotFound("User not found".into())),
        },
    }
}

fn build_changes(payload: UpdateUserPayload) -> Result<UserChanges, AppError> {
    let mut changes = UserChanges::default();

    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("name must not be empty".into()));
        }
        changes.name = Some(name);
    }
    if let Some(email) = payload.email {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::BadRequest("email is not valid".into()));
        }
        changes.email = Some(email);
    }
    if let Some(username) = payload.username {
        let username = username.trim().to_string();
        if username.is_empty() {
            return Err(AppError::BadRequest("username must not be empty".into()));
        }
        changes.username = Some(username);
    }
    match payload.team_id {
        None => {}
        Some(None) => {
            return Err(AppError::BadRequest(
                "teamId must not be null; send an empty string to clear it".into(),
            ));
        }
        Some(Some(raw)) if raw.is_empty() => {
            changes.team_id = Some(None);
        }
        Some(Some(raw)) => {
            let team_id = TeamId::from_str(&raw)
                .map_err(|_| AppError::BadRequest("Invalid teamId".into()))?;
            changes.team_id = Some(Some(team_id));
        }
    }
    if let Some(is_active) = payload.is_active {
        changes.is_active = Some(is_active);
    }
    if let Some(raw) = payload.start_date {
        let start_date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map_err(|_| AppError::BadRequest("startDate is not a valid date".into()))?;
        changes.start_date = Some(start_date);
    }

    Ok(changes)
}

/// Resets a user's password. The secret never reaches the logs.
pub async fn reset_password(
    State(state): State<AppState>,
    Extension(admin): Extension<User>,
    Path(user_id): Path<String>,
    AppJson(payload): AppJson<ResetPasswordPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !admin.is_admin() {
        return Err(AppError::access_denied());
    }
    payload.validate()?;

    let user_id =
        UserId::from_str(&user_id).map_err(|_| AppError::BadRequest("Invalid user ID".into()))?;

    let repo = UserRepository::new();
    let target = repo
        .find_any_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    if target.is_deleted() {
        return Err(AppError::BadRequest(
            "Cannot reset the password of a deleted user".into(),
        ));
    }

    let password_hash = hash_password_blocking(payload.new_password).await?;
    repo.update_password_hash(&state.pool, user_id, &password_hash)
        .await?;

    tracing::info!(user_id = %user_id, admin_id = %admin.id, "password reset");

    Ok(Json(serde_json::json!({ "message": "Password reset" })))
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SoftDeleteResponse {
    pub user: UserResponse,
    /// Last instant at which the account can still be restored.
    pub restore_deadline: chrono::DateTime<Utc>,
}

/// Soft-deletes a user. Self-deletion and repeated deletion are refused; the
/// reply names the restore deadline.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(admin): Extension<User>,
    Path(user_id): Path<String>,
) -> Result<Json<SoftDeleteResponse>, AppError> {
    if !admin.is_admin() {
        return Err(AppError::access_denied());
    }

    let user_id =
        UserId::from_str(&user_id).map_err(|_| AppError::BadRequest("Invalid user ID".into()))?;

    if admin.id == user_id {
        return Err(AppError::BadRequest("Cannot delete yourself".into()));
    }

    let repo = UserRepository::new();
    let now = Utc::now();
    let deleted = repo.soft_delete(&state.pool, user_id, now).await?;

    let deleted = match deleted {
        Some(user) => user,
        None => {
            return match repo.find_any_by_id(&state.pool, user_id).await? {
                Some(_) => Err(AppError::BadRequest("User is already deleted".into())),
                None => Err(AppError::NotFound("User not found".into())),
            };
        }
    };

    AuditLogRepository::new()
        .record(
            &state.pool,
            &AuditLog::new(
                Some(admin.id),
                EVENT_USER_SOFT_DELETED,
                Some("user"),
                Some(user_id.to_string()),
                None,
            ),
        )
        .await?;

    tracing::info!(user_id = %user_id, admin_id = %admin.id, "user soft deleted");

    let restore_deadline = deleted
        .restore_deadline(state.config.retention_days)
        .unwrap_or(now + Duration::days(state.config.retention_days));

    Ok(Json(SoftDeleteResponse {
        user: UserResponse::from(deleted),
        restore_deadline,
    }))
}

/// Restores a soft-deleted user while the retention window allows it.
pub async fn restore_user(
    State(state): State<AppState>,
    Extension(admin): Extension<User>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    if !admin.is_admin() {
        return Err(AppError::access_denied());
    }

    let user_id =
        UserId::from_str(&user_id).map_err(|_| AppError::BadRequest("Invalid user ID".into()))?;

    let repo = UserRepository::new();
    let restored = repo.restore(&state.pool, user_id).await?;

    let restored = match restored {
        Some(user) => user,
        None => {
            return match repo.find_any_by_id(&state.pool, user_id).await? {
                Some(_) => Err(AppError::BadRequest("User is not deleted".into())),
                None => Err(AppError::NotFound(
                    "User not found or already purged".into(),
                )),
            };
        }
    };

    AuditLogRepository::new()
        .record(
            &state.pool,
            &AuditLog::new(
                Some(admin.id),
                EVENT_USER_RESTORED,
                Some("user"),
                Some(user_id.to_string()),
                None,
            ),
        )
        .await?;

    tracing::info!(user_id = %user_id, admin_id = %admin.id, "user restored");

    Ok(Json(UserResponse::from(restored)))
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurgeResponse {
    pub purged: u64,
    pub cascade_deleted: CascadeDeleted,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CascadeDeleted {
    pub attendances: u64,
    pub requests: u64,
}

/// Hard-deletes users whose retention window has lapsed, cascading their
/// attendance and request records. Idempotent: a second run with no newly
/// expired deletions reports zero.
pub async fn purge_users(
    State(state): State<AppState>,
    Extension(admin): Extension<User>,
) -> Result<Json<PurgeResponse>, AppError> {
    if !admin.is_admin() {
        return Err(AppError::access_denied());
    }

    let cutoff = Utc::now() - Duration::days(state.config.retention_days);
    let repo = UserRepository::new();
    let outcome = repo.purge_expired(&state.pool, cutoff).await?;

    if outcome.purged > 0 {
        AuditLogRepository::new()
            .record(
                &state.pool,
                &AuditLog::new(
                    Some(admin.id),
                    EVENT_USERS_PURGED,
                    Some("user"),
                    None,
                    Some(serde_json::json!({
                        "purged": outcome.purged,
                        "attendances": outcome.attendances,
                        "requests": outcome.requests,
                    })),
                ),
            )
            .await?;
    }

    tracing::info!(
        admin_id = %admin.id,
        purged = outcome.purged,
        "retention purge executed"
    );

    Ok(Json(PurgeResponse {
        purged: outcome.purged,
        cascade_deleted: CascadeDeleted {
            attendances: outcome.attendances,
            requests: outcome.requests,
        },
    }))
}
