use axum::{
    extract::{Extension, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppError,
    models::{
        attendance::{
            derive_day_status, overtime_minutes, Attendance, AttendanceResponse, DayStatus,
            ShiftTimes,
        },
        audit_log::{
            AuditLog, EVENT_MULTIPLE_ACTIVE_SESSIONS, EVENT_STALE_OPEN_SESSION,
            MAX_AUDITED_SESSION_IDS,
        },
        user::{User, UserRole},
    },
    repositories::{
        repository::Repository, AttendanceRepository, AuditLogRepository, RequestRepository,
        UserRepository,
    },
    services::calendar::CalendarServiceTrait,
    state::AppState,
    types::TeamId,
    utils::time::{date_key, month_bounds},
};

/// Opens a new session for the caller. The store's open-session index makes
/// the loser of a concurrent double check-in surface a conflict.
pub async fn check_in(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<AttendanceResponse>, AppError> {
    let now = Utc::now();
    let offset = state.config.business_offset();
    let date = date_key(now, offset);

    let repo = AttendanceRepository::new();
    let open = repo.find_open_sessions(&state.pool, user.id).await?;
    if !open.is_empty() {
        return Err(AppError::Conflict(
            "An open session already exists; check out first".into(),
        ));
    }

    let attendance = Attendance::new(user.id, date, now);
    let saved = repo.create(&state.pool, &attendance).await?;

    tracing::info!(user_id = %user.id, date = %date, "checked in");

    Ok(Json(AttendanceResponse::from(saved)))
}

/// Closes the caller's open session. The engine defensively scans all open
/// sessions: a stale one blocks the operation (closing a newer session would
/// leave the stale record open and wedge the next check-in), and anomalies
/// are written to the audit log for an administrator.
pub async fn check_out(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<AttendanceResponse>, AppError> {
    let now = Utc::now();
    let offset = state.config.business_offset();
    let shift = ShiftTimes::from_config(&state.config);

    let repo = AttendanceRepository::new();
    let open = repo.find_open_sessions(&state.pool, user.id).await?;

    if open.is_empty() {
        return Err(AppError::BadRequest(
            "Must check in before checking out".into(),
        ));
    }

    let audit_repo = AuditLogRepository::new();
    if open.len() > 1 {
        let session_ids: Vec<String> = open
            .iter()
            .take(MAX_AUDITED_SESSION_IDS)
            .map(|record| record.id.to_string())
            .collect();
        audit_repo
            .record(
                &state.pool,
                &AuditLog::new(
                    Some(user.id),
                    EVENT_MULTIPLE_ACTIVE_SESSIONS,
                    Some("attendance"),
                    None,
                    Some(serde_json::json!({
                        "open_count": open.len(),
                        "session_ids": session_ids,
                    })),
                ),
            )
            .await?;
    }

    if let Some(stale) = open
        .iter()
        .find(|record| record.is_stale(now, state.config.grace_hours))
    {
        audit_repo
            .record(
                &state.pool,
                &AuditLog::new(
                    Some(user.id),
                    EVENT_STALE_OPEN_SESSION,
                    Some("attendance"),
                    Some(stale.id.to_string()),
                    Some(serde_json::json!({ "date": stale.date.to_string() })),
                ),
            )
            .await?;
        return Err(AppError::BadRequest(format!(
            "A stale open session from {} must be resolved by an administrator before checking out",
            stale.date
        )));
    }

    // Most recently started active session; older anomalies stay open.
    let target = &open[0];
    let closed = repo
        .close_session(&state.pool, target.id, now)
        .await?
        .ok_or_else(|| AppError::Conflict("Session was closed concurrently".into()))?;

    let minutes = overtime_minutes(&closed, &shift, offset);
    if minutes > 0 {
        let request_repo = RequestRepository::new();
        let ot_approved = request_repo
            .record_actual_ot_minutes(&state.pool, user.id, closed.date, minutes)
            .await?;
        if ot_approved {
            repo.mark_ot_approved(&state.pool, closed.id).await?;
        }
    }

    tracing::info!(user_id = %user.id, date = %closed.date, "checked out");

    Ok(Json(AttendanceResponse::from(closed)))
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct TodayQuery {
    /// One of `self` (default), `team`, `company`.
    pub scope: Option<String>,
    pub team_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodayItem {
    pub user_id: crate::types::UserId,
    pub name: String,
    pub employee_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DayStatus>,
    pub overtime_minutes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance: Option<AttendanceResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TodayResponse {
    pub date: NaiveDate,
    pub items: Vec<TodayItem>,
}

/// Today's derived status for the caller, their team, or the whole company,
/// gated by the role policy.
pub async fn today(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Extension(calendar): Extension<Arc<dyn CalendarServiceTrait>>,
    Query(params): Query<TodayQuery>,
) -> Result<Json<TodayResponse>, AppError> {
    let offset = state.config.business_offset();
    let today = date_key(Utc::now(), offset);

    let members = match params.scope.as_deref().unwrap_or("self") {
        "self" => vec![user.clone()],
        "team" => {
            let team_id = match params.team_id.as_deref() {
                Some(raw) => Some(
                    TeamId::from_str(raw)
                        .map_err(|_| AppError::BadRequest("Invalid team ID".into()))?,
                ),
                None => user.team_id,
            };
            let team_id =
                team_id.ok_or_else(|| AppError::BadRequest("teamId is required".into()))?;

            let allowed = match user.role {
                UserRole::Admin => true,
                UserRole::Manager => user.is_scoped_manager() && user.team_id == Some(team_id),
                UserRole::Employee => false,
            };
            if !allowed {
                return Err(AppError::access_denied());
            }

            UserRepository::new()
                .find_live_by_team(&state.pool, team_id)
                .await?
        }
        "company" => {
            if !user.is_admin() {
                return Err(AppError::access_denied());
            }
            UserRepository::new().find_all_live(&state.pool).await?
        }
        other => {
            return Err(AppError::BadRequest(format!("Unknown scope: {}", other)));
        }
    };

    let shift = ShiftTimes::from_config(&state.config);
    let non_workday = calendar.classify(today).await?.is_non_workday();

    let member_ids: Vec<String> = members.iter().map(|m| m.id.to_string()).collect();
    let records = AttendanceRepository::new()
        .find_by_users_on_date(&state.pool, &member_ids, today)
        .await?;
    let mut by_user: HashMap<crate::types::UserId, Attendance> = records
        .into_iter()
        .map(|record| (record.user_id, record))
        .collect();

    let items = members
        .into_iter()
        .map(|member| {
            let record = by_user.remove(&member.id);
            let status =
                derive_day_status(record.as_ref(), today, today, non_workday, &shift, offset);
            let minutes = record
                .as_ref()
                .map(|r| overtime_minutes(r, &shift, offset))
                .unwrap_or(0);
            TodayItem {
                user_id: member.id,
                name: member.name,
                employee_code: member.employee_code,
                status,
                overtime_minutes: minutes,
                attendance: record.map(AttendanceResponse::from),
            }
        })
        .collect();

    Ok(Json(TodayResponse { date: today, items }))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MonthQuery {
    /// Month selector in `YYYY-MM`; defaults to the current business month.
    pub month: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthItem {
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DayStatus>,
    pub overtime_minutes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance: Option<AttendanceResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MonthResponse {
    pub items: Vec<MonthItem>,
}

/// The caller's month of attendance with derived per-day status.
pub async fn my_month(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Extension(calendar): Extension<Arc<dyn CalendarServiceTrait>>,
    Query(params): Query<MonthQuery>,
) -> Result<Json<MonthResponse>, AppError> {
    let offset = state.config.business_offset();
    let today = date_key(Utc::now(), offset);

    let (first, last) = match params.month.as_deref() {
        Some(raw) => month_bounds(raw)
            .ok_or_else(|| AppError::BadRequest("Invalid month (expected YYYY-MM)".into()))?,
        None => month_bounds(&today.format("%Y-%m").to_string())
            .ok_or_else(|| AppError::BadRequest("Invalid month".into()))?,
    };

    let shift = ShiftTimes::from_config(&state.config);
    let holidays = calendar.holidays_in(first, last).await?;
    let records = AttendanceRepository::new()
        .find_by_user_and_range(&state.pool, user.id, first, last)
        .await?;
    let mut by_date: HashMap<NaiveDate, Attendance> = records
        .into_iter()
        .map(|record| (record.date, record))
        .collect();

    let mut items = Vec::new();
    for date in first.iter_days().take_while(|date| *date <= last) {
        let record = by_date.remove(&date);
        let non_workday =
            crate::services::calendar::is_weekend(date) || holidays.contains(&date);
        let status = derive_day_status(record.as_ref(), date, today, non_workday, &shift, offset);
        let minutes = record
            .as_ref()
            .map(|r| overtime_minutes(r, &shift, offset))
            .unwrap_or(0);
        items.push(MonthItem {
            date,
            status,
            overtime_minutes: minutes,
            attendance: record.map(AttendanceResponse::from),
        });
    }

    Ok(Json(MonthResponse { items }))
}
