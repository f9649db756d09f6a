use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::str::FromStr;
use std::sync::Arc;

use crate::{
    error::{AppError, AppJson},
    models::{
        request::{
            CreateRequestPayload, LeaveType, Request, RequestDetails, RequestResponse,
        },
        user::{User, UserRole},
    },
    repositories::{
        repository::Repository, AttendanceRepository, RequestRepository, UserRepository,
    },
    services::calendar::CalendarServiceTrait,
    state::AppState,
    types::RequestId,
    utils::time::{business_datetime, date_key},
    validation::rules::{span_days, validate_reason, MAX_LEAVE_SPAN_DAYS},
};

/// Creates a request, dispatching validation by variant. Duplicate-pending
/// protection for the dated variants lives in the store's partial unique
/// indexes, so a racing duplicate surfaces as a conflict, not a second row.
pub async fn create_request(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Extension(calendar): Extension<Arc<dyn CalendarServiceTrait>>,
    AppJson(payload): AppJson<CreateRequestPayload>,
) -> Result<(StatusCode, Json<RequestResponse>), AppError> {
    let request = match payload {
        CreateRequestPayload::AdjustTime {
            date,
            check_in_date,
            check_out_date,
            requested_check_in_at,
            requested_check_out_at,
            reason,
        } => {
            build_adjust_time_request(
                &state,
                &user,
                date,
                check_in_date,
                check_out_date,
                requested_check_in_at,
                requested_check_out_at,
                reason,
            )
            .await?
        }
        CreateRequestPayload::Leave {
            leave_start_date,
            leave_end_date,
            leave_type,
            reason,
        } => {
            build_leave_request(
                &state,
                &user,
                calendar.as_ref(),
                leave_start_date,
                leave_end_date,
                leave_type,
                reason,
            )
            .await?
        }
        CreateRequestPayload::OtRequest {
            date,
            estimated_end_time,
            reason,
        } => build_overtime_request(&state, &user, date, estimated_end_time, reason)?,
    };

    let repo = RequestRepository::new();
    let saved = repo.create(&state.pool, &request).await?;

    tracing::info!(
        user_id = %user.id,
        request_id = %saved.id,
        request_type = ?saved.request_type,
        "request created"
    );

    Ok((StatusCode::CREATED, Json(RequestResponse::from(saved))))
}

#[allow(clippy::too_many_arguments)]
async fn build_adjust_time_request(
    state: &AppState,
    user: &User,
    date: NaiveDate,
    check_in_date: Option<NaiveDate>,
    check_out_date: Option<NaiveDate>,
    requested_check_in_at: Option<DateTime<Utc>>,
    requested_check_out_at: Option<DateTime<Utc>>,
    reason: String,
) -> Result<Request, AppError> {
    validate_reason(&reason)?;

    if requested_check_in_at.is_none() && requested_check_out_at.is_none() {
        return Err(AppError::BadRequest(
            "At least one of requestedCheckInAt and requestedCheckOutAt is required".into(),
        ));
    }

    // The nominal date is the check-in's date; a distinct check-out date is
    // carried only for an explicit cross-midnight pair.
    let check_in_date = check_in_date.unwrap_or(date);
    let explicit_cross_midnight = check_out_date.is_some();
    let check_out_date = check_out_date.unwrap_or(check_in_date);

    if check_in_date != date {
        return Err(AppError::BadRequest(
            "checkInDate must equal the nominal date".into(),
        ));
    }
    if check_out_date < check_in_date {
        return Err(AppError::BadRequest(
            "checkOutDate must not precede checkInDate".into(),
        ));
    }
    if check_out_date > check_in_date
        && (!explicit_cross_midnight || check_out_date != check_in_date + Duration::days(1))
    {
        return Err(AppError::BadRequest(
            "A cross-midnight session must set checkOutDate to the day after checkInDate".into(),
        ));
    }

    let offset = state.config.business_offset();
    if let Some(check_in_at) = requested_check_in_at {
        if date_key(check_in_at, offset) != check_in_date {
            return Err(AppError::BadRequest(
                "requestedCheckInAt does not fall on checkInDate in business time".into(),
            ));
        }
    }
    if let Some(check_out_at) = requested_check_out_at {
        if date_key(check_out_at, offset) != check_out_date {
            return Err(AppError::BadRequest(
                "requestedCheckOutAt does not fall on checkOutDate in business time".into(),
            ));
        }
    }
    if let (Some(check_in_at), Some(check_out_at)) =
        (requested_check_in_at, requested_check_out_at)
    {
        if check_out_at <= check_in_at {
            return Err(AppError::BadRequest(
                "requestedCheckOutAt must be after requestedCheckInAt".into(),
            ));
        }
    }

    // Anchor: the requested check-in, or the recorded one for that date.
    let anchor = match requested_check_in_at {
        Some(check_in_at) => check_in_at,
        None => {
            let existing = AttendanceRepository::new()
                .find_by_user_and_date(&state.pool, user.id, date)
                .await?;
            let existing = existing.ok_or_else(|| {
                AppError::BadRequest("Missing check-in reference for this date".into())
            })?;
            existing.check_in_at
        }
    };

    if let Some(check_out_at) = requested_check_out_at {
        if check_out_at <= anchor {
            return Err(AppError::BadRequest(
                "requestedCheckOutAt must be after the recorded check-in".into(),
            ));
        }
        if check_out_at - anchor > Duration::hours(state.config.grace_hours) {
            return Err(AppError::BadRequest(format!(
                "Session exceeds {} hours",
                state.config.grace_hours
            )));
        }
    }

    if Utc::now() - anchor > Duration::days(state.config.submit_window_days) {
        return Err(AppError::BadRequest(format!(
            "Request submitted more than {} days after check-in",
            state.config.submit_window_days
        )));
    }

    Ok(Request::new(
        user.id,
        reason,
        RequestDetails::AdjustTime {
            date,
            check_in_date,
            check_out_date,
            requested_check_in_at,
            requested_check_out_at,
        },
    ))
}

async fn build_leave_request(
    state: &AppState,
    user: &User,
    calendar: &dyn CalendarServiceTrait,
    start_date: NaiveDate,
    end_date: NaiveDate,
    leave_type: Option<LeaveType>,
    reason: String,
) -> Result<Request, AppError> {
    validate_reason(&reason)?;

    if start_date > end_date {
        return Err(AppError::BadRequest(
            "leaveStartDate must not be after leaveEndDate".into(),
        ));
    }
    if span_days(start_date, end_date) > MAX_LEAVE_SPAN_DAYS {
        return Err(AppError::BadRequest(format!(
            "Leave may span at most {} days",
            MAX_LEAVE_SPAN_DAYS
        )));
    }

    if let Some(worked) = AttendanceRepository::new()
        .first_date_in_range(&state.pool, user.id, start_date, end_date)
        .await?
    {
        return Err(AppError::Conflict(format!(
            "Attendance already recorded on {} inside the requested leave",
            worked
        )));
    }

    if let Some(other) = RequestRepository::new()
        .find_overlapping_leave(&state.pool, user.id, start_date, end_date)
        .await?
    {
        let status = match other.status {
            crate::models::request::RequestStatus::Approved => "approved",
            _ => "pending",
        };
        return Err(AppError::Conflict(format!(
            "Requested range overlaps an {} leave request",
            status
        )));
    }

    let days_count = calendar.workdays_between(start_date, end_date).await?;

    Ok(Request::new(
        user.id,
        reason,
        RequestDetails::Leave {
            start_date,
            end_date,
            leave_type,
            days_count: days_count as i32,
        },
    ))
}

fn build_overtime_request(
    state: &AppState,
    user: &User,
    date: NaiveDate,
    estimated_end_time: DateTime<Utc>,
    reason: String,
) -> Result<Request, AppError> {
    validate_reason(&reason)?;

    let offset = state.config.business_offset();
    if date_key(estimated_end_time, offset) != date {
        return Err(AppError::BadRequest(
            "estimatedEndTime does not fall on the nominal date in business time".into(),
        ));
    }

    let earliest = business_datetime(date, state.config.ot_start, offset)
        + Duration::minutes(state.config.min_ot_duration_minutes);
    if estimated_end_time < earliest {
        return Err(AppError::BadRequest(format!(
            "estimatedEndTime must be at or after {}",
            earliest
                .with_timezone(&offset)
                .format("%H:%M")
        )));
    }

    Ok(Request::new(
        user.id,
        reason,
        RequestDetails::Overtime {
            date,
            estimated_end_time,
        },
    ))
}

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct RequestListResponse {
    pub items: Vec<RequestResponse>,
}

/// The caller's own requests, newest first.
pub async fn my_requests(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<RequestListResponse>, AppError> {
    let repo = RequestRepository::new();
    let requests = repo.find_by_user(&state.pool, user.id).await?;
    Ok(Json(RequestListResponse {
        items: requests.into_iter().map(RequestResponse::from).collect(),
    }))
}

/// Pending requests visible to the approver: a manager sees their own team's
/// submissions, an admin sees all.
pub async fn pending_requests(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<RequestListResponse>, AppError> {
    let team_scope = match user.role {
        UserRole::Admin => None,
        UserRole::Manager if user.is_scoped_manager() => user.team_id,
        _ => return Err(AppError::access_denied()),
    };

    let repo = RequestRepository::new();
    let requests = repo
        .find_pending_for_approver(&state.pool, team_scope)
        .await?;
    Ok(Json(RequestListResponse {
        items: requests.into_iter().map(RequestResponse::from).collect(),
    }))
}

/// Approves a pending request. The status flip is compare-and-set in the
/// store, so of two racing approvers exactly one wins and the other observes
/// a conflict. Adjust-time approval also applies the requested times to
/// attendance atomically.
pub async fn approve_request(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(request_id): Path<String>,
) -> Result<Json<RequestResponse>, AppError> {
    let request = load_for_decision(&state, &user, &request_id).await?;
    if !request.is_pending() {
        return Err(AppError::Conflict("Request is not pending".into()));
    }

    let now = Utc::now();
    let repo = RequestRepository::new();
    let updated = match request.request_type {
        crate::models::request::RequestType::AdjustTime => {
            repo.approve_adjust_time(
                &state.pool,
                request.id,
                user.id,
                now,
                state.config.grace_hours,
                state.config.submit_window_days,
            )
            .await?
        }
        _ => repo
            .approve_simple(&state.pool, request.id, user.id, now)
            .await?
            .ok_or_else(|| AppError::Conflict("Request has already been processed".into()))?,
    };

    tracing::info!(request_id = %updated.id, approver_id = %user.id, "request approved");

    Ok(Json(RequestResponse::from(updated)))
}

/// Rejects a pending request with the same CAS discipline as approval.
pub async fn reject_request(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(request_id): Path<String>,
) -> Result<Json<RequestResponse>, AppError> {
    let request = load_for_decision(&state, &user, &request_id).await?;
    if !request.is_pending() {
        return Err(AppError::Conflict("Request is not pending".into()));
    }

    let repo = RequestRepository::new();
    let updated = repo
        .reject(&state.pool, request.id, user.id, Utc::now())
        .await?
        .ok_or_else(|| AppError::Conflict("Request has already been processed".into()))?;

    tracing::info!(request_id = %updated.id, approver_id = %user.id, "request rejected");

    Ok(Json(RequestResponse::from(updated)))
}

/// Resolves a request for an approve/reject decision under the role policy.
/// The denial is checked before the target is read, and a manager's view
/// never distinguishes a missing request from a foreign-team one.
async fn load_for_decision(
    state: &AppState,
    caller: &User,
    request_id: &str,
) -> Result<Request, AppError> {
    if !caller.is_admin() && !caller.is_scoped_manager() {
        return Err(AppError::access_denied());
    }

    let request_id = RequestId::from_str(request_id)
        .map_err(|_| AppError::BadRequest("Invalid request ID".into()))?;

    let repo = RequestRepository::new();
    let request = match repo.find_by_id(&state.pool, request_id).await {
        Ok(request) => Some(request),
        Err(AppError::NotFound(_)) => None,
        Err(err) => return Err(err),
    };

    if caller.is_admin() {
        return request.ok_or_else(|| AppError::NotFound("Request not found".into()));
    }

    let request = match request {
        Some(request) => request,
        None => return Err(AppError::access_denied()),
    };
    let submitter = UserRepository::new()
        .find_live_by_id(&state.pool, request.user_id)
        .await?;
    match submitter {
        Some(submitter) if caller.manages(&submitter) => Ok(request),
        _ => Err(AppError::access_denied()),
    }
}
