use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use std::str::FromStr;

use crate::{
    error::{AppError, AppJson},
    models::{
        holiday::{CreateHolidayPayload, Holiday, HolidayResponse},
        user::User,
    },
    repositories::{repository::Repository, HolidayRepository},
    state::AppState,
    types::HolidayId,
};

pub async fn list_holidays(
    State(state): State<AppState>,
    Extension(admin): Extension<User>,
) -> Result<Json<Vec<HolidayResponse>>, AppError> {
    if !admin.is_admin() {
        return Err(AppError::access_denied());
    }

    let repo = HolidayRepository::new();
    let holidays = repo.find_all(&state.pool).await?;
    Ok(Json(
        holidays.into_iter().map(HolidayResponse::from).collect(),
    ))
}

/// Registers a non-working date. A duplicate date surfaces as a conflict via
/// the unique index on the date key.
pub async fn create_holiday(
    State(state): State<AppState>,
    Extension(admin): Extension<User>,
    AppJson(payload): AppJson<CreateHolidayPayload>,
) -> Result<(StatusCode, Json<HolidayResponse>), AppError> {
    if !admin.is_admin() {
        return Err(AppError::access_denied());
    }

    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }

    let repo = HolidayRepository::new();
    let saved = repo
        .create(&state.pool, &Holiday::new(payload.date, name))
        .await?;

    tracing::info!(date = %saved.date, admin_id = %admin.id, "holiday created");

    Ok((StatusCode::CREATED, Json(HolidayResponse::from(saved))))
}

pub async fn delete_holiday(
    State(state): State<AppState>,
    Extension(admin): Extension<User>,
    Path(holiday_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !admin.is_admin() {
        return Err(AppError::access_denied());
    }

    let holiday_id = HolidayId::from_str(&holiday_id)
        .map_err(|_| AppError::BadRequest("Invalid holiday ID".into()))?;

    let repo = HolidayRepository::new();
    repo.delete(&state.pool, holiday_id).await?;

    Ok(Json(serde_json::json!({ "message": "Holiday deleted" })))
}
