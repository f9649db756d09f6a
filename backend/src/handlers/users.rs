use axum::{
    extract::{Extension, Path, State},
    Json,
};
use std::str::FromStr;

use crate::{
    error::AppError,
    models::user::{User, UserResponse},
    repositories::UserRepository,
    state::AppState,
    types::UserId,
};

/// Looks up a user by id. Managers may only see members of their own team;
/// the denial never distinguishes "not found" from "not yours".
pub async fn get_user(
    State(state): State<AppState>,
    Extension(caller): Extension<User>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    if !caller.is_admin() && !caller.is_scoped_manager() {
        return Err(AppError::access_denied());
    }

    let user_id =
        UserId::from_str(&user_id).map_err(|_| AppError::BadRequest("Invalid user ID".into()))?;

    let repo = UserRepository::new();
    let target = repo.find_live_by_id(&state.pool, user_id).await?;

    if caller.is_admin() {
        let target = target.ok_or_else(|| AppError::NotFound("User not found".into()))?;
        return Ok(Json(UserResponse::from(target)));
    }

    // Manager path: a missing user and a foreign-team user answer alike.
    match target {
        Some(target) if caller.manages(&target) => Ok(Json(UserResponse::from(target))),
        _ => Err(AppError::access_denied()),
    }
}
