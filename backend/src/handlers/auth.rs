use axum::{
    extract::{Extension, State},
    Json,
};

use crate::{
    error::{AppError, AppJson},
    models::user::{LoginPayload, LoginResponse, User, UserResponse},
    repositories::UserRepository,
    state::AppState,
    utils::{jwt::create_access_token, password::verify_password_blocking},
};

/// Authenticates by email, employee code, or username. Failures are uniform
/// so the response never reveals which part of the credential was wrong.
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginPayload>,
) -> Result<Json<LoginResponse>, AppError> {
    let repo = UserRepository::new();
    let user = repo
        .find_live_by_identifier(&state.pool, &payload.identifier)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".into()))?;

    let matches =
        verify_password_blocking(payload.password, user.password_hash.clone()).await?;
    if !matches {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let token = create_access_token(
        user.id.to_string(),
        user.role.as_str().to_string(),
        user.team_id.map(|team_id| team_id.to_string()),
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(LoginResponse {
        token,
        user: UserResponse::from(user),
    }))
}

/// Echoes the authenticated principal.
pub async fn me(Extension(user): Extension<User>) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}
