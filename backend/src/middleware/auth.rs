use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::str::FromStr;

use crate::{
    error::AppError, repositories::UserRepository, state::AppState, types::UserId,
    utils::jwt::verify_access_token,
};

/// Resolves the bearer token to a live principal and injects it into request
/// extensions. Tokens are stateless; the user row is reloaded so revoked
/// accounts (soft-deleted or deactivated) fail closed.
pub async fn auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => {
            header.strip_prefix("Bearer ").unwrap_or("")
        }
        _ => {
            return Err(AppError::Unauthorized("Missing bearer token".into()));
        }
    };

    let claims = verify_access_token(token, &state.config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    let user_id = UserId::from_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    let repo = UserRepository::new();
    let user = repo
        .find_live_by_id(&state.pool, user_id)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".into()))?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Auth plus the admin gate for `/admin` routes.
pub async fn auth_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => {
            header.strip_prefix("Bearer ").unwrap_or("")
        }
        _ => {
            return Err(AppError::Unauthorized("Missing bearer token".into()));
        }
    };

    let claims = verify_access_token(token, &state.config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    let user_id = UserId::from_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    let repo = UserRepository::new();
    let user = repo
        .find_live_by_id(&state.pool, user_id)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".into()))?;

    if !user.is_admin() {
        return Err(AppError::access_denied());
    }

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
