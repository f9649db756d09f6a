use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Uniform wording for every access denial. The phrase never varies so a
/// caller cannot distinguish "not found" from "not yours".
pub const ACCESS_DENIED: &str = "Access denied";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("Internal server error")]
    InternalServerError(anyhow::Error),
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),
}

impl AppError {
    /// The uniform role-policy denial.
    pub fn access_denied() -> Self {
        AppError::Forbidden(ACCESS_DENIED.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InternalServerError(err) => {
                tracing::error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Validation(errors) => (StatusCode::BAD_REQUEST, errors.join("; ")),
        };

        let body = Json(ErrorResponse { message });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalServerError(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(conflict_message(db.constraint()))
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                AppError::BadRequest("Referenced record does not exist".to_string())
            }
            other => AppError::InternalServerError(other.into()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter()
                    .map(move |e| format!("{}: {}", field, e.code))
            })
            .collect();
        AppError::Validation(messages)
    }
}

/// JSON extractor that reports malformed bodies as 400 validation errors
/// instead of axum's default 422.
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(AppJson(value))
    }
}

/// Maps a unique-index name onto the user-facing field hint required for 409s.
fn conflict_message(constraint: Option<&str>) -> String {
    let hint = match constraint {
        Some(name) if name.contains("users_employee_code") => "employee code already in use",
        Some(name) if name.contains("users_email") => "email already in use",
        Some(name) if name.contains("users_username") => "username already in use",
        Some(name) if name.contains("attendance_open_session") => {
            "an open session already exists"
        }
        Some(name) if name.contains("attendance_user_date") => {
            "an attendance record already exists for this date"
        }
        Some(name) if name.contains("requests_pending_adjust") => {
            "a pending adjust-time request already exists for this date"
        }
        Some(name) if name.contains("requests_pending_ot") => {
            "a pending overtime request already exists for this date"
        }
        Some(name) if name.contains("holidays_date") => "a holiday already exists for this date",
        _ => "duplicate value violates a uniqueness constraint",
    };
    hint.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_carries_field_hint() {
        assert_eq!(
            conflict_message(Some("users_email_key")),
            "email already in use"
        );
        assert_eq!(
            conflict_message(Some("requests_pending_ot_key")),
            "a pending overtime request already exists for this date"
        );
        assert_eq!(
            conflict_message(None),
            "duplicate value violates a uniqueness constraint"
        );
    }

    #[test]
    fn error_display_matches_the_user_facing_message() {
        assert_eq!(
            AppError::Conflict("email already in use".into()).to_string(),
            "email already in use"
        );
        assert_eq!(
            AppError::Validation(vec!["a".into(), "b".into()]).to_string(),
            "a; b"
        );
        assert_eq!(
            AppError::InternalServerError(anyhow::anyhow!("boom")).to_string(),
            "Internal server error"
        );
    }

    #[test]
    fn access_denied_is_uniform() {
        match AppError::access_denied() {
            AppError::Forbidden(msg) => assert_eq!(msg, ACCESS_DENIED),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
