#![allow(dead_code)]

use axum::{body::Body, http::Request, Extension, Router};
use chrono::NaiveTime;
use http_body_util::BodyExt;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use rollcall_backend::{
    config::Config,
    error::AppError,
    models::user::{User, UserRole},
    services::calendar::{is_weekend, CalendarServiceTrait, DayClass},
    state::AppState,
    types::TeamId,
};

/// A pool that never connects. Handler paths under test must decide before
/// touching the store; reaching it would fail the request loudly.
pub fn lazy_pool() -> PgPool {
    PgPoolOptions::new()
        .max_connections(1)
        .connect_lazy("postgres://127.0.0.1:1/rollcall")
        .expect("lazy pool")
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://test".to_string(),
        jwt_secret: "test-jwt-secret-32-chars-minimum!!".to_string(),
        jwt_expiration_hours: 12,
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        business_utc_offset_hours: 7,
        shift_start: NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
        shift_end: NaiveTime::from_hms_opt(17, 30, 0).unwrap(),
        ot_start: NaiveTime::from_hms_opt(17, 31, 0).unwrap(),
        min_ot_duration_minutes: 30,
        grace_hours: 24,
        submit_window_days: 7,
        retention_days: 15,
        statement_timeout_secs: 10,
    }
}

pub fn test_state() -> AppState {
    AppState::new(lazy_pool(), test_config())
}

pub fn seeded_user(role: UserRole, team_id: Option<TeamId>) -> User {
    User::new(
        "E-100".into(),
        "user@example.com".into(),
        None,
        "unused-hash".into(),
        "Test User".into(),
        role,
        team_id,
        None,
        true,
    )
}

/// Calendar stub with a fixed holiday set; keeps calendar-dependent handlers
/// off the database in tests.
pub struct StubCalendar {
    pub holidays: HashSet<chrono::NaiveDate>,
}

#[async_trait::async_trait]
impl CalendarServiceTrait for StubCalendar {
    async fn classify(&self, date: chrono::NaiveDate) -> Result<DayClass, AppError> {
        if is_weekend(date) {
            Ok(DayClass::Weekend)
        } else if self.holidays.contains(&date) {
            Ok(DayClass::Holiday)
        } else {
            Ok(DayClass::Workday)
        }
    }

    async fn holidays_in(
        &self,
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
    ) -> Result<HashSet<chrono::NaiveDate>, AppError> {
        Ok(self
            .holidays
            .iter()
            .copied()
            .filter(|d| *d >= from && *d <= to)
            .collect())
    }
}

pub fn stub_calendar() -> Arc<dyn CalendarServiceTrait> {
    Arc::new(StubCalendar {
        holidays: HashSet::new(),
    })
}

/// Router over the handlers under test with the principal pre-injected, the
/// way the auth middleware would after token verification.
pub fn authed_router(routes: Router<AppState>, user: User) -> Router {
    routes
        .layer(Extension(stub_calendar()))
        .layer(Extension(user))
        .with_state(test_state())
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

pub async fn body_message(response: axum::response::Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    let value: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
    value["message"].as_str().unwrap_or_default().to_string()
}
