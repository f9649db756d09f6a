//! Role-policy behavior: every denial uses the same phrase and decides
//! before the target is read.

use axum::{http::StatusCode, routing::get, routing::post, Router};
use tower::ServiceExt;

use rollcall_backend::{handlers, models::user::UserRole, types::TeamId};

mod support;

use support::{authed_router, empty_request, body_message, seeded_user};

fn request_routes() -> Router<rollcall_backend::state::AppState> {
    Router::new()
        .route("/requests/pending", get(handlers::requests::pending_requests))
        .route("/requests/{id}/approve", post(handlers::requests::approve_request))
        .route("/requests/{id}/reject", post(handlers::requests::reject_request))
}

#[tokio::test]
async fn employee_cannot_list_pending_requests() {
    let app = authed_router(request_routes(), seeded_user(UserRole::Employee, None));

    let response = app
        .oneshot(empty_request("GET", "/requests/pending"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_message(response).await, "Access denied");
}

#[tokio::test]
async fn employee_cannot_approve_requests() {
    let app = authed_router(request_routes(), seeded_user(UserRole::Employee, None));

    let id = rollcall_backend::types::RequestId::new();
    let response = app
        .oneshot(empty_request("POST", &format!("/requests/{}/approve", id)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_message(response).await, "Access denied");
}

#[tokio::test]
async fn manager_without_team_has_manager_capabilities_disabled() {
    let app = authed_router(request_routes(), seeded_user(UserRole::Manager, None));

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/requests/pending"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let id = rollcall_backend::types::RequestId::new();
    let response = app
        .oneshot(empty_request("POST", &format!("/requests/{}/reject", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_message(response).await, "Access denied");
}

#[tokio::test]
async fn employee_cannot_read_users_by_id() {
    let routes = Router::new().route("/users/{id}", get(handlers::users::get_user));
    let app = authed_router(routes, seeded_user(UserRole::Employee, Some(TeamId::new())));

    let id = rollcall_backend::types::UserId::new();
    let response = app
        .oneshot(empty_request("GET", &format!("/users/{}", id)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_message(response).await, "Access denied");
}

#[tokio::test]
async fn company_scope_attendance_requires_admin() {
    let routes = Router::new().route("/attendance/today", get(handlers::attendance::today));
    let app = authed_router(routes, seeded_user(UserRole::Employee, None));

    let response = app
        .oneshot(empty_request("GET", "/attendance/today?scope=company"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_message(response).await, "Access denied");
}

#[tokio::test]
async fn team_scope_requires_a_team() {
    let routes = Router::new().route("/attendance/today", get(handlers::attendance::today));

    // Employee with a team still may not read the team scope.
    let team = TeamId::new();
    let app = authed_router(routes.clone(), seeded_user(UserRole::Employee, Some(team)));
    let response = app
        .oneshot(empty_request(
            "GET",
            &format!("/attendance/today?scope=team&teamId={}", team),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Manager cannot read a foreign team.
    let app = authed_router(
        routes.clone(),
        seeded_user(UserRole::Manager, Some(TeamId::new())),
    );
    let response = app
        .oneshot(empty_request(
            "GET",
            &format!("/attendance/today?scope=team&teamId={}", TeamId::new()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_message(response).await, "Access denied");

    // A team-less manager asking for the team scope has nothing to read.
    let app = authed_router(routes, seeded_user(UserRole::Manager, None));
    let response = app
        .oneshot(empty_request("GET", "/attendance/today?scope=team"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_scope_is_a_validation_error() {
    let routes = Router::new().route("/attendance/today", get(handlers::attendance::today));
    let app = authed_router(routes, seeded_user(UserRole::Admin, None));

    let response = app
        .oneshot(empty_request("GET", "/attendance/today?scope=galaxy"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
