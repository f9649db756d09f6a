//! Admin user-management validation: payload rules that fail before any
//! store access.

use axum::{http::StatusCode, routing::patch, routing::post, Router};
use serde_json::json;
use tower::ServiceExt;

use rollcall_backend::{handlers, models::user::UserRole};

mod support;

use support::{authed_router, body_message, empty_request, json_request, seeded_user};

fn admin_routes() -> Router<rollcall_backend::state::AppState> {
    Router::new()
        .route("/admin/users", post(handlers::admin::users::create_user))
        .route(
            "/admin/users/{id}",
            patch(handlers::admin::users::update_user)
                .delete(handlers::admin::users::delete_user),
        )
        .route(
            "/admin/users/{id}/reset-password",
            post(handlers::admin::users::reset_password),
        )
}

#[tokio::test]
async fn create_user_rejects_short_password() {
    let app = authed_router(admin_routes(), seeded_user(UserRole::Admin, None));

    let response = app
        .oneshot(json_request(
            "POST",
            "/admin/users",
            json!({
                "employeeCode": "E-200",
                "name": "New Person",
                "email": "new@example.com",
                "password": "short1",
                "role": "EMPLOYEE"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_user_rejects_unknown_role() {
    let app = authed_router(admin_routes(), seeded_user(UserRole::Admin, None));

    let response = app
        .oneshot(json_request(
            "POST",
            "/admin/users",
            json!({
                "employeeCode": "E-200",
                "name": "New Person",
                "email": "new@example.com",
                "password": "longenough1",
                "role": "OVERLORD"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_user_requires_admin_role_in_the_handler() {
    // Defense in depth: even if routing let a manager through, the handler
    // itself refuses.
    let app = authed_router(admin_routes(), seeded_user(UserRole::Manager, None));

    let response = app
        .oneshot(json_request(
            "POST",
            "/admin/users",
            json!({
                "employeeCode": "E-200",
                "name": "New Person",
                "email": "new@example.com",
                "password": "longenough1",
                "role": "EMPLOYEE"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_message(response).await, "Access denied");
}

#[tokio::test]
async fn update_user_rejects_null_team() {
    let app = authed_router(admin_routes(), seeded_user(UserRole::Admin, None));

    let id = rollcall_backend::types::UserId::new();
    let response = app
        .oneshot(json_request(
            "PATCH",
            &format!("/admin/users/{}", id),
            json!({ "teamId": null }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_message(response).await.contains("teamId"));
}

#[tokio::test]
async fn update_user_rejects_invalid_start_date() {
    let app = authed_router(admin_routes(), seeded_user(UserRole::Admin, None));

    let id = rollcall_backend::types::UserId::new();
    for bad in ["2026-02-30", "2026-13-01", "yesterday"] {
        let response = app
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/admin/users/{}", id),
                json!({ "startDate": bad }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "startDate={bad}");
    }
}

#[tokio::test]
async fn reset_password_rejects_short_password() {
    let app = authed_router(admin_routes(), seeded_user(UserRole::Admin, None));

    let id = rollcall_backend::types::UserId::new();
    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/admin/users/{}/reset-password", id),
            json!({ "newPassword": "short" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_cannot_delete_self() {
    let admin = seeded_user(UserRole::Admin, None);
    let admin_id = admin.id;
    let app = authed_router(admin_routes(), admin);

    let response = app
        .oneshot(empty_request(
            "DELETE",
            &format!("/admin/users/{}", admin_id),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_message(response).await.contains("yourself"));
}

#[tokio::test]
async fn malformed_user_id_is_a_validation_error() {
    let app = authed_router(admin_routes(), seeded_user(UserRole::Admin, None));

    let response = app
        .oneshot(json_request(
            "PATCH",
            "/admin/users/not-a-uuid",
            json!({ "name": "X" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
