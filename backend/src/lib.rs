//! Workforce attendance and request-management service.
//!
//! The crate is organized the usual way for an axum + sqlx service: models
//! and repositories own persistence, services hold cross-cutting domain
//! logic (the business calendar), and handlers wire the HTTP surface to
//! both. All date keys derive from a fixed business-timezone offset.

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
    Extension, Router,
};
use std::sync::Arc;

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;
pub mod state;
pub mod types;
pub mod utils;
pub mod validation;

use crate::services::calendar::{CalendarService, CalendarServiceTrait};
use crate::state::AppState;

/// Builds the full application router: public auth, token-protected user
/// routes, and admin-gated management routes.
pub fn router(state: AppState) -> Router {
    let calendar: Arc<dyn CalendarServiceTrait> =
        Arc::new(CalendarService::new(state.pool.clone()));

    let public_routes = Router::new().route("/auth/login", post(handlers::auth::login));

    let user_routes = Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .route("/users/{id}", get(handlers::users::get_user))
        .route("/attendance/check-in", post(handlers::attendance::check_in))
        .route("/attendance/check-out", post(handlers::attendance::check_out))
        .route("/attendance/today", get(handlers::attendance::today))
        .route("/attendance/me", get(handlers::attendance::my_month))
        .route("/requests", post(handlers::requests::create_request))
        .route("/requests/me", get(handlers::requests::my_requests))
        .route("/requests/pending", get(handlers::requests::pending_requests))
        .route(
            "/requests/{id}/approve",
            post(handlers::requests::approve_request),
        )
        .route(
            "/requests/{id}/reject",
            post(handlers::requests::reject_request),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth,
        ));

    let admin_routes = Router::new()
        .route(
            "/admin/users",
            get(handlers::admin::users::list_users).post(handlers::admin::users::create_user),
        )
        .route("/admin/users/purge", post(handlers::admin::users::purge_users))
        .route(
            "/admin/users/{id}",
            patch(handlers::admin::users::update_user)
                .delete(handlers::admin::users::delete_user),
        )
        .route(
            "/admin/users/{id}/reset-password",
            post(handlers::admin::users::reset_password),
        )
        .route(
            "/admin/users/{id}/restore",
            post(handlers::admin::users::restore_user),
        )
        .route(
            "/admin/holidays",
            get(handlers::admin::holidays::list_holidays)
                .post(handlers::admin::holidays::create_holiday),
        )
        .route(
            "/admin/holidays/{id}",
            delete(handlers::admin::holidays::delete_holiday),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_admin,
        ));

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .layer(Extension(calendar))
        .layer(axum_middleware::from_fn(middleware::request_id::request_id))
        .with_state(state)
}
