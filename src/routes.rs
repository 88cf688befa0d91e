use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{middleware, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::auth::{require_admin, require_staff};
use crate::state::AppState;

/// Unmatched paths and unregistered methods both answer 404. The fallback is
/// wired on the router and on every method router so a wrong verb on a known
/// path never produces a 405.
async fn route_not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Route not found" })),
    )
}

pub fn app(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route(
            "/users/:user_id",
            put(handlers::users::update)
                .delete(handlers::users::delete)
                .fallback(route_not_found),
        )
        .route_layer(middleware::from_fn(require_admin));

    let staff_routes = Router::new()
        .route(
            "/assets/upload-url",
            post(handlers::assets::upload_url).fallback(route_not_found),
        )
        .route_layer(middleware::from_fn(require_staff));

    Router::new()
        .route(
            "/signin",
            post(handlers::auth::signin).fallback(route_not_found),
        )
        .route(
            "/forgot-password",
            post(handlers::auth::forgot_password).fallback(route_not_found),
        )
        .route(
            "/users",
            get(handlers::users::list)
                .post(handlers::users::create)
                .fallback(route_not_found),
        )
        .route(
            "/students",
            get(handlers::students::list)
                .post(handlers::students::create)
                .fallback(route_not_found),
        )
        .route(
            "/students/:student_id",
            get(handlers::students::get)
                .put(handlers::students::update)
                .delete(handlers::students::delete)
                .fallback(route_not_found),
        )
        .route(
            "/courses",
            get(handlers::courses::list)
                .post(handlers::courses::create)
                .fallback(route_not_found),
        )
        .route(
            "/courses/:course_id",
            get(handlers::courses::get)
                .put(handlers::courses::update)
                .delete(handlers::courses::delete)
                .fallback(route_not_found),
        )
        .route(
            "/courses/:course_id/modules",
            get(handlers::modules::list)
                .post(handlers::modules::create)
                .fallback(route_not_found),
        )
        .route(
            "/modules/:module_id",
            put(handlers::modules::update)
                .delete(handlers::modules::delete)
                .fallback(route_not_found),
        )
        .route(
            "/modules/:module_id/lessons",
            get(handlers::lessons::list)
                .post(handlers::lessons::create)
                .fallback(route_not_found),
        )
        .route(
            "/lessons/:lesson_id",
            put(handlers::lessons::update)
                .delete(handlers::lessons::delete)
                .fallback(route_not_found),
        )
        .route(
            "/batches",
            get(handlers::batches::list_all).fallback(route_not_found),
        )
        .route(
            "/courses/:course_id/batches",
            get(handlers::batches::list_by_course)
                .post(handlers::batches::create)
                .fallback(route_not_found),
        )
        .route(
            "/courses/:course_id/batches/:batch_id",
            get(handlers::batches::get)
                .put(handlers::batches::update)
                .fallback(route_not_found),
        )
        .route(
            "/batches/:batch_id",
            delete(handlers::batches::delete).fallback(route_not_found),
        )
        .route(
            "/batches/:batch_id/students",
            get(handlers::enrollments::roster)
                .post(handlers::enrollments::enroll)
                .fallback(route_not_found),
        )
        .route(
            "/batches/:batch_id/students/:student_id",
            delete(handlers::enrollments::unenroll).fallback(route_not_found),
        )
        .route(
            "/health",
            get(handlers::health::health).fallback(route_not_found),
        )
        .merge(admin_routes)
        .merge(staff_routes)
        .fallback(route_not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
