use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::headers::{request_id_middleware, security_headers_middleware};
use crate::AppState;

pub mod handlers;
pub mod manager;
pub mod viewer;

/// Build the full application router.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/", get(handlers::index))
        // Requester self-service
        .route(
            "/request/new",
            get(handlers::new_request_form).post(handlers::submit_request),
        )
        .route(
            "/request/edit/:token",
            get(handlers::edit_request_form).post(handlers::submit_edit),
        )
        .route("/request/:id", get(handlers::view_request))
        // Managers
        .route(
            "/manager/login/:level",
            get(manager::login_page).post(manager::login),
        )
        .route("/manager/:level", get(manager::dashboard).post(manager::login))
        .route(
            "/manager/:level/request/:id",
            get(manager::request_view).post(manager::decide),
        )
        // Read-only viewer
        .route("/viewer/login", get(viewer::login_page).post(viewer::login))
        .route("/viewer", get(viewer::dashboard))
        .fallback(fallback_404)
        .with_state(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}
