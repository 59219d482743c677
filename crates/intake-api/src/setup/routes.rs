//! Route configuration and setup

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Setup all application routes
pub fn setup_routes(state: AppState) -> Router {
    let max_body = state.config.server.max_body_size_bytes;

    Router::new()
        .route("/upload", post(handlers::upload::upload_file))
        .route("/health", get(handlers::health::health_check))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body))
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(
            intake_infra::request_id_middleware,
        ))
}
