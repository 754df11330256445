use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower::ServiceBuilder;
use axum::extract::DefaultBodyLimit;

use super::handlers::*;
use super::AppState;

pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_mb * 1024 * 1024;

    Router::new()
        .route("/api/health", get(health))
        .route("/api/sample", get(get_sample))
        .route("/api/upload", post(upload_csv))
        .route("/api/extract", post(extract_csv))
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(body_limit))
                .layer(CorsLayer::permissive())
        )
        .with_state(state)
}
