use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use vidpreview_core::AppError;

use crate::error::HttpAppError;
use crate::handlers::{health, hooks, video};
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.upload_body_limit_bytes;

    Router::new()
        .route("/health", get(health::health_check))
        .route("/video/info", get(video::video_info))
        .route("/video/preview", get(video::video_preview))
        .route("/hooks/upload", post(hooks::upload_hook))
        .route("/hooks/message", post(hooks::message_hook))
        .fallback(not_found)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> HttpAppError {
    AppError::NotFound("Not Found".to_string()).into()
}
