//! Router configuration for the transcription webhook

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Metrics
        .route("/health", get(handlers::health))
        .route("/stats", get(handlers::stats))
        // CloudTalk
        .route("/cloudtalk/transcription", post(handlers::cloudtalk_transcription))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
