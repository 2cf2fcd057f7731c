//! Router assembly: HTTP endpoints, WebSocket upgrade, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws` (one assessment per connection)
/// - REST-ish API under `/api/v1/...`
/// - CORS (allow any origin/method/headers) - adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/domains", get(http::http_domains))
        .route("/api/v1/progress", get(http::http_progress))
        .route("/api/v1/learning-path", get(http::http_learning_path))
        .route("/api/v1/assessments", post(http::http_start_assessment))
        .route(
            "/api/v1/assessments/:id",
            get(http::http_get_assessment).delete(http::http_abandon_assessment),
        )
        .route("/api/v1/assessments/:id/answer", post(http::http_submit_answer))
        .route("/api/v1/assessments/:id/next", post(http::http_next_question))
        .route("/api/v1/assessments/:id/finalize", post(http::http_finalize))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}
