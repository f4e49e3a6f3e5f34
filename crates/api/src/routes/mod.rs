//! API routes.

pub mod health;
pub mod synth;

use axum::{http::Uri, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::response::ApiError;
use crate::state::AppState;

/// Creates the API router.
///
/// `/bot_event`, `/generate_session` and `/sessions_info` are aliases kept
/// for existing load-generation scripts.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/event", get(synth::event_handler))
        .route("/session", get(synth::session_handler))
        .route("/sessions", get(synth::sessions_handler))
        .route("/bot_event", get(synth::event_handler))
        .route("/generate_session", get(synth::session_handler))
        .route("/sessions_info", get(synth::sessions_handler))
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("no route for {}", uri.path()))
}
