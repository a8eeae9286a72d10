use super::handlers;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let max_audio_bytes = state.max_audio_bytes;

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Audio relay
        .route("/relay", post(handlers::relay_audio))
        .route("/api/webhook", post(handlers::relay_audio))
        .layer(DefaultBodyLimit::max(max_audio_bytes))
        // Request logging, and access from the browser front end
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}
