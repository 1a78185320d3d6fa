use super::handlers;
use super::state::ViewState;
use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the viewer router with all routes
pub fn create_router(state: ViewState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/connection", get(handlers::get_connection))
        // Session read models
        .route("/sessions", get(handlers::list_sessions))
        .route("/sessions/:session_id", get(handlers::get_session))
        .route(
            "/sessions/:session_id/chunks",
            get(handlers::get_session_chunks),
        )
        .route(
            "/sessions/:session_id/summary",
            get(handlers::get_session_summary),
        )
        // Browser dashboards poll from other origins
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
