use super::state::ViewState;
use crate::aggregate::{ChunkHeader, SessionSnapshot};
use crate::connection::ConnectionState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectionResponse {
    pub state: ConnectionState,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn not_found(message: String) -> axum::response::Response {
    debug!("{}", message);
    (StatusCode::NOT_FOUND, Json(ErrorResponse { error: message })).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /connection
/// Current state of the streaming connection
pub async fn get_connection(State(state): State<ViewState>) -> impl IntoResponse {
    let connection = state.connection_state();
    (StatusCode::OK, Json(ConnectionResponse { state: connection }))
}

/// GET /sessions
/// Snapshots of every tracked session, ordered by session id
pub async fn list_sessions(State(state): State<ViewState>) -> impl IntoResponse {
    let mut snapshots: Vec<SessionSnapshot> =
        state.sessions.read().await.values().cloned().collect();
    snapshots.sort_by(|a, b| a.session_id.cmp(&b.session_id));
    (StatusCode::OK, Json(snapshots))
}

/// GET /sessions/:session_id
pub async fn get_session(
    State(state): State<ViewState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.snapshot(&session_id).await {
        Some(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        None => not_found(format!("Session {} not found", session_id)),
    }
}

/// GET /sessions/:session_id/chunks
/// Chunk headers ordered by chunk id
pub async fn get_session_chunks(
    State(state): State<ViewState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.snapshot(&session_id).await {
        Some(snapshot) => {
            let chunks: Vec<ChunkHeader> = snapshot.chunks;
            (StatusCode::OK, Json(chunks)).into_response()
        }
        None => not_found(format!("Session {} not found", session_id)),
    }
}

/// GET /sessions/:session_id/summary
/// Final summary, once the session has completed with one
pub async fn get_session_summary(
    State(state): State<ViewState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.snapshot(&session_id).await {
        Some(SessionSnapshot {
            summary: Some(summary),
            ..
        }) => (StatusCode::OK, Json(summary)).into_response(),
        Some(_) => not_found(format!("Session {} has no final summary", session_id)),
        None => not_found(format!("Session {} not found", session_id)),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
