// Integration tests for the session-management REST client
//
// A small axum app plays the backend on a random local port.

use anyhow::Result;
use axum::{
    extract::{Json, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use meeting_stream::session::{HttpSessionApi, SessionApi, StartSessionRequest};
use meeting_stream::StreamError;
use serde_json::{json, Value};

async fn start_session(Json(body): Json<Value>) -> impl IntoResponse {
    let name = body["session_name"].as_str().unwrap_or("unnamed").to_string();
    Json(json!({
        "session_id": "3f2a9c",
        "status": "started",
        "message": format!("Session {} started", name)
    }))
}

async fn stop_session(Json(body): Json<Value>) -> impl IntoResponse {
    match body["session_id"].as_str() {
        Some("3f2a9c") => (
            StatusCode::OK,
            Json(json!({
                "session_id": "3f2a9c",
                "status": "stopped",
                "total_chunks": 8,
                "total_duration": 240.5,
                "message": "Session stopped successfully"
            })),
        ),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Session not found"})),
        ),
    }
}

async fn active_sessions() -> impl IntoResponse {
    Json(json!([{
        "session_id": "3f2a9c",
        "start_time": "2025-10-27 14:30:00.250000",
        "status": "active",
        "metadata": {"session_name": "standup"},
        "end_time": null
    }]))
}

async fn session_status(Path(session_id): Path<String>) -> impl IntoResponse {
    match session_id.as_str() {
        "3f2a9c" => (
            StatusCode::OK,
            Json(json!({
                "session_id": "3f2a9c",
                "status": "processing",
                "chunks_processed": 5
            })),
        ),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Session not found"})),
        ),
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "database_connected": true,
        "ai_models_loaded": true,
        "active_sessions": 1,
        "available_audio_devices": [
            {"device_id": 0, "name": "MacBook Pro Microphone", "channels": 1, "sample_rate": 48000.0}
        ],
        "version": "1.0.0"
    }))
}

async fn spawn_backend() -> Result<String> {
    let app = Router::new()
        .route("/sessions/start", post(start_session))
        .route("/sessions/stop", post(stop_session))
        .route("/sessions/active", get(active_sessions))
        .route("/sessions/:session_id/status", get(session_status))
        .route("/health", get(health));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Ok(format!("http://{}/", addr))
}

#[tokio::test]
async fn test_start_and_stop_session() -> Result<()> {
    let api = HttpSessionApi::new(spawn_backend().await?);
    assert!(!api.base_url().ends_with('/'));

    let started = api
        .start_session(&StartSessionRequest {
            session_name: Some("standup".to_string()),
            ..Default::default()
        })
        .await?;
    assert_eq!(started.session_id, "3f2a9c");
    assert_eq!(started.message, "Session standup started");

    let stopped = api.stop_session(&started.session_id).await?;
    assert_eq!(stopped.total_chunks, 8);
    assert_eq!(stopped.total_duration, 240.5);

    Ok(())
}

#[tokio::test]
async fn test_error_detail_is_surfaced() -> Result<()> {
    let api = HttpSessionApi::new(spawn_backend().await?);

    match api.stop_session("missing").await {
        Err(StreamError::Api { status, detail }) => {
            assert_eq!(status, 404);
            assert_eq!(detail, "Session not found");
        }
        other => panic!("unexpected result: {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_list_sessions_and_health() -> Result<()> {
    let api = HttpSessionApi::new(spawn_backend().await?);

    let sessions = api.list_active_sessions().await?;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].status, "active");
    assert!(sessions[0].end_time.is_none());

    let health = api.health().await?;
    assert!(health.models_loaded);
    assert_eq!(health.devices.len(), 1);
    assert_eq!(health.devices[0].name, "MacBook Pro Microphone");

    Ok(())
}

#[tokio::test]
async fn test_session_status_and_forgotten_session() -> Result<()> {
    let api = HttpSessionApi::new(spawn_backend().await?);

    let progress = api.session_status("3f2a9c").await?.expect("session is tracked");
    assert_eq!(progress.status.as_deref(), Some("processing"));
    assert_eq!(progress.details["chunks_processed"], 5);

    // Finished sessions leave the backend's registry
    assert!(api.session_status("gone").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_unreachable_backend_is_unavailable() {
    // Bind and release a port so nothing is listening on it
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = HttpSessionApi::new(format!("http://{}", addr));
    assert!(matches!(
        api.health().await,
        Err(StreamError::ApiUnavailable(_))
    ));
}
