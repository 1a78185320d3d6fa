use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::StreamError;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartSessionRequest {
    /// Optional human-readable session name
    pub session_name: Option<String>,

    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub status: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopSessionRequest {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopSessionResponse {
    pub session_id: String,
    pub status: String,
    pub total_chunks: u64,

    /// Session duration in seconds
    pub total_duration: f64,

    #[serde(default)]
    pub message: String,
}

/// A session known to the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,

    #[serde(with = "crate::protocol::timestamp")]
    pub start_time: DateTime<Utc>,

    pub status: String,

    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    #[serde(default, with = "crate::protocol::timestamp::option")]
    pub end_time: Option<DateTime<Utc>>,
}

/// Progress of a session the backend still tracks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionProgress {
    #[serde(default)]
    pub status: Option<String>,

    /// Remaining fields as reported (chunk counts, timings, metadata)
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioDeviceInfo {
    pub device_id: u32,
    pub name: String,
    pub channels: u16,
    pub sample_rate: f64,
}

/// Backend health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// "healthy" or "degraded"
    pub status: String,

    #[serde(default)]
    pub database_connected: bool,

    #[serde(rename = "ai_models_loaded")]
    pub models_loaded: bool,

    pub active_sessions: u64,

    #[serde(rename = "available_audio_devices", default)]
    pub devices: Vec<AudioDeviceInfo>,

    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
    error: Option<String>,
}

// ============================================================================
// Collaborator
// ============================================================================

/// External session-management service
///
/// Implementations:
/// - `HttpSessionApi`: the analysis backend's REST API
/// - Scripted fakes in tests
#[async_trait::async_trait]
pub trait SessionApi: Send + Sync {
    async fn start_session(
        &self,
        request: &StartSessionRequest,
    ) -> Result<StartSessionResponse, StreamError>;

    async fn stop_session(&self, session_id: &str) -> Result<StopSessionResponse, StreamError>;

    async fn list_active_sessions(&self) -> Result<Vec<SessionInfo>, StreamError>;

    /// Progress of one session; `None` once the backend no longer tracks it.
    async fn session_status(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionProgress>, StreamError>;

    async fn health(&self) -> Result<HealthStatus, StreamError>;
}

/// REST client for the session-management API
#[derive(Debug, Clone)]
pub struct HttpSessionApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSessionApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Decode a success body, or turn an error status into `StreamError::Api`.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StreamError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| StreamError::ApiUnavailable(format!("invalid response body: {}", e)));
        }

        let body = response.text().await.unwrap_or_default();
        let detail = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(ErrorBody {
                detail: Some(serde_json::Value::String(detail)),
                ..
            }) => detail,
            Ok(ErrorBody {
                detail: Some(detail),
                ..
            }) => detail.to_string(),
            Ok(ErrorBody {
                error: Some(error), ..
            }) => error,
            _ if body.is_empty() => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
            _ => body,
        };

        error!("Session API error {}: {}", status.as_u16(), detail);
        Err(StreamError::Api {
            status: status.as_u16(),
            detail,
        })
    }
}

fn unavailable(e: reqwest::Error) -> StreamError {
    StreamError::ApiUnavailable(e.to_string())
}

#[async_trait::async_trait]
impl SessionApi for HttpSessionApi {
    async fn start_session(
        &self,
        request: &StartSessionRequest,
    ) -> Result<StartSessionResponse, StreamError> {
        info!("Requesting new session (name={:?})", request.session_name);

        let response = self
            .client
            .post(self.url("/sessions/start"))
            .json(request)
            .send()
            .await
            .map_err(unavailable)?;

        Self::decode(response).await
    }

    async fn stop_session(&self, session_id: &str) -> Result<StopSessionResponse, StreamError> {
        info!("Requesting stop of session {}", session_id);

        let response = self
            .client
            .post(self.url("/sessions/stop"))
            .json(&StopSessionRequest {
                session_id: session_id.to_string(),
            })
            .send()
            .await
            .map_err(unavailable)?;

        Self::decode(response).await
    }

    async fn list_active_sessions(&self) -> Result<Vec<SessionInfo>, StreamError> {
        let response = self
            .client
            .get(self.url("/sessions/active"))
            .send()
            .await
            .map_err(unavailable)?;

        Self::decode(response).await
    }

    async fn session_status(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionProgress>, StreamError> {
        let response = self
            .client
            .get(self.url(&format!("/sessions/{}/status", session_id)))
            .send()
            .await
            .map_err(unavailable)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!("Backend no longer tracks session {}", session_id);
            return Ok(None);
        }
        Self::decode(response).await.map(Some)
    }

    async fn health(&self) -> Result<HealthStatus, StreamError> {
        let response = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(unavailable)?;

        Self::decode(response).await
    }
}
