use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aggregate::{FinalSummary, JargonTerm};
use crate::error::ProtocolError;

/// Transcription part of a processed chunk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptPayload {
    #[serde(default)]
    pub full_text: String,

    #[serde(default)]
    pub language: Option<String>,
}

/// Diarization part of a processed chunk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeakersPayload {
    #[serde(default)]
    pub speakers: Vec<String>,
}

/// Emotion scores for one speaker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionPayload {
    pub dominant_emotion: String,
    pub confidence: f64,

    #[serde(default)]
    pub all_emotions: BTreeMap<String, f64>,
}

/// Processed chunk as emitted by the analysis backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub chunk_id: u64,
    pub start_time: f64,
    pub end_time: f64,

    #[serde(default, with = "super::timestamp::option")]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default)]
    pub transcript: TranscriptPayload,

    #[serde(default)]
    pub speakers: SpeakersPayload,

    /// Speaker -> emotion scores
    #[serde(default)]
    pub emotions: BTreeMap<String, EmotionPayload>,

    #[serde(default)]
    pub jargon: Vec<JargonTerm>,

    #[serde(default)]
    pub micro_summary: Option<String>,

    #[serde(default)]
    pub processing_status: Option<String>,

    #[serde(default)]
    pub error: Option<String>,
}

/// Status update for one session, or for the whole endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    #[serde(default)]
    pub session_id: Option<String>,

    /// Human-readable status text
    pub status: String,

    #[serde(default)]
    pub details: Option<serde_json::Map<String, serde_json::Value>>,

    #[serde(default)]
    pub error: bool,
}

impl StatusEvent {
    /// Error flag: explicit `error: true` or an `error` entry in the details
    pub fn is_error(&self) -> bool {
        self.error
            || self
                .details
                .as_ref()
                .and_then(|d| d.get("error"))
                .is_some_and(|e| !e.is_null() && e != &serde_json::Value::Bool(false))
    }

    /// The backend finished stopping and told us no summary is coming
    pub fn summary_unavailable(&self) -> bool {
        self.details
            .as_ref()
            .and_then(|d| d.get("final_summary_available"))
            .and_then(serde_json::Value::as_bool)
            == Some(false)
    }
}

/// Messages pushed by the streaming endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Handshake acknowledgement, first frame on every connection
    Connection {
        status: String,
        #[serde(default)]
        client_id: Option<String>,
    },

    ChunkUpdate {
        session_id: String,
        chunk: ChunkPayload,
    },

    SummaryUpdate {
        session_id: String,
        summary: FinalSummary,
    },

    Status(StatusEvent),

    /// Liveness probe; must be echoed
    Heartbeat {
        #[serde(default, with = "super::timestamp::option")]
        server_time: Option<DateTime<Utc>>,
    },

    SubscriptionConfirmed {
        session_id: String,
        status: String,
    },

    /// Reply to a `get_status` intent
    StatusResponse {
        active_connections: u64,
        active_sessions: u64,
        #[serde(default)]
        client_subscriptions: u64,
    },
}

impl ServerEvent {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection",
            Self::ChunkUpdate { .. } => "chunk_update",
            Self::SummaryUpdate { .. } => "summary_update",
            Self::Status(_) => "status",
            Self::Heartbeat { .. } => "heartbeat",
            Self::SubscriptionConfirmed { .. } => "subscription_confirmed",
            Self::StatusResponse { .. } => "status_response",
        }
    }
}

/// Messages sent by the client to the streaming endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientIntent {
    Subscribe { session_id: String },
    Unsubscribe { session_id: String },
    Heartbeat,
    GetStatus,
}

impl ClientIntent {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}
