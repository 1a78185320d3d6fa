use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// State of the physical connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Dropped unexpectedly, waiting out a backoff delay or redialing
    Reconnecting,
    /// Reconnect budget exhausted; only an explicit `connect` leaves this
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Notification delivered to connection-change observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionChange {
    Connecting {
        endpoint: String,
    },
    Connected {
        client_id: Option<String>,
    },
    /// A drop was detected; attempt `attempt` will dial after `delay`
    Reconnecting {
        attempt: u32,
        delay: Duration,
        reason: String,
    },
    Disconnected,
    /// Terminal: reconnect budget exhausted
    Failed {
        error: String,
    },
}

impl ConnectionChange {
    /// Connection state after this change
    pub fn state(&self) -> ConnectionState {
        match self {
            Self::Connecting { .. } => ConnectionState::Connecting,
            Self::Connected { .. } => ConnectionState::Connected,
            Self::Reconnecting { .. } => ConnectionState::Reconnecting,
            Self::Disconnected => ConnectionState::Disconnected,
            Self::Failed { .. } => ConnectionState::Failed,
        }
    }
}
