use thiserror::Error;

/// Errors surfaced to callers of the streaming client and session controller.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The initial `connect` call failed. Not retried automatically.
    #[error("failed to connect to {endpoint}: {reason}")]
    ConnectionError { endpoint: String, reason: String },

    /// Reconnect budget exhausted. The caller must reconnect explicitly.
    #[error("connection lost after {attempts} reconnect attempts")]
    ConnectionLost { attempts: u32 },

    /// A command that needs a live connection was issued while not connected.
    #[error("not connected to the streaming endpoint")]
    NotConnected,

    /// A lifecycle command was issued against a session in the wrong state.
    #[error("session {session_id} cannot {action} while {status}")]
    InvalidState {
        session_id: String,
        action: &'static str,
        status: String,
    },

    /// Writing to the live transport failed; the drop is handled on the next read.
    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The session-management API answered with a non-success status.
    #[error("session api returned {status}: {detail}")]
    Api { status: u16, detail: String },

    /// The session-management API could not be reached at all.
    #[error("session api unavailable: {0}")]
    ApiUnavailable(String),
}

/// A single inbound frame could not be turned into an event.
///
/// These never affect connection state: the frame is logged and dropped.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid chunk {chunk_id} for session {session_id}: {reason}")]
    InvalidChunk {
        session_id: String,
        chunk_id: u64,
        reason: String,
    },
}
