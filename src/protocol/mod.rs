//! Wire protocol of the streaming endpoint
//!
//! JSON text frames tagged by `type`:
//! - Server -> client: `connection`, `chunk_update`, `summary_update`, `status`,
//!   `heartbeat`, `subscription_confirmed`, `status_response`
//! - Client -> server: `subscribe`, `unsubscribe`, `heartbeat`, `get_status`

pub mod messages;
pub mod timestamp;

pub use messages::{
    ChunkPayload, ClientIntent, EmotionPayload, ServerEvent, SpeakersPayload, StatusEvent,
    TranscriptPayload,
};
