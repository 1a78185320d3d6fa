use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::chunk::JargonTerm;

/// Per-speaker statistics computed by the backend once the meeting ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerSummary {
    pub speaker_id: String,

    /// Number of speech segments attributed to the speaker
    pub total_segments: u64,

    /// Total speaking time in seconds
    pub total_duration: f64,

    pub word_count: u64,
    pub dominant_emotion: String,

    /// Emotion label -> share of the speaker's segments
    #[serde(default)]
    pub emotion_distribution: BTreeMap<String, f64>,
}

/// Authoritative terminal record for a session
///
/// Delivered at most once per session in a `summary_update` event. Its
/// speaker figures may merge speaker identities across chunks, which the
/// live aggregate cannot do, so it wins over local tallies for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalSummary {
    pub session_id: String,

    /// When the summary was produced
    #[serde(with = "crate::protocol::timestamp")]
    pub timestamp: DateTime<Utc>,

    pub combined_transcript: String,

    /// Narrative summary of the whole meeting
    pub final_summary: String,

    #[serde(default)]
    pub speakers_summary: BTreeMap<String, SpeakerSummary>,

    /// Emotion label -> share over the whole meeting
    #[serde(default)]
    pub emotions_summary: BTreeMap<String, f64>,

    #[serde(default)]
    pub jargon_summary: Vec<JargonTerm>,

    pub total_chunks: u64,

    /// Total meeting duration in seconds
    pub total_duration: f64,

    #[serde(default)]
    pub meeting_metadata: serde_json::Map<String, serde_json::Value>,
}
