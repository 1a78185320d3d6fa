use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::ProtocolError;
use crate::protocol::ChunkPayload;

/// Dominant emotion detected for one speaker within a chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionScore {
    /// Emotion label (e.g. "joy", "neutral")
    pub emotion: String,

    /// Confidence of the dominant emotion (0.0 to 1.0)
    pub confidence: f64,
}

/// A technical term spotted in the transcript, with its explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JargonTerm {
    pub term: String,

    /// Relevance score assigned by the detector
    pub score: f64,

    #[serde(default)]
    pub definition: String,

    /// Which detector produced the term (keybert, spacy, ...)
    #[serde(default)]
    pub source: String,
}

/// One unit of already-computed analysis for a contiguous time span
///
/// Built once from a `chunk_update` payload and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub session_id: String,

    /// Sequence number; monotonic at the producer, not on the wire
    pub chunk_id: u64,

    /// Offset into the meeting in seconds
    pub start_time: f64,
    pub end_time: f64,

    pub transcript_text: String,
    pub speaker_labels: BTreeSet<String>,
    pub per_speaker_emotion: BTreeMap<String, EmotionScore>,
    pub jargon_terms: Vec<JargonTerm>,
    pub micro_summary: Option<String>,
}

impl Chunk {
    /// Build a chunk from its wire representation.
    ///
    /// Speaker labels are the union of the diarized speakers and the speakers
    /// that carry an emotion score. A span with `end_time <= start_time` is
    /// rejected.
    pub fn from_payload(session_id: &str, payload: ChunkPayload) -> Result<Self, ProtocolError> {
        if payload.end_time.partial_cmp(&payload.start_time) != Some(Ordering::Greater) {
            return Err(ProtocolError::InvalidChunk {
                session_id: session_id.to_string(),
                chunk_id: payload.chunk_id,
                reason: format!(
                    "end_time {} is not after start_time {}",
                    payload.end_time, payload.start_time
                ),
            });
        }

        let mut speaker_labels: BTreeSet<String> =
            payload.speakers.speakers.into_iter().collect();
        speaker_labels.extend(payload.emotions.keys().cloned());

        let per_speaker_emotion = payload
            .emotions
            .into_iter()
            .map(|(speaker, score)| {
                (
                    speaker,
                    EmotionScore {
                        emotion: score.dominant_emotion,
                        confidence: score.confidence,
                    },
                )
            })
            .collect();

        let micro_summary = payload.micro_summary.filter(|s| !s.trim().is_empty());

        Ok(Self {
            session_id: session_id.to_string(),
            chunk_id: payload.chunk_id,
            start_time: payload.start_time,
            end_time: payload.end_time,
            transcript_text: payload.transcript.full_text,
            speaker_labels,
            per_speaker_emotion,
            jargon_terms: payload.jargon,
            micro_summary,
        })
    }

    /// Length of the covered span in seconds
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}
