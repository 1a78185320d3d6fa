use serde::{Deserialize, Serialize};

use super::aggregate::SessionAggregate;
use super::reconcile::SessionStatistics;
use super::summary::FinalSummary;
use crate::session::SessionStatus;

/// Header of one chunk in a snapshot (no transcript body)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkHeader {
    pub chunk_id: u64,
    pub start_time: f64,
    pub end_time: f64,
    pub speakers: Vec<String>,
    pub micro_summary: Option<String>,
}

/// Serializable read model of one session, published to viewers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub status: SessionStatus,
    pub chunk_count: usize,

    /// Seconds covered by received chunks
    pub covered_duration: f64,

    pub statistics: SessionStatistics,

    /// Ordered by `chunk_id`
    pub chunks: Vec<ChunkHeader>,

    pub summary: Option<FinalSummary>,
}

impl From<&SessionAggregate> for SessionSnapshot {
    fn from(aggregate: &SessionAggregate) -> Self {
        Self {
            session_id: aggregate.session_id().to_string(),
            status: aggregate.status(),
            chunk_count: aggregate.chunk_count(),
            covered_duration: aggregate.covered_duration(),
            statistics: aggregate.statistics(),
            chunks: aggregate
                .chunks()
                .map(|chunk| ChunkHeader {
                    chunk_id: chunk.chunk_id,
                    start_time: chunk.start_time,
                    end_time: chunk.end_time,
                    speakers: chunk.speaker_labels.iter().cloned().collect(),
                    micro_summary: chunk.micro_summary.clone(),
                })
                .collect(),
            summary: aggregate.final_summary().cloned(),
        }
    }
}
