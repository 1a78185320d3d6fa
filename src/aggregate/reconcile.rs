//! Reconciliation of the live aggregate with the authoritative final summary

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::aggregate::SessionAggregate;
use super::chunk::JargonTerm;
use super::summary::FinalSummary;
use crate::error::StreamError;
use crate::session::SessionStatus;

/// What `apply_final_summary` did with an inbound summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryOutcome {
    /// Summary stored, session Completed and frozen
    Applied,
    /// No aggregate exists for the session
    DiscardedUnknown,
    /// The session already reached a terminal state
    DiscardedTerminal,
}

/// Where the figures of a statistics view come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticsSource {
    /// Tallies folded from the chunk log
    Live,
    /// Figures taken from the final summary
    Authoritative,
}

/// Speaker/emotion/jargon figures to display for a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatistics {
    pub source: StatisticsSource,

    /// Speaker -> chunk count (live) or segment count (authoritative)
    pub speakers: BTreeMap<String, u64>,

    /// Emotion -> vote count (live) or share of the meeting (authoritative)
    pub emotions: BTreeMap<String, f64>,

    pub jargon: Vec<JargonTerm>,
}

impl SessionAggregate {
    /// Freeze the aggregate under the authoritative summary.
    ///
    /// The chunk log is left untouched for audit.
    pub fn apply_final_summary(&mut self, summary: FinalSummary) -> SummaryOutcome {
        if self.status.is_terminal() {
            warn!(
                "Ignoring final summary for session {} (already {})",
                self.session_id(),
                self.status
            );
            return SummaryOutcome::DiscardedTerminal;
        }

        info!(
            "Final summary for session {}: {} chunks, {:.1}s (received {} chunks locally)",
            self.session_id(),
            summary.total_chunks,
            summary.total_duration,
            self.chunk_count()
        );

        self.final_summary = Some(summary);
        self.status = SessionStatus::Completed;
        SummaryOutcome::Applied
    }

    /// Complete the session when the backend reports that no summary will come.
    ///
    /// Only meaningful once a stop was requested; the live tallies remain the
    /// figures of record.
    pub fn complete_without_summary(&mut self) -> bool {
        if self.status != SessionStatus::Stopping {
            return false;
        }
        info!(
            "Session {} completed without a final summary",
            self.session_id()
        );
        self.status = SessionStatus::Completed;
        true
    }

    /// Move the lifecycle forward, rejecting backward or post-terminal moves.
    pub fn transition(&mut self, next: SessionStatus) -> Result<SessionStatus, StreamError> {
        if !self.status.can_advance_to(next) {
            return Err(StreamError::InvalidState {
                session_id: self.session_id().to_string(),
                action: "transition",
                status: self.status.to_string(),
            });
        }
        let previous = self.status;
        self.status = next;
        info!(
            "Session {}: {} -> {}",
            self.session_id(),
            previous,
            next
        );
        Ok(previous)
    }

    pub fn final_summary(&self) -> Option<&FinalSummary> {
        self.final_summary.as_ref()
    }

    /// Statistics to display, preferring the final summary when present.
    pub fn statistics(&self) -> SessionStatistics {
        match &self.final_summary {
            Some(summary) => SessionStatistics {
                source: StatisticsSource::Authoritative,
                speakers: summary
                    .speakers_summary
                    .iter()
                    .map(|(speaker, stats)| (speaker.clone(), stats.total_segments))
                    .collect(),
                emotions: summary.emotions_summary.clone(),
                jargon: summary.jargon_summary.clone(),
            },
            None => SessionStatistics {
                source: StatisticsSource::Live,
                speakers: self.speaker_tally().clone(),
                emotions: self
                    .emotion_tally()
                    .iter()
                    .map(|(emotion, count)| (emotion.clone(), *count as f64))
                    .collect(),
                jargon: self.jargon().values().cloned().collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::chunk::{Chunk, EmotionScore};
    use crate::aggregate::summary::SpeakerSummary;
    use crate::aggregate::ChunkOutcome;
    use chrono::Utc;

    fn chunk(chunk_id: u64, speaker: &str) -> Chunk {
        Chunk {
            session_id: "s1".to_string(),
            chunk_id,
            start_time: 0.0,
            end_time: 15.0,
            transcript_text: String::new(),
            speaker_labels: [speaker.to_string()].into_iter().collect(),
            per_speaker_emotion: [(
                speaker.to_string(),
                EmotionScore {
                    emotion: "neutral".to_string(),
                    confidence: 0.6,
                },
            )]
            .into_iter()
            .collect(),
            jargon_terms: Vec::new(),
            micro_summary: None,
        }
    }

    fn summary() -> FinalSummary {
        let mut speakers_summary = BTreeMap::new();
        speakers_summary.insert(
            "SPEAKER_00".to_string(),
            SpeakerSummary {
                speaker_id: "SPEAKER_00".to_string(),
                total_segments: 7,
                total_duration: 42.0,
                word_count: 120,
                dominant_emotion: "joy".to_string(),
                emotion_distribution: BTreeMap::new(),
            },
        );
        FinalSummary {
            session_id: "s1".to_string(),
            timestamp: Utc::now(),
            combined_transcript: "hello".to_string(),
            final_summary: "A short meeting".to_string(),
            speakers_summary,
            emotions_summary: [("joy".to_string(), 0.75)].into_iter().collect(),
            jargon_summary: Vec::new(),
            total_chunks: 2,
            total_duration: 30.0,
            meeting_metadata: Default::default(),
        }
    }

    #[test]
    fn test_summary_freezes_tallies() {
        let mut agg = SessionAggregate::new("s1");
        agg.transition(SessionStatus::Active).unwrap();
        agg.apply_chunk(chunk(1, "A"));

        assert_eq!(agg.apply_final_summary(summary()), SummaryOutcome::Applied);
        assert_eq!(agg.status(), SessionStatus::Completed);

        let tally_before = agg.speaker_tally().clone();
        assert_eq!(agg.apply_chunk(chunk(2, "B")), ChunkOutcome::DiscardedFrozen);
        assert_eq!(agg.apply_chunk(chunk(1, "C")), ChunkOutcome::DiscardedFrozen);
        assert_eq!(agg.speaker_tally(), &tally_before);
        assert_eq!(agg.chunk_count(), 1);
    }

    #[test]
    fn test_statistics_prefer_authoritative_summary() {
        let mut agg = SessionAggregate::new("s1");
        agg.apply_chunk(chunk(1, "A"));

        let live = agg.statistics();
        assert_eq!(live.source, StatisticsSource::Live);
        assert_eq!(live.speakers.get("A"), Some(&1));

        agg.apply_final_summary(summary());
        let stats = agg.statistics();
        assert_eq!(stats.source, StatisticsSource::Authoritative);
        assert_eq!(stats.speakers.get("SPEAKER_00"), Some(&7));
        assert!(!stats.speakers.contains_key("A"));
        assert_eq!(stats.emotions.get("joy"), Some(&0.75));

        // Raw log is still there
        assert_eq!(agg.chunks().count(), 1);
    }

    #[test]
    fn test_second_summary_is_discarded() {
        let mut agg = SessionAggregate::new("s1");
        agg.apply_final_summary(summary());

        let mut other = summary();
        other.final_summary = "Different".to_string();
        assert_eq!(agg.apply_final_summary(other), SummaryOutcome::DiscardedTerminal);
        assert_eq!(agg.final_summary().unwrap().final_summary, "A short meeting");
    }

    #[test]
    fn test_complete_without_summary_requires_stopping() {
        let mut agg = SessionAggregate::new("s1");
        agg.transition(SessionStatus::Active).unwrap();
        assert!(!agg.complete_without_summary());

        agg.transition(SessionStatus::Stopping).unwrap();
        assert!(agg.complete_without_summary());
        assert_eq!(agg.status(), SessionStatus::Completed);
        assert_eq!(agg.statistics().source, StatisticsSource::Live);
    }

    #[test]
    fn test_transition_rejects_backward_moves() {
        let mut agg = SessionAggregate::new("s1");
        agg.transition(SessionStatus::Stopping).unwrap();

        let err = agg.transition(SessionStatus::Active).unwrap_err();
        assert!(matches!(err, StreamError::InvalidState { .. }));
        assert_eq!(agg.status(), SessionStatus::Stopping);
    }
}
