use std::collections::BTreeMap;
use tracing::debug;

use super::chunk::{Chunk, JargonTerm};
use super::summary::FinalSummary;
use crate::session::SessionStatus;

/// What `apply_chunk` did with an inbound chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// New `chunk_id`; tallies updated incrementally
    Appended,
    /// Redelivered `chunk_id`; log entry replaced and tallies recomputed
    Replaced,
    /// No aggregate exists for the session (never subscribed or unsubscribed)
    DiscardedUnknown,
    /// The aggregate is terminal (summary received or session errored)
    DiscardedFrozen,
}

impl ChunkOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Appended | Self::Replaced)
    }
}

#[derive(Debug, Clone)]
struct LogEntry {
    chunk: Chunk,
    /// Arrival sequence number, decides "latest definition" for jargon
    arrival: u64,
}

/// Continuously-updated view of one session, derived from its chunk log
///
/// The log is deduplicated by `chunk_id` (last write wins) and kept ordered by
/// `chunk_id`. Tallies are always equal to what a fresh fold over the
/// deduplicated log would produce, regardless of arrival order.
#[derive(Debug, Clone)]
pub struct SessionAggregate {
    session_id: String,
    log: BTreeMap<u64, LogEntry>,
    next_arrival: u64,
    emotion_tally: BTreeMap<String, u64>,
    speaker_tally: BTreeMap<String, u64>,
    jargon: BTreeMap<String, JargonTerm>,
    pub(super) status: SessionStatus,
    pub(super) final_summary: Option<FinalSummary>,
}

impl SessionAggregate {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            log: BTreeMap::new(),
            next_arrival: 0,
            emotion_tally: BTreeMap::new(),
            speaker_tally: BTreeMap::new(),
            jargon: BTreeMap::new(),
            status: SessionStatus::Idle,
            final_summary: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Terminal aggregates no longer accept chunks
    pub fn is_frozen(&self) -> bool {
        self.status.is_terminal()
    }

    /// Chunks ordered by `chunk_id` ascending, whatever the arrival order was
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> + '_ {
        self.log.values().map(|entry| &entry.chunk)
    }

    pub fn chunk(&self, chunk_id: u64) -> Option<&Chunk> {
        self.log.get(&chunk_id).map(|entry| &entry.chunk)
    }

    pub fn chunk_count(&self) -> usize {
        self.log.len()
    }

    /// Emotion label -> number of (speaker, chunk) votes
    pub fn emotion_tally(&self) -> &BTreeMap<String, u64> {
        &self.emotion_tally
    }

    /// Speaker label -> number of chunks the speaker appears in
    pub fn speaker_tally(&self) -> &BTreeMap<String, u64> {
        &self.speaker_tally
    }

    /// Deduplicated glossary, keyed by term
    pub fn jargon(&self) -> &BTreeMap<String, JargonTerm> {
        &self.jargon
    }

    /// Seconds covered by the received chunks
    pub fn covered_duration(&self) -> f64 {
        self.chunks().map(Chunk::duration).sum()
    }

    /// Record a chunk for this session.
    ///
    /// Callers route by `session_id`; a chunk for a frozen aggregate is
    /// discarded without touching the tallies.
    pub fn apply_chunk(&mut self, chunk: Chunk) -> ChunkOutcome {
        if self.is_frozen() {
            return ChunkOutcome::DiscardedFrozen;
        }

        let arrival = self.next_arrival;
        self.next_arrival += 1;
        let chunk_id = chunk.chunk_id;

        let entry = LogEntry { chunk, arrival };
        if self.log.insert(chunk_id, entry).is_some() {
            debug!(
                "Chunk {} redelivered for session {}, recomputing tallies",
                chunk_id, self.session_id
            );
            self.recompute();
            ChunkOutcome::Replaced
        } else {
            if let Some(entry) = self.log.get(&chunk_id) {
                Self::fold(
                    &entry.chunk,
                    &mut self.emotion_tally,
                    &mut self.speaker_tally,
                    &mut self.jargon,
                );
            }
            ChunkOutcome::Appended
        }
    }

    /// Rebuild every tally from the deduplicated log, in arrival order.
    fn recompute(&mut self) {
        self.emotion_tally.clear();
        self.speaker_tally.clear();
        self.jargon.clear();

        let mut entries: Vec<&LogEntry> = self.log.values().collect();
        entries.sort_by_key(|entry| entry.arrival);

        for entry in entries {
            Self::fold(
                &entry.chunk,
                &mut self.emotion_tally,
                &mut self.speaker_tally,
                &mut self.jargon,
            );
        }
    }

    fn fold(
        chunk: &Chunk,
        emotion_tally: &mut BTreeMap<String, u64>,
        speaker_tally: &mut BTreeMap<String, u64>,
        jargon: &mut BTreeMap<String, JargonTerm>,
    ) {
        // One vote per speaker entry, not weighted by confidence
        for score in chunk.per_speaker_emotion.values() {
            *emotion_tally.entry(score.emotion.clone()).or_insert(0) += 1;
        }

        for speaker in &chunk.speaker_labels {
            *speaker_tally.entry(speaker.clone()).or_insert(0) += 1;
        }

        for term in &chunk.jargon_terms {
            match jargon.get_mut(&term.term) {
                Some(existing) => {
                    existing.score = existing.score.max(term.score);
                    if !term.definition.is_empty() {
                        existing.definition = term.definition.clone();
                        existing.source = term.source.clone();
                    }
                }
                None => {
                    jargon.insert(term.term.clone(), term.clone());
                }
            }
        }
    }
}
