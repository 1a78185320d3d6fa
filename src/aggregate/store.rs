use std::collections::HashMap;
use tracing::debug;

use super::aggregate::{ChunkOutcome, SessionAggregate};
use super::chunk::Chunk;
use super::reconcile::SummaryOutcome;
use super::summary::FinalSummary;

/// Session id -> aggregate, for every session the client currently tracks
///
/// The store is the only owner of aggregate state; everything else reads.
#[derive(Debug, Default)]
pub struct AggregateStore {
    sessions: HashMap<String, SessionAggregate>,
}

impl AggregateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty aggregate unless one already exists.
    ///
    /// Returns true if a new aggregate was created.
    pub fn ensure(&mut self, session_id: &str) -> bool {
        if self.sessions.contains_key(session_id) {
            return false;
        }
        self.sessions
            .insert(session_id.to_string(), SessionAggregate::new(session_id));
        true
    }

    pub fn remove(&mut self, session_id: &str) -> Option<SessionAggregate> {
        self.sessions.remove(session_id)
    }

    pub fn get(&self, session_id: &str) -> Option<&SessionAggregate> {
        self.sessions.get(session_id)
    }

    pub(crate) fn get_mut(&mut self, session_id: &str) -> Option<&mut SessionAggregate> {
        self.sessions.get_mut(session_id)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn session_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.sessions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Route a chunk to its session's aggregate.
    ///
    /// Chunks for sessions without an aggregate are dropped: delivery can race
    /// an unsubscribe.
    pub fn apply_chunk(&mut self, chunk: Chunk) -> ChunkOutcome {
        match self.sessions.get_mut(&chunk.session_id) {
            Some(aggregate) => {
                let chunk_id = chunk.chunk_id;
                let outcome = aggregate.apply_chunk(chunk);
                if outcome == ChunkOutcome::DiscardedFrozen {
                    debug!(
                        "Discarding chunk {} for frozen session {}",
                        chunk_id,
                        aggregate.session_id()
                    );
                }
                outcome
            }
            None => {
                debug!(
                    "Discarding chunk {} for untracked session {}",
                    chunk.chunk_id, chunk.session_id
                );
                ChunkOutcome::DiscardedUnknown
            }
        }
    }

    pub fn apply_final_summary(&mut self, summary: FinalSummary) -> SummaryOutcome {
        match self.sessions.get_mut(&summary.session_id) {
            Some(aggregate) => aggregate.apply_final_summary(summary),
            None => {
                debug!(
                    "Discarding final summary for untracked session {}",
                    summary.session_id
                );
                SummaryOutcome::DiscardedUnknown
            }
        }
    }

    pub fn final_summary(&self, session_id: &str) -> Option<&FinalSummary> {
        self.sessions
            .get(session_id)
            .and_then(SessionAggregate::final_summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    fn chunk(session_id: &str, chunk_id: u64, speaker: &str) -> Chunk {
        Chunk {
            session_id: session_id.to_string(),
            chunk_id,
            start_time: 0.0,
            end_time: 1.0,
            transcript_text: String::new(),
            speaker_labels: [speaker.to_string()].into_iter().collect::<BTreeSet<_>>(),
            per_speaker_emotion: BTreeMap::new(),
            jargon_terms: Vec::new(),
            micro_summary: None,
        }
    }

    #[test]
    fn test_chunk_for_unknown_session_is_discarded() {
        let mut store = AggregateStore::new();
        store.ensure("s1");

        assert_eq!(
            store.apply_chunk(chunk("ghost", 1, "A")),
            ChunkOutcome::DiscardedUnknown
        );
        assert!(!store.contains("ghost"));
        assert_eq!(store.get("s1").unwrap().chunk_count(), 0);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let mut store = AggregateStore::new();
        store.ensure("s1");
        store.ensure("s2");

        store.apply_chunk(chunk("s1", 1, "A"));
        store.apply_chunk(chunk("s2", 1, "B"));

        assert_eq!(store.get("s1").unwrap().speaker_tally().len(), 1);
        assert!(store.get("s1").unwrap().speaker_tally().contains_key("A"));
        assert!(store.get("s2").unwrap().speaker_tally().contains_key("B"));
    }

    #[test]
    fn test_ensure_keeps_existing_aggregate() {
        let mut store = AggregateStore::new();
        assert!(store.ensure("s1"));
        store.apply_chunk(chunk("s1", 1, "A"));

        assert!(!store.ensure("s1"));
        assert_eq!(store.get("s1").unwrap().chunk_count(), 1);
    }
}
