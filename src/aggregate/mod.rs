//! Per-session aggregation of streamed analysis chunks
//!
//! This module provides:
//! - The immutable `Chunk` and the authoritative `FinalSummary` records
//! - `SessionAggregate`: deduplicated chunk log plus speaker/emotion/jargon tallies
//! - Reconciliation of the live tallies with the final summary
//! - `AggregateStore`: routing of inbound records to the right session
//! - `SessionSnapshot`: serializable read model for viewers

mod aggregate;
mod chunk;
mod reconcile;
mod snapshot;
mod store;
mod summary;

pub use aggregate::{ChunkOutcome, SessionAggregate};
pub use chunk::{Chunk, EmotionScore, JargonTerm};
pub use reconcile::{SessionStatistics, StatisticsSource, SummaryOutcome};
pub use snapshot::{ChunkHeader, SessionSnapshot};
pub use store::AggregateStore;
pub use summary::{FinalSummary, SpeakerSummary};
