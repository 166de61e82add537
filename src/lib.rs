// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod config;
pub mod dedup;
pub mod enrich;
pub mod ingest;
pub mod learn;
pub mod normalize;
pub mod pipeline;
pub mod schedule;
pub mod score;
pub mod select;
pub mod state;
pub mod topics;

// ---- Re-exports for stable public API ----
pub use crate::config::CaptureConfig;
pub use crate::ingest::types::{CandidateItem, FeedProvider, FeedSource, SourceOrigin};
pub use crate::pipeline::{CaptureEngine, DigestBatch, DigestSink, RunOutcome, RunStats};
pub use crate::schedule::Window;
pub use crate::score::preference::PreferenceWeightTable;
pub use crate::score::ScoredRow;
pub use crate::select::SelectParams;
pub use crate::state::{CaptureState, FileStateStore, MemoryStateStore, StateStore};
pub use crate::topics::TopicCatalog;
