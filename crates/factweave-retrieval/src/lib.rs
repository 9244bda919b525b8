//! Multi-strategy fact retrieval for factweave.
//!
//! Entry point is [`RetrievalOrchestrator`]: it classifies each query,
//! dispatches it to the best strategy (shortest-path traversal, concurrent
//! decomposed search, or a single standard search), post-processes results
//! uniformly, and optionally backs thin results with the document-store
//! [`FallbackCascade`].

pub mod dedup;
pub mod fallback;
pub mod orchestrator;

pub use dedup::{average_confidence, dedup_facts, filter_by_threshold, fingerprint};
pub use fallback::{
    should_trigger_fallback, FallbackCascade, FallbackConfig, FallbackResult,
};
pub use orchestrator::{
    RetrievalConfig, RetrievalMetadata, RetrievalOrchestrator, RetrievalResult,
};
