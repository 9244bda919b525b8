//! Centralized default constants for the factweave engine.
//!
//! **This module is the single source of truth** for all shared default
//! values. All crates should reference these constants instead of defining
//! their own magic numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section and document the rationale for the chosen value.

// =============================================================================
// CHUNKING
// =============================================================================

/// Maximum characters per chunk submitted to the graph service as one episode.
///
/// Matches the episode body limit the graph service accepts without
/// truncating entity extraction context.
pub const CHUNK_SIZE: usize = 6000;

/// Overlap characters carried from the end of one chunk into the start of
/// the next, to preserve cross-chunk context for entity extraction.
pub const CHUNK_OVERLAP: usize = 200;

// =============================================================================
// INGESTION / RETRY
// =============================================================================

/// Maximum ingestion attempts per RPC (single, bulk, and per-chunk paths).
pub const RETRY_MAX_ATTEMPTS: u32 = 3;

/// Base backoff delay in milliseconds (doubled per attempt).
pub const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Backoff ceiling in milliseconds.
pub const RETRY_MAX_DELAY_MS: u64 = 10_000;

/// Graph-service RPC timeout in seconds. Entity extraction on large
/// documents is slow, so this is deliberately generous.
pub const GRAPH_RPC_TIMEOUT_SECS: u64 = 1800;

// =============================================================================
// RETRIEVAL
// =============================================================================

/// Minimum confidence for a fact to survive post-processing.
/// The boundary is inclusive: a fact scoring exactly this value is kept.
pub const CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Fixed confidence assigned to facts from a shortest-path traversal.
pub const PATH_CONFIDENCE: f64 = 0.8;

/// Fixed confidence assigned to fallback (non-graph) facts, signalling
/// reduced trust versus graph-native facts.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Primary result count below which the fallback cascade triggers.
pub const MIN_RESULTS_THRESHOLD: usize = 3;

/// Number of facts requested from the graph service per search.
pub const SEARCH_TOP_K: usize = 10;

/// Prefix length of the normalized fact text used as a deduplication key.
pub const FINGERPRINT_LEN: usize = 100;

/// Maximum hops for relationship/shortest-path traversals.
pub const MAX_PATH_HOPS: usize = 4;

// =============================================================================
// QUERY UNDERSTANDING
// =============================================================================

/// Minimum query length in characters before decomposition is attempted.
pub const DECOMPOSE_MIN_CHARS: usize = 30;

/// Minimum query word count before decomposition is attempted.
pub const DECOMPOSE_MIN_WORDS: usize = 5;

/// Question-chain fragments shorter than this are discarded.
pub const MIN_QUESTION_FRAGMENT_LEN: usize = 10;

/// Window in days for "latest/recent" temporal intent (date_from = now − window).
pub const LATEST_WINDOW_DAYS: i64 = 30;

// =============================================================================
// FALLBACK
// =============================================================================

/// Maximum documents returned by each fallback search strategy.
pub const FALLBACK_SEARCH_LIMIT: i64 = 10;

/// Snippet length in characters for fallback fact text built from
/// document content.
pub const FALLBACK_SNIPPET_LEN: usize = 300;
