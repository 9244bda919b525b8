//! Structured logging schema and field name constants for factweave.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events, operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data (facts, chunks) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "ingest", "retrieval", "query", "db", "graph", "sync"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "chunker", "pipeline", "orchestrator", "fallback", "client"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "ingest", "search", "add_episode_bulk", "emit"
pub const OPERATION: &str = "op";

/// Tenant (group) ID scoping the operation.
pub const TENANT_ID: &str = "tenant_id";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Document UUID being operated on.
pub const DOCUMENT_ID: &str = "document_id";

/// Episode ID returned by the graph service.
pub const EPISODE_ID: &str = "episode_id";

/// Search query text.
pub const QUERY: &str = "query";

/// Idempotency key of a sync event.
pub const IDEMPOTENCY_KEY: &str = "idempotency_key";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of facts returned by a search.
pub const RESULT_COUNT: &str = "result_count";

/// Number of chunks produced or processed.
pub const CHUNK_COUNT: &str = "chunk_count";

/// Number of chunks that failed during sequential ingestion.
pub const FAILED_COUNT: &str = "failed_count";

/// Retry attempt number (1-based).
pub const ATTEMPT: &str = "attempt";

/// Number of sub-queries dispatched for a decomposed query.
pub const SUBQUERY_COUNT: &str = "subquery_count";

// ─── Retrieval fields ──────────────────────────────────────────────────────

/// Search strategy applied ("path", "decomposed", "standard", "cascade").
pub const STRATEGY: &str = "strategy";

/// Average confidence over surviving facts.
pub const AVG_CONFIDENCE: &str = "avg_confidence";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
