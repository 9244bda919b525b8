//! Domain model types shared across factweave crates.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// DOCUMENTS
// =============================================================================

/// A versioned unit of uploaded content in the metadata store.
///
/// For a given (tenant, filename), versions form a singly-linked chain via
/// `parent_id` with strictly increasing `version` numbers. A re-upload
/// creates a new row rather than mutating the old one.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    pub id: Uuid,
    pub tenant_id: String,
    pub filename: String,
    pub file_type: String,
    /// Object-storage path of the raw blob.
    pub storage_path: String,
    /// Hex SHA-256 digest of the raw bytes; unique per tenant.
    pub content_hash: String,
    pub extracted_text: Option<String>,
    pub processed: bool,
    /// Episode IDs produced from this document, in ingestion order.
    pub episode_ids: Vec<String>,
    /// Monotonic per (tenant, filename), starting at 1.
    pub version: i32,
    /// Previous version of the same filename, if any.
    pub parent_id: Option<Uuid>,
    pub metadata: serde_json::Value,
    pub created_at_utc: DateTime<Utc>,
}

/// Request for creating a new document row.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub tenant_id: String,
    pub filename: String,
    pub file_type: String,
    pub storage_path: String,
    pub content_hash: String,
    pub extracted_text: Option<String>,
    pub metadata: serde_json::Value,
}

/// A document row matched by the metadata store's text search, with the
/// relevance rank assigned by the store.
#[derive(Debug, Clone)]
pub struct DocumentHit {
    pub document_id: Uuid,
    pub filename: String,
    pub snippet: String,
    pub rank: f64,
}

// =============================================================================
// EPISODES
// =============================================================================

/// The atomic unit accepted by the graph service.
///
/// Episodes are immutable once created; updating a document creates new
/// episodes under a new reference time, and the graph service supersedes
/// contradicting older facts based on reference-time ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub name: String,
    pub body: String,
    /// Free-text provenance, e.g. "upload: report.pdf (part 2/5)".
    pub source_description: String,
    pub reference_time: DateTime<Utc>,
    /// Tenant/group identifier scoping the episode.
    pub group_id: String,
}

// =============================================================================
// FACTS
// =============================================================================

/// A single extracted relation returned by graph search.
///
/// Produced only by search, never persisted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    pub entity: String,
    pub relation: String,
    pub text: String,
    /// Confidence in [0,1]; a missing score is treated as 0 when filtering.
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Fact {
    /// Effective confidence used for filtering and ordering.
    pub fn confidence(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }
}

/// An ordered chain of facts from a graph traversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphPath {
    pub entities: Vec<String>,
    pub facts: Vec<Fact>,
    pub hops: usize,
}

// =============================================================================
// QUERY UNDERSTANDING
// =============================================================================

/// Why a query was split into multiple sub-queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubQueryKind {
    /// The query was not decomposed; this is the original text.
    Original,
    /// One side of a comparison ("X vs Y").
    ComparisonPart,
    /// One link of a multi-part or question chain.
    ChainPart,
}

/// One decomposed piece of an originally complex query.
///
/// Exists only within the lifetime of one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubQuery {
    pub text: String,
    /// 1 = highest priority.
    pub priority: u32,
    pub kind: SubQueryKind,
}

impl SubQuery {
    /// A single sub-query carrying the original, undecomposed text.
    pub fn original(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            priority: 1,
            kind: SubQueryKind::Original,
        }
    }
}

/// Temporal signal detected in a query. Pure derived value, not persisted.
///
/// `is_historical` and `requires_latest` may both be true; when they
/// conflict, `requires_latest` wins for `date_from`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemporalIntent {
    pub is_historical: bool,
    pub requires_latest: bool,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Optional hint about which data source the query targets.
    pub source_hint: Option<String>,
}

impl TemporalIntent {
    /// Whether any temporal signal was detected at all.
    pub fn is_empty(&self) -> bool {
        !self.is_historical
            && !self.requires_latest
            && self.date_from.is_none()
            && self.date_to.is_none()
    }
}

// =============================================================================
// SYNC EVENTS
// =============================================================================

/// Classification of a sync event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEventKind {
    Citation,
    Judgment,
    Error,
}

/// An idempotent notification consumed by the event sync service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEvent {
    pub kind: SyncEventKind,
    /// Caller-supplied key ensuring the event is processed at most once.
    pub idempotency_key: String,
    /// The conversation message this event concerns.
    pub message_id: String,
    pub tenant_id: String,
    pub payload: serde_json::Value,
}

// =============================================================================
// EXTRACTION
// =============================================================================

/// An AST-derived unit of a source-code document (function, class, type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeUnit {
    /// Qualified name, e.g. "mod::parse_header".
    pub name: String,
    /// Unit kind, e.g. "function", "class", "type".
    pub kind: String,
    pub body: String,
}

/// Output of the external text-extraction collaborator.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub text: String,
    pub metadata: HashMap<String, String>,
    /// Present only for recognized source-code documents.
    pub code_units: Vec<CodeUnit>,
}
