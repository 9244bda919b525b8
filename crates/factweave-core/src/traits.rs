//! Collaborator contracts consumed by the orchestration engine.
//!
//! These traits define the interfaces that concrete implementations must
//! satisfy, enabling pluggable backends and testability. All components
//! receive their collaborators explicitly at construction; there are no
//! module-level singletons.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// GRAPH SERVICE
// =============================================================================

/// Traversal direction for relationship queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalDirection {
    Outbound,
    Inbound,
    Both,
}

/// Narrow RPC contract over the external knowledge-graph service.
///
/// All calls go over the network and must be assumed to fail transiently;
/// retry policy is the caller's concern.
#[async_trait]
pub trait GraphService: Send + Sync {
    /// Submit one episode for entity/relation extraction.
    async fn add_episode(&self, episode: &Episode) -> Result<String>;

    /// Submit a batch of episodes in a single atomically-handled call.
    async fn add_episodes_bulk(&self, episodes: &[Episode]) -> Result<Vec<String>>;

    /// Search facts scoped to the given tenant groups.
    async fn search(&self, query: &str, group_ids: &[String], top_k: usize) -> Result<Vec<Fact>>;

    /// All edges touching a named entity.
    async fn get_entity_edges(&self, entity: &str, group_ids: &[String]) -> Result<Vec<Fact>>;

    /// Bounded traversal from a start entity.
    async fn traverse(
        &self,
        start_entity: &str,
        relation_types: &[String],
        max_hops: usize,
        direction: TraversalDirection,
        tenant_id: &str,
    ) -> Result<Vec<GraphPath>>;

    /// Shortest path between two entities, if one exists within `max_hops`.
    async fn shortest_path(
        &self,
        start_entity: &str,
        end_entity: &str,
        tenant_id: &str,
        max_hops: usize,
    ) -> Result<Option<GraphPath>>;

    /// Delete an episode. Idempotent: a not-found result is success.
    async fn delete_episode(&self, episode_id: &str) -> Result<()>;

    /// Mark an episode superseded without deleting it (version history).
    async fn expire_episode(&self, episode_id: &str) -> Result<()>;
}

// =============================================================================
// METADATA STORE
// =============================================================================

/// Repository contract for versioned document rows, including the free-text
/// search capability consumed by the fallback cascade.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Latest version of a filename for a tenant, if any.
    async fn find_latest_version(&self, tenant_id: &str, filename: &str)
        -> Result<Option<Document>>;

    /// Document with the given content hash for a tenant, if any.
    async fn find_by_hash(&self, tenant_id: &str, hash: &str) -> Result<Option<Document>>;

    /// Create a document row. `parent_id`/`version` chain a re-upload onto
    /// its predecessor; both default for a first upload (version 1, no
    /// parent). Fails with `DuplicateDocument` on a per-tenant hash clash.
    async fn create_version(
        &self,
        doc: NewDocument,
        parent_id: Option<Uuid>,
        version: Option<i32>,
    ) -> Result<Document>;

    /// Fetch a document by ID.
    async fn fetch(&self, id: Uuid) -> Result<Document>;

    /// Record successful ingestion: set processed=true and attach the
    /// episode IDs that actually landed (possibly a subset).
    async fn mark_processed(&self, id: Uuid, episode_ids: &[String]) -> Result<()>;

    /// Delete a document row.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Relevance-ranked full-text search over extracted document text.
    async fn text_search(
        &self,
        tenant_id: &str,
        query: &str,
        limit: i64,
    ) -> Result<Vec<DocumentHit>>;

    /// Substring keyword search over extracted document text.
    async fn keyword_search(
        &self,
        tenant_id: &str,
        terms: &[String],
        limit: i64,
    ) -> Result<Vec<DocumentHit>>;
}

// =============================================================================
// OBJECT STORAGE
// =============================================================================

/// Blob storage for raw uploaded documents.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<()>;

    async fn download(&self, path: &str) -> Result<Vec<u8>>;

    /// Delete a blob. Failures during cleanup are the caller's to log,
    /// not escalate.
    async fn delete(&self, path: &str) -> Result<()>;
}

// =============================================================================
// TEXT EXTRACTION
// =============================================================================

/// External text-extraction collaborator (PDF/DOCX/plain-text/source-code).
///
/// Raises `Error::Extraction` for unsupported or corrupt input.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, raw_bytes: &[u8], filename: &str) -> Result<Extraction>;
}
