//! Ingestion pipeline: documents in, graph episodes out.
//!
//! Three ingestion paths, all under the same retry policy:
//!
//! 1. Text at or under the chunk limit goes up as a single episode.
//! 2. Larger text is chunked and submitted through the bulk RPC.
//! 3. If bulk exhausts its retries, each chunk is ingested sequentially
//!    with its own retry budget; individual chunk failures are logged and
//!    skipped. Partial success is a valid terminal state, distinct from
//!    total failure.
//!
//! The sequential path is deliberately serial: chunks of one document share
//! a logical ingestion context on the graph side. Only the bulk RPC, which
//! the service handles atomically, writes chunks in one shot.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use factweave_core::{
    retry, DocumentStore, Episode, Error, GraphService, NewDocument, ObjectStore, Result,
    RetryPolicy, TextExtractor,
};

use crate::chunking::{chunk_code, chunk_text, ChunkerConfig};

/// Pipeline configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestConfig {
    pub chunker: ChunkerConfig,
    pub retry: RetryPolicy,
}

/// Outcome of an ingestion run. `failed_chunks > 0` with a non-empty id
/// list means partial success; callers must not assume every chunk landed.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub episode_ids: Vec<String>,
    pub chunk_count: usize,
    pub failed_chunks: usize,
}

/// Orchestrates chunking, versioning, storage, and graph ingestion.
pub struct IngestionPipeline {
    graph: Arc<dyn GraphService>,
    documents: Arc<dyn DocumentStore>,
    storage: Arc<dyn ObjectStore>,
    extractor: Arc<dyn TextExtractor>,
    config: IngestConfig,
}

impl IngestionPipeline {
    pub fn new(
        graph: Arc<dyn GraphService>,
        documents: Arc<dyn DocumentStore>,
        storage: Arc<dyn ObjectStore>,
        extractor: Arc<dyn TextExtractor>,
        config: IngestConfig,
    ) -> Self {
        Self {
            graph,
            documents,
            storage,
            extractor,
            config,
        }
    }

    /// Ingest already-extracted text for a tenant.
    ///
    /// Fails only if every chunk fails after retries.
    #[instrument(skip(self, text), fields(subsystem = "ingest", component = "pipeline"))]
    pub async fn ingest_text(
        &self,
        text: &str,
        tenant_id: &str,
        filename: &str,
        reference_time: DateTime<Utc>,
    ) -> Result<IngestOutcome> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("empty document text".into()));
        }

        if text.len() <= self.config.chunker.max_size {
            let episode = self.episode(text, tenant_id, filename, 1, 1, reference_time);
            let id = retry(&self.config.retry, "add_episode", || {
                self.graph.add_episode(&episode)
            })
            .await?;
            return Ok(IngestOutcome {
                episode_ids: vec![id],
                chunk_count: 1,
                failed_chunks: 0,
            });
        }

        let chunks = chunk_text(text, &self.config.chunker);
        self.ingest_chunks(chunks, tenant_id, filename, reference_time)
            .await
    }

    /// Ingest a batch of chunks: bulk first, sequential fallback.
    async fn ingest_chunks(
        &self,
        chunks: Vec<String>,
        tenant_id: &str,
        filename: &str,
        reference_time: DateTime<Utc>,
    ) -> Result<IngestOutcome> {
        let total = chunks.len();
        let episodes: Vec<Episode> = chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| self.episode(chunk, tenant_id, filename, i + 1, total, reference_time))
            .collect();

        debug!(chunk_count = total, "Attempting bulk ingestion");
        match retry(&self.config.retry, "add_episodes_bulk", || {
            self.graph.add_episodes_bulk(&episodes)
        })
        .await
        {
            Ok(ids) => {
                info!(chunk_count = total, "Bulk ingestion succeeded");
                return Ok(IngestOutcome {
                    episode_ids: ids,
                    chunk_count: total,
                    failed_chunks: 0,
                });
            }
            Err(err) => {
                warn!(
                    chunk_count = total,
                    error = %err,
                    "Bulk ingestion failed, falling back to sequential"
                );
            }
        }

        // Serial on purpose; see module docs.
        let mut episode_ids = Vec::new();
        let mut failed = 0usize;
        for (i, episode) in episodes.iter().enumerate() {
            match retry(&self.config.retry, "add_episode", || {
                self.graph.add_episode(episode)
            })
            .await
            {
                Ok(id) => episode_ids.push(id),
                Err(err) => {
                    failed += 1;
                    warn!(
                        chunk = i + 1,
                        chunk_count = total,
                        error = %err,
                        "Chunk ingestion failed, skipping"
                    );
                }
            }
        }

        if episode_ids.is_empty() {
            return Err(Error::Ingestion(format!("all {total} chunks failed")));
        }

        info!(
            chunk_count = total,
            failed_count = failed,
            "Sequential ingestion finished"
        );
        Ok(IngestOutcome {
            episode_ids,
            chunk_count: total,
            failed_chunks: failed,
        })
    }

    /// Full upload lifecycle: version check, hash dedup, extraction, blob
    /// storage, graph ingestion, and metadata bookkeeping.
    ///
    /// A re-upload of an existing filename must pass `allow_update`; it
    /// creates the next version linked to its predecessor, and the
    /// predecessor's episodes are expired best-effort.
    #[instrument(skip(self, raw_bytes), fields(subsystem = "ingest", component = "pipeline"))]
    pub async fn upload_document(
        &self,
        raw_bytes: &[u8],
        tenant_id: &str,
        filename: &str,
        allow_update: bool,
    ) -> Result<factweave_core::Document> {
        let content_hash = hex::encode(Sha256::digest(raw_bytes));

        if let Some(existing) = self.documents.find_by_hash(tenant_id, &content_hash).await? {
            return Err(Error::DuplicateDocument(format!(
                "identical content already uploaded as '{}'",
                existing.filename
            )));
        }

        let latest = self
            .documents
            .find_latest_version(tenant_id, filename)
            .await?;
        let (parent_id, version) = match &latest {
            Some(prev) if allow_update => (Some(prev.id), Some(prev.version + 1)),
            Some(_) => return Err(Error::DocumentExists(filename.to_string())),
            None => (None, None),
        };

        let extraction = self.extractor.extract(raw_bytes, filename)?;
        let storage_path = format!("{tenant_id}/{content_hash}/{filename}");
        self.storage.upload(&storage_path, raw_bytes).await?;

        let doc = self
            .documents
            .create_version(
                NewDocument {
                    tenant_id: tenant_id.to_string(),
                    filename: filename.to_string(),
                    file_type: file_type_of(filename),
                    storage_path,
                    content_hash,
                    extracted_text: Some(extraction.text.clone()),
                    metadata: serde_json::to_value(&extraction.metadata)?,
                },
                parent_id,
                version,
            )
            .await?;

        let reference_time = Utc::now();
        let outcome = if extraction.code_units.is_empty() {
            self.ingest_text(&extraction.text, tenant_id, filename, reference_time)
                .await?
        } else {
            let chunks = chunk_code(&extraction.code_units, &self.config.chunker);
            if chunks.is_empty() {
                self.ingest_text(&extraction.text, tenant_id, filename, reference_time)
                    .await?
            } else {
                self.ingest_chunks(chunks, tenant_id, filename, reference_time)
                    .await?
            }
        };

        self.documents
            .mark_processed(doc.id, &outcome.episode_ids)
            .await?;

        // The new version supersedes the old one's episodes. Best-effort:
        // the graph also invalidates contradicted facts by reference time.
        if let Some(prev) = latest {
            for episode_id in &prev.episode_ids {
                if let Err(err) = self.graph.expire_episode(episode_id).await {
                    warn!(episode_id = %episode_id, error = %err, "Failed to expire episode");
                }
            }
        }

        info!(
            document_id = %doc.id,
            tenant_id,
            chunk_count = outcome.chunk_count,
            failed_count = outcome.failed_chunks,
            "Document uploaded"
        );

        self.documents.fetch(doc.id).await
    }

    /// Delete a document row, then clean up its blob and episodes.
    /// Cleanup failures are logged, never escalated.
    #[instrument(skip(self), fields(subsystem = "ingest", component = "pipeline"))]
    pub async fn delete_document(&self, id: Uuid) -> Result<()> {
        let doc = self.documents.fetch(id).await?;
        self.documents.delete(id).await?;

        if let Err(err) = self.storage.delete(&doc.storage_path).await {
            warn!(document_id = %id, error = %err, "Failed to delete storage blob");
        }
        for episode_id in &doc.episode_ids {
            if let Err(err) = self.graph.delete_episode(episode_id).await {
                warn!(episode_id = %episode_id, error = %err, "Failed to delete episode");
            }
        }
        Ok(())
    }

    fn episode(
        &self,
        body: &str,
        tenant_id: &str,
        filename: &str,
        part: usize,
        total: usize,
        reference_time: DateTime<Utc>,
    ) -> Episode {
        let name = if total == 1 {
            filename.to_string()
        } else {
            format!("{filename} (part {part}/{total})")
        };
        Episode {
            name,
            body: body.to_string(),
            source_description: format!("upload: {filename}"),
            reference_time,
            group_id: tenant_id.to_string(),
        }
    }
}

fn file_type_of(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use factweave_core::{CodeUnit, Document, DocumentHit, Extraction};
    use factweave_graph::MockGraphService;

    // ── In-memory collaborators ────────────────────────────────────────────

    #[derive(Default)]
    struct MemoryDocumentStore {
        docs: Mutex<Vec<Document>>,
    }

    #[async_trait::async_trait]
    impl DocumentStore for MemoryDocumentStore {
        async fn find_latest_version(
            &self,
            tenant_id: &str,
            filename: &str,
        ) -> Result<Option<Document>> {
            Ok(self
                .docs
                .lock()
                .unwrap()
                .iter()
                .filter(|d| d.tenant_id == tenant_id && d.filename == filename)
                .max_by_key(|d| d.version)
                .cloned())
        }

        async fn find_by_hash(&self, tenant_id: &str, hash: &str) -> Result<Option<Document>> {
            Ok(self
                .docs
                .lock()
                .unwrap()
                .iter()
                .find(|d| d.tenant_id == tenant_id && d.content_hash == hash)
                .cloned())
        }

        async fn create_version(
            &self,
            doc: NewDocument,
            parent_id: Option<Uuid>,
            version: Option<i32>,
        ) -> Result<Document> {
            let mut docs = self.docs.lock().unwrap();
            if docs
                .iter()
                .any(|d| d.tenant_id == doc.tenant_id && d.content_hash == doc.content_hash)
            {
                return Err(Error::DuplicateDocument(doc.content_hash));
            }
            let created = Document {
                id: Uuid::new_v4(),
                tenant_id: doc.tenant_id,
                filename: doc.filename,
                file_type: doc.file_type,
                storage_path: doc.storage_path,
                content_hash: doc.content_hash,
                extracted_text: doc.extracted_text,
                processed: false,
                episode_ids: vec![],
                version: version.unwrap_or(1),
                parent_id,
                metadata: doc.metadata,
                created_at_utc: Utc::now(),
            };
            docs.push(created.clone());
            Ok(created)
        }

        async fn fetch(&self, id: Uuid) -> Result<Document> {
            self.docs
                .lock()
                .unwrap()
                .iter()
                .find(|d| d.id == id)
                .cloned()
                .ok_or(Error::DocumentNotFound(id))
        }

        async fn mark_processed(&self, id: Uuid, episode_ids: &[String]) -> Result<()> {
            let mut docs = self.docs.lock().unwrap();
            let doc = docs
                .iter_mut()
                .find(|d| d.id == id)
                .ok_or(Error::DocumentNotFound(id))?;
            doc.processed = true;
            doc.episode_ids = episode_ids.to_vec();
            Ok(())
        }

        async fn delete(&self, id: Uuid) -> Result<()> {
            let mut docs = self.docs.lock().unwrap();
            let before = docs.len();
            docs.retain(|d| d.id != id);
            if docs.len() == before {
                return Err(Error::DocumentNotFound(id));
            }
            Ok(())
        }

        async fn text_search(
            &self,
            _tenant_id: &str,
            _query: &str,
            _limit: i64,
        ) -> Result<Vec<DocumentHit>> {
            Ok(vec![])
        }

        async fn keyword_search(
            &self,
            _tenant_id: &str,
            _terms: &[String],
            _limit: i64,
        ) -> Result<Vec<DocumentHit>> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct MemoryObjectStore {
        blobs: Mutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait::async_trait]
    impl ObjectStore for MemoryObjectStore {
        async fn upload(&self, path: &str, bytes: &[u8]) -> Result<()> {
            self.blobs
                .lock()
                .unwrap()
                .insert(path.to_string(), bytes.to_vec());
            Ok(())
        }

        async fn download(&self, path: &str) -> Result<Vec<u8>> {
            self.blobs
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| Error::Storage(format!("no blob at {path}")))
        }

        async fn delete(&self, path: &str) -> Result<()> {
            self.blobs.lock().unwrap().remove(path);
            Ok(())
        }
    }

    /// Extractor that treats the bytes as UTF-8 text.
    struct PlainTextExtractor;

    impl TextExtractor for PlainTextExtractor {
        fn extract(&self, raw_bytes: &[u8], _filename: &str) -> Result<Extraction> {
            Ok(Extraction {
                text: String::from_utf8_lossy(raw_bytes).into_owned(),
                metadata: HashMap::new(),
                code_units: vec![],
            })
        }
    }

    /// Extractor that reports one code unit per input line.
    struct LineCodeExtractor;

    impl TextExtractor for LineCodeExtractor {
        fn extract(&self, raw_bytes: &[u8], _filename: &str) -> Result<Extraction> {
            let text = String::from_utf8_lossy(raw_bytes).into_owned();
            let code_units = text
                .lines()
                .filter(|l| !l.trim().is_empty())
                .enumerate()
                .map(|(i, line)| CodeUnit {
                    name: format!("unit_{i}"),
                    kind: "function".into(),
                    body: line.to_string(),
                })
                .collect();
            Ok(Extraction {
                text,
                metadata: HashMap::new(),
                code_units,
            })
        }
    }

    fn pipeline_with(graph: MockGraphService, config: IngestConfig) -> IngestionPipeline {
        IngestionPipeline::new(
            Arc::new(graph),
            Arc::new(MemoryDocumentStore::default()),
            Arc::new(MemoryObjectStore::default()),
            Arc::new(PlainTextExtractor),
            config,
        )
    }

    fn small_chunk_config() -> IngestConfig {
        IngestConfig {
            chunker: ChunkerConfig {
                max_size: 60,
                overlap: 0,
            },
            retry: RetryPolicy::with_max_attempts(3),
        }
    }

    /// Five paragraphs sized so each becomes exactly one chunk; the marked
    /// ones carry the mock's poison marker.
    fn five_paragraph_text(poison: &[usize]) -> String {
        (1..=5)
            .map(|i| {
                let tag = if poison.contains(&i) { "POISON" } else { "faafen" };
                format!("paragraph number {i} {tag} with filler text to size")
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[tokio::test(start_paused = true)]
    async fn test_small_text_single_episode() {
        let graph = MockGraphService::new();
        let pipeline = pipeline_with(graph.clone(), small_chunk_config());

        let outcome = pipeline
            .ingest_text("tiny document", "tenant-1", "tiny.txt", Utc::now())
            .await
            .unwrap();

        assert_eq!(outcome.episode_ids, vec!["ep-1"]);
        assert_eq!(outcome.chunk_count, 1);
        assert_eq!(graph.call_count("add_episode"), 1);
        assert_eq!(graph.call_count("add_episodes_bulk"), 0);
        assert_eq!(graph.episodes()[0].name, "tiny.txt");
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_episode_retries_then_succeeds() {
        let graph = MockGraphService::new().with_add_episode_failures(2);
        let pipeline = pipeline_with(graph.clone(), small_chunk_config());

        let outcome = pipeline
            .ingest_text("tiny document", "tenant-1", "tiny.txt", Utc::now())
            .await
            .unwrap();

        assert_eq!(outcome.episode_ids.len(), 1);
        assert_eq!(graph.call_count("add_episode"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_episode_fatal_after_budget() {
        let graph = MockGraphService::new().with_add_episode_failures(u32::MAX);
        let pipeline = pipeline_with(graph.clone(), small_chunk_config());

        let result = pipeline
            .ingest_text("tiny document", "tenant-1", "tiny.txt", Utc::now())
            .await;

        assert!(result.is_err());
        assert_eq!(graph.call_count("add_episode"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bulk_path_returns_all_ids() {
        let graph = MockGraphService::new();
        let pipeline = pipeline_with(graph.clone(), small_chunk_config());

        let outcome = pipeline
            .ingest_text(&five_paragraph_text(&[]), "tenant-1", "doc.txt", Utc::now())
            .await
            .unwrap();

        assert_eq!(outcome.episode_ids.len(), 5);
        assert_eq!(outcome.failed_chunks, 0);
        assert_eq!(graph.call_count("add_episodes_bulk"), 1);
        assert_eq!(graph.call_count("add_episode"), 0);
        assert!(graph.episodes()[0].name.contains("(part 1/5)"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_partial_success() {
        // Bulk always fails; chunks 2 and 4 are poisoned.
        let graph = MockGraphService::new()
            .with_bulk_failures(u32::MAX)
            .with_failing_body_marker("POISON");
        let pipeline = pipeline_with(graph.clone(), small_chunk_config());

        let outcome = pipeline
            .ingest_text(
                &five_paragraph_text(&[2, 4]),
                "tenant-1",
                "doc.txt",
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.episode_ids.len(), 3);
        assert_eq!(outcome.failed_chunks, 2);
        assert_eq!(outcome.chunk_count, 5);
        // Bulk retried 3 times, then 5 chunks: 3 succeed first try,
        // 2 poisoned retried 3 times each.
        assert_eq!(graph.call_count("add_episodes_bulk"), 3);
        assert_eq!(graph.call_count("add_episode"), 3 + 2 * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_failure_raises() {
        let graph = MockGraphService::new()
            .with_bulk_failures(u32::MAX)
            .with_failing_body_marker("POISON");
        let pipeline = pipeline_with(graph.clone(), small_chunk_config());

        let result = pipeline
            .ingest_text(
                &five_paragraph_text(&[1, 2, 3, 4, 5]),
                "tenant-1",
                "doc.txt",
                Utc::now(),
            )
            .await;

        match result {
            Err(Error::Ingestion(msg)) => assert!(msg.contains("all 5 chunks failed")),
            other => panic!("expected Ingestion error, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_text_rejected() {
        let pipeline = pipeline_with(MockGraphService::new(), small_chunk_config());
        let result = pipeline
            .ingest_text("   \n ", "tenant-1", "empty.txt", Utc::now())
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_creates_version_chain() {
        let graph = MockGraphService::new();
        let store = Arc::new(MemoryDocumentStore::default());
        let pipeline = IngestionPipeline::new(
            Arc::new(graph.clone()),
            store.clone(),
            Arc::new(MemoryObjectStore::default()),
            Arc::new(PlainTextExtractor),
            small_chunk_config(),
        );

        let v1 = pipeline
            .upload_document(b"first revision", "tenant-1", "notes.md", false)
            .await
            .unwrap();
        assert_eq!(v1.version, 1);
        assert!(v1.parent_id.is_none());
        assert!(v1.processed);
        assert_eq!(v1.episode_ids.len(), 1);

        let v2 = pipeline
            .upload_document(b"second revision", "tenant-1", "notes.md", true)
            .await
            .unwrap();
        assert_eq!(v2.version, 2);
        assert_eq!(v2.parent_id, Some(v1.id));

        // First row untouched apart from processing state.
        let v1_again = store.fetch(v1.id).await.unwrap();
        assert_eq!(v1_again.content_hash, v1.content_hash);
        assert_eq!(v1_again.version, 1);

        // Old episodes expired on update.
        assert_eq!(graph.expired(), v1.episode_ids);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_rejects_existing_filename_without_update() {
        let pipeline = pipeline_with(MockGraphService::new(), small_chunk_config());
        pipeline
            .upload_document(b"content", "tenant-1", "notes.md", false)
            .await
            .unwrap();

        let result = pipeline
            .upload_document(b"different content", "tenant-1", "notes.md", false)
            .await;
        assert!(matches!(result, Err(Error::DocumentExists(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_rejects_duplicate_hash() {
        let pipeline = pipeline_with(MockGraphService::new(), small_chunk_config());
        pipeline
            .upload_document(b"same bytes", "tenant-1", "a.txt", false)
            .await
            .unwrap();

        let result = pipeline
            .upload_document(b"same bytes", "tenant-1", "b.txt", false)
            .await;
        assert!(matches!(result, Err(Error::DuplicateDocument(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_code_document_one_episode_per_unit() {
        let graph = MockGraphService::new();
        let pipeline = IngestionPipeline::new(
            Arc::new(graph.clone()),
            Arc::new(MemoryDocumentStore::default()),
            Arc::new(MemoryObjectStore::default()),
            Arc::new(LineCodeExtractor),
            small_chunk_config(),
        );

        let doc = pipeline
            .upload_document(b"fn alpha() {}\nfn beta() {}\nfn gamma() {}", "tenant-1", "lib.rs", false)
            .await
            .unwrap();

        assert_eq!(doc.episode_ids.len(), 3);
        assert_eq!(graph.episodes().len(), 3);
        assert_eq!(graph.episodes()[1].body, "fn beta() {}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_document_cleans_up() {
        let graph = MockGraphService::new();
        let pipeline = pipeline_with(graph.clone(), small_chunk_config());

        let doc = pipeline
            .upload_document(b"to be removed", "tenant-1", "gone.txt", false)
            .await
            .unwrap();
        pipeline.delete_document(doc.id).await.unwrap();

        assert_eq!(graph.deleted(), doc.episode_ids);
        assert!(matches!(
            pipeline.delete_document(doc.id).await,
            Err(Error::DocumentNotFound(_))
        ));
    }

    #[test]
    fn test_file_type_of() {
        assert_eq!(file_type_of("report.PDF"), "pdf");
        assert_eq!(file_type_of("archive.tar.gz"), "gz");
        assert_eq!(file_type_of("README"), "bin");
    }
}
