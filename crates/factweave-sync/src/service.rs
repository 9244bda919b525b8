//! Fire-and-forget sync of conversation events into the knowledge graph.
//!
//! `emit` never blocks the caller and never raises: the idempotency check
//! runs synchronously before any work begins, then processing is handed to
//! a background task whose failures are logged and dropped. A conversation
//! flow must not be breakable by its own bookkeeping.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, warn};

use factweave_core::{Episode, Error, GraphService, Result, SyncEvent, SyncEventKind};

use crate::idempotency::IdempotencyStore;

/// Payload of a [`SyncEventKind::Citation`] event.
#[derive(Debug, Deserialize)]
struct CitationPayload {
    /// Documents cited by the message; duplicates within one event are
    /// collapsed to a single episode.
    document_ids: Vec<String>,
    #[serde(default)]
    excerpt: Option<String>,
}

/// Payload of a [`SyncEventKind::Judgment`] event.
#[derive(Debug, Deserialize)]
struct JudgmentPayload {
    summary: String,
}

/// Payload of a [`SyncEventKind::Error`] event.
#[derive(Debug, Deserialize)]
struct ErrorPayload {
    message: String,
}

/// Accepts conversation events and records them as graph episodes at most
/// once per idempotency key.
pub struct SyncService {
    graph: Arc<dyn GraphService>,
    store: Arc<dyn IdempotencyStore>,
}

impl SyncService {
    pub fn new(graph: Arc<dyn GraphService>, store: Arc<dyn IdempotencyStore>) -> Self {
        Self { graph, store }
    }

    /// Emit an event. Non-blocking: duplicates are dropped synchronously,
    /// novel events are processed on a background task.
    pub fn emit(&self, event: SyncEvent) {
        if !self.store.insert_if_absent(&event.idempotency_key) {
            debug!(
                idempotency_key = %event.idempotency_key,
                "Duplicate event dropped"
            );
            return;
        }

        let graph = Arc::clone(&self.graph);
        tokio::spawn(async move {
            let key = event.idempotency_key.clone();
            if let Err(err) = process_event(graph, event).await {
                warn!(
                    idempotency_key = %key,
                    error = %err,
                    "Event processing failed"
                );
            }
        });
    }
}

/// Turn one accepted event into its graph episodes.
async fn process_event(graph: Arc<dyn GraphService>, event: SyncEvent) -> Result<()> {
    let episodes = build_episodes(&event)?;
    let episode_count = episodes.len();
    for episode in &episodes {
        graph.add_episode(episode).await?;
    }
    info!(
        idempotency_key = %event.idempotency_key,
        tenant_id = %event.tenant_id,
        episode_count,
        "Event synced"
    );
    Ok(())
}

fn build_episodes(event: &SyncEvent) -> Result<Vec<Episode>> {
    let now = Utc::now();
    let episode = |name: String, body: String, source: &str| Episode {
        name,
        body,
        source_description: source.to_string(),
        reference_time: now,
        group_id: event.tenant_id.clone(),
    };

    let episodes = match event.kind {
        SyncEventKind::Citation => {
            let payload: CitationPayload = decode(event)?;
            let mut seen_docs = std::collections::HashSet::new();
            payload
                .document_ids
                .iter()
                .filter(|id| seen_docs.insert(id.as_str()))
                .map(|doc_id| {
                    let body = match &payload.excerpt {
                        Some(excerpt) => {
                            format!("Message {} cited document {doc_id}: {excerpt}", event.message_id)
                        }
                        None => format!("Message {} cited document {doc_id}", event.message_id),
                    };
                    episode(
                        format!("citation:{}:{doc_id}", event.message_id),
                        body,
                        "sync: citation",
                    )
                })
                .collect()
        }
        SyncEventKind::Judgment => {
            let payload: JudgmentPayload = decode(event)?;
            vec![episode(
                format!("judgment:{}", event.message_id),
                payload.summary,
                "sync: judgment",
            )]
        }
        SyncEventKind::Error => {
            let payload: ErrorPayload = decode(event)?;
            vec![episode(
                format!("error:{}", event.message_id),
                format!("Message {} failed: {}", event.message_id, payload.message),
                "sync: error",
            )]
        }
    };

    Ok(episodes)
}

fn decode<T: serde::de::DeserializeOwned>(event: &SyncEvent) -> Result<T> {
    serde_json::from_value(event.payload.clone())
        .map_err(|e| Error::Serialization(format!("{:?} payload: {e}", event.kind)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idempotency::InMemoryIdempotencyStore;
    use factweave_graph::MockGraphService;
    use serde_json::json;

    fn citation_event(key: &str, doc_ids: &[&str]) -> SyncEvent {
        SyncEvent {
            kind: SyncEventKind::Citation,
            idempotency_key: key.to_string(),
            message_id: "msg-1".into(),
            tenant_id: "tenant-1".into(),
            payload: json!({ "document_ids": doc_ids }),
        }
    }

    fn service(mock: &MockGraphService) -> SyncService {
        SyncService::new(
            Arc::new(mock.clone()),
            Arc::new(InMemoryIdempotencyStore::new()),
        )
    }

    async fn drain() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_citation_produces_one_episode_per_document() {
        let mock = MockGraphService::new();
        let event = citation_event("evt-1", &["doc-a", "doc-b"]);

        process_event(Arc::new(mock.clone()), event).await.unwrap();

        let episodes = mock.episodes();
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].name, "citation:msg-1:doc-a");
        assert_eq!(episodes[1].name, "citation:msg-1:doc-b");
        assert!(episodes.iter().all(|e| e.group_id == "tenant-1"));
        assert!(episodes
            .iter()
            .all(|e| e.source_description == "sync: citation"));
    }

    #[tokio::test]
    async fn test_citation_collapses_duplicate_documents() {
        let mock = MockGraphService::new();
        let event = citation_event("evt-1", &["doc-a", "doc-a", "doc-b", "doc-a"]);

        process_event(Arc::new(mock.clone()), event).await.unwrap();
        assert_eq!(mock.episodes().len(), 2);
    }

    #[tokio::test]
    async fn test_judgment_produces_single_summary_episode() {
        let mock = MockGraphService::new();
        let event = SyncEvent {
            kind: SyncEventKind::Judgment,
            idempotency_key: "evt-2".into(),
            message_id: "msg-7".into(),
            tenant_id: "tenant-1".into(),
            payload: json!({ "summary": "The answer held up against cited sources." }),
        };

        process_event(Arc::new(mock.clone()), event).await.unwrap();

        let episodes = mock.episodes();
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].name, "judgment:msg-7");
        assert_eq!(episodes[0].body, "The answer held up against cited sources.");
    }

    #[tokio::test]
    async fn test_error_produces_tracking_episode() {
        let mock = MockGraphService::new();
        let event = SyncEvent {
            kind: SyncEventKind::Error,
            idempotency_key: "evt-3".into(),
            message_id: "msg-9".into(),
            tenant_id: "tenant-1".into(),
            payload: json!({ "message": "generation timed out" }),
        };

        process_event(Arc::new(mock.clone()), event).await.unwrap();

        let episodes = mock.episodes();
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].name, "error:msg-9");
        assert!(episodes[0].body.contains("generation timed out"));
    }

    #[tokio::test]
    async fn test_duplicate_key_processed_at_most_once() {
        let mock = MockGraphService::new();
        let svc = service(&mock);

        svc.emit(citation_event("evt-dup", &["doc-a"]));
        svc.emit(citation_event("evt-dup", &["doc-a"]));
        drain().await;

        assert_eq!(mock.call_count("add_episode"), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_both_processed() {
        let mock = MockGraphService::new();
        let svc = service(&mock);

        svc.emit(citation_event("evt-a", &["doc-a"]));
        svc.emit(citation_event("evt-b", &["doc-b"]));
        drain().await;

        assert_eq!(mock.call_count("add_episode"), 2);
    }

    #[tokio::test]
    async fn test_processing_failure_never_raises() {
        let mock = MockGraphService::new().with_add_episode_failures(1);
        let svc = service(&mock);

        // Graph rejection is logged inside the background task; emit itself
        // cannot fail.
        svc.emit(citation_event("evt-x", &["doc-a"]));
        drain().await;

        assert_eq!(mock.call_count("add_episode"), 1);
        assert!(mock.episodes().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_dropped_not_raised() {
        let mock = MockGraphService::new();
        let svc = service(&mock);

        svc.emit(SyncEvent {
            kind: SyncEventKind::Citation,
            idempotency_key: "evt-bad".into(),
            message_id: "msg-1".into(),
            tenant_id: "tenant-1".into(),
            payload: json!({ "unexpected": true }),
        });
        drain().await;

        assert_eq!(mock.call_count("add_episode"), 0);
    }
}
