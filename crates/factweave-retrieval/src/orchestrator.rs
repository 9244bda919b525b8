//! Multi-strategy retrieval orchestration.
//!
//! Every query runs through the same pipeline: classification (tool-specific
//! queries skip retrieval entirely), temporal-intent detection (carried in
//! the result metadata for the answering layer), strategy dispatch
//! (shortest-path traversal for relationship phrasing, concurrent decomposed
//! search for compound queries, a single standard search otherwise), uniform
//! post-processing (inclusive confidence threshold, fingerprint
//! deduplication), and an optional document-store fallback when the graph
//! returned too little. Context text is rebuilt from the surviving facts,
//! never from raw strategy output.
//!
//! Graph RPC failures on the standard and decomposed paths surface to the
//! caller; silent degradation is the caller's policy, not this layer's.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use factweave_core::{defaults, Fact, GraphService, Result, TemporalIntent};
use factweave_query::{classify, decompose, detect_temporal_intent, should_decompose};

use crate::dedup::{average_confidence, dedup_facts, filter_by_threshold};
use crate::fallback::{should_trigger_fallback, FallbackCascade};

/// "how is X related to Y", "path between", "connected", "relationship".
static RELATIONSHIP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\brelationship\b|\bconnected\b|\bpath between\b|\bhow\b.*\brelated to\b")
        .unwrap()
});

/// A capitalized phrase: consecutive capitalized words taken as one entity.
static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][a-zA-Z0-9]*(?:\s+[A-Z][a-zA-Z0-9]*)*").unwrap());

/// Question scaffolding that starts with a capital but names nothing.
const SCAFFOLD_WORDS: &[&str] = &[
    "How", "What", "Which", "Who", "When", "Where", "Why", "Is", "Are", "Does", "Do", "Can",
    "The", "A", "An", "Tell", "Show", "Explain",
];

/// Tunables for one orchestrator instance.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalConfig {
    /// Per-search result limit passed to the graph service.
    pub top_k: usize,
    /// Minimum confidence (inclusive) for a fact to survive filtering.
    pub confidence_threshold: f64,
    /// Hop bound for shortest-path traversal.
    pub max_path_hops: usize,
    /// Primary result count below which the fallback cascade runs.
    pub min_results: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: defaults::SEARCH_TOP_K,
            confidence_threshold: defaults::CONFIDENCE_THRESHOLD,
            max_path_hops: defaults::MAX_PATH_HOPS,
            min_results: defaults::MIN_RESULTS_THRESHOLD,
        }
    }
}

/// Per-query observability attached to every result.
#[derive(Debug, Clone)]
pub struct RetrievalMetadata {
    /// "skipped", "path", "decomposed", or "standard".
    pub strategy: String,
    pub subquery_count: usize,
    pub latency_ms: u64,
    pub avg_confidence: f64,
    pub fallback_used: bool,
    /// Recency/history signal detected in the query, for the caller to
    /// apply when it assembles the final answer.
    pub temporal: TemporalIntent,
}

/// Final answer of one retrieval run.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub facts: Vec<Fact>,
    pub context: String,
    pub metadata: RetrievalMetadata,
}

impl RetrievalResult {
    fn skipped(temporal: TemporalIntent) -> Self {
        Self {
            facts: vec![],
            context: String::new(),
            metadata: RetrievalMetadata {
                strategy: "skipped".into(),
                subquery_count: 0,
                latency_ms: 0,
                avg_confidence: 0.0,
                fallback_used: false,
                temporal,
            },
        }
    }
}

/// Outcome of one dispatch strategy, before uniform post-processing.
struct StrategyOutcome {
    facts: Vec<Fact>,
    strategy: &'static str,
    subquery_count: usize,
    latency_ms: u64,
    /// Decomposed merges are re-sorted by confidence; standard search
    /// preserves the graph service's return order.
    sort_by_confidence: bool,
}

/// Routes each query to the best retrieval strategy.
pub struct RetrievalOrchestrator {
    graph: Arc<dyn GraphService>,
    fallback: Option<FallbackCascade>,
    config: RetrievalConfig,
}

impl RetrievalOrchestrator {
    pub fn new(graph: Arc<dyn GraphService>, config: RetrievalConfig) -> Self {
        Self {
            graph,
            fallback: None,
            config,
        }
    }

    /// Attach a document-store fallback cascade.
    pub fn with_fallback(mut self, fallback: FallbackCascade) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Retrieve ranked, deduplicated facts for a query.
    #[instrument(
        skip(self),
        fields(subsystem = "retrieval", component = "orchestrator")
    )]
    pub async fn search(&self, query: &str, tenant_id: &str) -> Result<RetrievalResult> {
        let classification = classify(query);
        let temporal = detect_temporal_intent(query);
        if classification.should_skip_search {
            debug!(reason = %classification.reason, "Retrieval skipped");
            return Ok(RetrievalResult::skipped(temporal));
        }
        if !temporal.is_empty() {
            debug!(
                requires_latest = temporal.requires_latest,
                is_historical = temporal.is_historical,
                date_from = ?temporal.date_from,
                "Temporal intent detected"
            );
        }

        let group_ids = vec![tenant_id.to_string()];
        let outcome = self.dispatch(query, tenant_id, &group_ids).await?;

        let mut facts = filter_by_threshold(outcome.facts, self.config.confidence_threshold);
        facts = dedup_facts(facts);
        if outcome.sort_by_confidence {
            facts.sort_by(|a, b| {
                b.confidence()
                    .partial_cmp(&a.confidence())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        let mut latency_ms = outcome.latency_ms;
        let mut fallback_used = false;

        if should_trigger_fallback(facts.len(), self.config.min_results) {
            if let Some(cascade) = &self.fallback {
                let fb = cascade.execute(tenant_id, query).await;
                if !fb.facts.is_empty() {
                    fallback_used = true;
                    latency_ms += fb.latency_ms;
                    facts.extend(fb.facts);
                    facts = dedup_facts(facts);
                }
            }
        }

        // Context mirrors exactly the facts that survived filtering,
        // deduplication, and the fallback merge.
        let context = facts
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let avg_confidence = average_confidence(&facts);
        info!(
            strategy = outcome.strategy,
            result_count = facts.len(),
            subquery_count = outcome.subquery_count,
            avg_confidence,
            duration_ms = latency_ms,
            fallback_used,
            "Retrieval completed"
        );

        Ok(RetrievalResult {
            facts,
            context,
            metadata: RetrievalMetadata {
                strategy: outcome.strategy.to_string(),
                subquery_count: outcome.subquery_count,
                latency_ms,
                avg_confidence,
                fallback_used,
                temporal,
            },
        })
    }

    async fn dispatch(
        &self,
        query: &str,
        tenant_id: &str,
        group_ids: &[String],
    ) -> Result<StrategyOutcome> {
        if RELATIONSHIP_RE.is_match(query) {
            if let Some(outcome) = self.try_path_search(query, tenant_id).await {
                return Ok(outcome);
            }
        }

        if should_decompose(query) {
            let subqueries = decompose(query);
            if subqueries.len() > 1 {
                return self.decomposed_search(subqueries, group_ids).await;
            }
        }

        self.standard_search(query, group_ids).await
    }

    /// Shortest-path traversal between the first two named entities.
    /// Any failure falls through to the next strategy, returning None.
    async fn try_path_search(&self, query: &str, tenant_id: &str) -> Option<StrategyOutcome> {
        let entities = extract_entities(query);
        if entities.len() < 2 {
            debug!("Relationship phrasing without two entities, falling through");
            return None;
        }

        let start = Instant::now();
        let path = match self
            .graph
            .shortest_path(&entities[0], &entities[1], tenant_id, self.config.max_path_hops)
            .await
        {
            Ok(Some(path)) => path,
            Ok(None) => {
                debug!(
                    start_entity = %entities[0],
                    end_entity = %entities[1],
                    "No path found, falling through"
                );
                return None;
            }
            Err(err) => {
                warn!(error = %err, "Path traversal failed, falling through");
                return None;
            }
        };

        let facts: Vec<Fact> = path
            .facts
            .into_iter()
            .map(|mut f| {
                f.score = Some(defaults::PATH_CONFIDENCE);
                f
            })
            .collect();

        Some(StrategyOutcome {
            facts,
            strategy: "path",
            subquery_count: 1,
            latency_ms: start.elapsed().as_millis() as u64,
            sort_by_confidence: false,
        })
    }

    /// One concurrent graph search per sub-query, merged confidence-descending.
    async fn decomposed_search(
        &self,
        subqueries: Vec<factweave_core::SubQuery>,
        group_ids: &[String],
    ) -> Result<StrategyOutcome> {
        let subquery_count = subqueries.len();
        debug!(subquery_count, "Dispatching decomposed search");

        let searches = subqueries.iter().map(|sq| {
            let graph = Arc::clone(&self.graph);
            let text = sq.text.clone();
            let group_ids = group_ids.to_vec();
            let top_k = self.config.top_k;
            async move {
                let start = Instant::now();
                let facts = graph.search(&text, &group_ids, top_k).await?;
                Ok::<_, factweave_core::Error>((facts, start.elapsed().as_millis() as u64))
            }
        });

        let mut facts = Vec::new();
        let mut latency_ms = 0u64;
        for result in join_all(searches).await {
            let (sub_facts, sub_latency) = result?;
            latency_ms += sub_latency;
            facts.extend(sub_facts);
        }

        Ok(StrategyOutcome {
            facts,
            strategy: "decomposed",
            subquery_count,
            latency_ms,
            sort_by_confidence: true,
        })
    }

    async fn standard_search(&self, query: &str, group_ids: &[String]) -> Result<StrategyOutcome> {
        let start = Instant::now();
        let facts = self
            .graph
            .search(query, group_ids, self.config.top_k)
            .await?;

        Ok(StrategyOutcome {
            facts,
            strategy: "standard",
            subquery_count: 1,
            latency_ms: start.elapsed().as_millis() as u64,
            sort_by_confidence: false,
        })
    }
}

/// Capitalized entity-like phrases of a query, scaffolding words dropped.
fn extract_entities(query: &str) -> Vec<String> {
    ENTITY_RE
        .find_iter(query)
        .map(|m| {
            m.as_str()
                .split_whitespace()
                .filter(|w| !SCAFFOLD_WORDS.contains(w))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|e| !e.is_empty())
        .collect()
}
