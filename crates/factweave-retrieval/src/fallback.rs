//! Fallback cascade over the relational metadata store.
//!
//! When graph search returns too little, document text search stands in:
//! a relevance-ranked full-text pass first, then a keyword pass with
//! stop-word filtering, merged under the same fingerprint deduplication as
//! the primary path. Fallback facts carry a fixed, lower confidence to
//! signal reduced trust versus graph-native facts.
//!
//! Every error on this path degrades to an empty result; fallback is
//! best-effort and must never break the query it backs up.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument, warn};

use factweave_core::{defaults, DocumentHit, DocumentStore, Fact, Result};

use crate::dedup::dedup_facts;

/// Common English words excluded from keyword patterns.
const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "be", "of", "in", "on", "at", "for", "to",
    "and", "or", "not", "do", "does", "did", "what", "which", "how", "why", "when", "where",
    "who", "my", "our", "your", "with", "about", "it", "this", "that",
];

/// Whether the fallback cascade should run for a primary result count.
pub fn should_trigger_fallback(primary_count: usize, min_results: usize) -> bool {
    primary_count < min_results
}

/// Result of one fallback execution.
#[derive(Debug, Clone)]
pub struct FallbackResult {
    pub facts: Vec<Fact>,
    pub context: String,
    pub strategy_used: &'static str,
    pub latency_ms: u64,
}

impl FallbackResult {
    fn empty() -> Self {
        Self {
            facts: vec![],
            context: String::new(),
            strategy_used: "none",
            latency_ms: 0,
        }
    }
}

/// Configuration for the fallback cascade.
#[derive(Debug, Clone, Copy)]
pub struct FallbackConfig {
    /// Result count below which the cascade keeps trying more strategies.
    pub min_results: usize,
    /// Per-strategy result limit.
    pub search_limit: i64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            min_results: defaults::MIN_RESULTS_THRESHOLD,
            search_limit: defaults::FALLBACK_SEARCH_LIMIT,
        }
    }
}

/// Best-effort document-store fallback for graph search.
pub struct FallbackCascade {
    documents: Arc<dyn DocumentStore>,
    config: FallbackConfig,
}

impl FallbackCascade {
    pub fn new(documents: Arc<dyn DocumentStore>, config: FallbackConfig) -> Self {
        Self { documents, config }
    }

    /// Run the cascade. Never fails: errors degrade to an empty result
    /// with zero latency.
    #[instrument(skip(self), fields(subsystem = "retrieval", component = "fallback"))]
    pub async fn execute(&self, tenant_id: &str, query: &str) -> FallbackResult {
        match self.run_cascade(tenant_id, query).await {
            Ok(result) => {
                debug!(
                    strategy = result.strategy_used,
                    result_count = result.facts.len(),
                    "Fallback completed"
                );
                result
            }
            Err(err) => {
                warn!(error = %err, "Fallback cascade failed, degrading to empty result");
                FallbackResult::empty()
            }
        }
    }

    async fn run_cascade(&self, tenant_id: &str, query: &str) -> Result<FallbackResult> {
        let start = Instant::now();

        let text_hits = self
            .documents
            .text_search(tenant_id, query, self.config.search_limit)
            .await?;
        let mut facts: Vec<Fact> = text_hits.iter().map(hit_to_fact).collect();

        let strategy_used = if facts.len() >= self.config.min_results {
            "text"
        } else {
            let terms = keyword_terms(query);
            if !terms.is_empty() {
                let keyword_hits = self
                    .documents
                    .keyword_search(tenant_id, &terms, self.config.search_limit)
                    .await?;
                facts.extend(keyword_hits.iter().map(hit_to_fact));
            }
            "cascade"
        };

        let facts = dedup_facts(facts);
        let context = facts
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(FallbackResult {
            facts,
            context,
            strategy_used,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Stop-word-filtered keyword terms of a query.
pub fn keyword_terms(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| w.len() > 1 && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

fn hit_to_fact(hit: &DocumentHit) -> Fact {
    Fact {
        entity: hit.filename.clone(),
        relation: "mentions".into(),
        text: hit.snippet.clone(),
        score: Some(defaults::FALLBACK_CONFIDENCE),
        source_description: Some(format!("fallback: {}", hit.filename)),
        timestamp: None,
    }
}
