//! Mock graph service for deterministic testing.
//!
//! Supports scripted failures so orchestration tests can exercise retry,
//! bulk-fallback, and partial-success paths without a live service.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use factweave_graph::MockGraphService;
//!
//! let graph = MockGraphService::new()
//!     .with_bulk_failures(u32::MAX)      // bulk path always fails
//!     .with_failing_body_marker("BAD");  // episodes containing "BAD" fail
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use factweave_core::{
    Episode, Error, Fact, GraphPath, GraphService, Result, TraversalDirection,
};

/// One recorded call, for assertions.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub operation: String,
    pub input: String,
}

#[derive(Default)]
struct MockState {
    episode_counter: u64,
    episodes: Vec<Episode>,
    expired: Vec<String>,
    deleted: Vec<String>,
    calls: Vec<MockCall>,
    add_episode_failures: u32,
    bulk_failures: u32,
    search_failures: u32,
    failing_body_marker: Option<String>,
    search_facts: Vec<Fact>,
    entity_edges: Vec<Fact>,
    shortest_path: Option<GraphPath>,
    shortest_path_fails: bool,
}

/// Deterministic in-memory `GraphService` implementation.
#[derive(Clone, Default)]
pub struct MockGraphService {
    state: Arc<Mutex<MockState>>,
}

impl MockGraphService {
    /// Create a mock with no scripted failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` `add_episode` calls with a transient graph error.
    pub fn with_add_episode_failures(self, n: u32) -> Self {
        self.state.lock().unwrap().add_episode_failures = n;
        self
    }

    /// Fail the next `n` `add_episodes_bulk` calls.
    pub fn with_bulk_failures(self, n: u32) -> Self {
        self.state.lock().unwrap().bulk_failures = n;
        self
    }

    /// Fail the next `n` `search` calls.
    pub fn with_search_failures(self, n: u32) -> Self {
        self.state.lock().unwrap().search_failures = n;
        self
    }

    /// Permanently fail any `add_episode` whose body contains `marker`.
    /// Lets tests fail specific chunks regardless of retry order.
    pub fn with_failing_body_marker(self, marker: impl Into<String>) -> Self {
        self.state.lock().unwrap().failing_body_marker = Some(marker.into());
        self
    }

    /// Facts returned by every `search` call.
    pub fn with_search_facts(self, facts: Vec<Fact>) -> Self {
        self.state.lock().unwrap().search_facts = facts;
        self
    }

    /// Facts returned by `get_entity_edges`.
    pub fn with_entity_edges(self, facts: Vec<Fact>) -> Self {
        self.state.lock().unwrap().entity_edges = facts;
        self
    }

    /// Path returned by `shortest_path`.
    pub fn with_shortest_path(self, path: GraphPath) -> Self {
        self.state.lock().unwrap().shortest_path = Some(path);
        self
    }

    /// Make `shortest_path` fail with a transient error.
    pub fn with_shortest_path_failure(self) -> Self {
        self.state.lock().unwrap().shortest_path_fails = true;
        self
    }

    /// Episodes successfully ingested so far.
    pub fn episodes(&self) -> Vec<Episode> {
        self.state.lock().unwrap().episodes.clone()
    }

    /// Episode IDs expired via `expire_episode`.
    pub fn expired(&self) -> Vec<String> {
        self.state.lock().unwrap().expired.clone()
    }

    /// Episode IDs removed via `delete_episode`.
    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    /// All recorded calls.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of calls recorded for one operation.
    pub fn call_count(&self, operation: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    fn record(state: &mut MockState, operation: &str, input: &str) {
        state.calls.push(MockCall {
            operation: operation.to_string(),
            input: input.to_string(),
        });
    }

    fn next_id(state: &mut MockState) -> String {
        state.episode_counter += 1;
        format!("ep-{}", state.episode_counter)
    }
}

#[async_trait]
impl GraphService for MockGraphService {
    async fn add_episode(&self, episode: &Episode) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        Self::record(&mut state, "add_episode", &episode.name);

        if let Some(marker) = &state.failing_body_marker {
            if episode.body.contains(marker.as_str()) {
                return Err(Error::Graph(format!("mock: rejected '{}'", episode.name)));
            }
        }
        if state.add_episode_failures > 0 {
            state.add_episode_failures -= 1;
            return Err(Error::Graph("mock: add_episode unavailable".into()));
        }

        state.episodes.push(episode.clone());
        Ok(Self::next_id(&mut state))
    }

    async fn add_episodes_bulk(&self, episodes: &[Episode]) -> Result<Vec<String>> {
        let mut state = self.state.lock().unwrap();
        Self::record(&mut state, "add_episodes_bulk", &episodes.len().to_string());

        if state.bulk_failures > 0 {
            state.bulk_failures = state.bulk_failures.saturating_sub(1);
            return Err(Error::Graph("mock: bulk unavailable".into()));
        }

        let mut ids = Vec::with_capacity(episodes.len());
        for episode in episodes {
            state.episodes.push(episode.clone());
            ids.push(Self::next_id(&mut state));
        }
        Ok(ids)
    }

    async fn search(&self, query: &str, _group_ids: &[String], top_k: usize) -> Result<Vec<Fact>> {
        let mut state = self.state.lock().unwrap();
        Self::record(&mut state, "search", query);

        if state.search_failures > 0 {
            state.search_failures -= 1;
            return Err(Error::Graph("mock: search unavailable".into()));
        }

        Ok(state.search_facts.iter().take(top_k).cloned().collect())
    }

    async fn get_entity_edges(&self, entity: &str, _group_ids: &[String]) -> Result<Vec<Fact>> {
        let mut state = self.state.lock().unwrap();
        Self::record(&mut state, "get_entity_edges", entity);
        Ok(state.entity_edges.clone())
    }

    async fn traverse(
        &self,
        start_entity: &str,
        _relation_types: &[String],
        _max_hops: usize,
        _direction: TraversalDirection,
        _tenant_id: &str,
    ) -> Result<Vec<GraphPath>> {
        let mut state = self.state.lock().unwrap();
        Self::record(&mut state, "traverse", start_entity);
        Ok(state.shortest_path.clone().into_iter().collect())
    }

    async fn shortest_path(
        &self,
        start_entity: &str,
        end_entity: &str,
        _tenant_id: &str,
        _max_hops: usize,
    ) -> Result<Option<GraphPath>> {
        let mut state = self.state.lock().unwrap();
        Self::record(
            &mut state,
            "shortest_path",
            &format!("{start_entity}->{end_entity}"),
        );

        if state.shortest_path_fails {
            return Err(Error::Graph("mock: traversal unavailable".into()));
        }
        Ok(state.shortest_path.clone())
    }

    async fn delete_episode(&self, episode_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::record(&mut state, "delete_episode", episode_id);
        state.deleted.push(episode_id.to_string());
        Ok(())
    }

    async fn expire_episode(&self, episode_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::record(&mut state, "expire_episode", episode_id);
        state.expired.push(episode_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn episode(name: &str, body: &str) -> Episode {
        Episode {
            name: name.into(),
            body: body.into(),
            source_description: "test".into(),
            reference_time: Utc::now(),
            group_id: "tenant-1".into(),
        }
    }

    #[tokio::test]
    async fn test_mock_generates_sequential_ids() {
        let graph = MockGraphService::new();
        let a = graph.add_episode(&episode("a", "alpha")).await.unwrap();
        let b = graph.add_episode(&episode("b", "beta")).await.unwrap();
        assert_eq!(a, "ep-1");
        assert_eq!(b, "ep-2");
        assert_eq!(graph.episodes().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_scripted_failures_expire() {
        let graph = MockGraphService::new().with_add_episode_failures(1);
        assert!(graph.add_episode(&episode("a", "alpha")).await.is_err());
        assert!(graph.add_episode(&episode("a", "alpha")).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_body_marker_fails_persistently() {
        let graph = MockGraphService::new().with_failing_body_marker("POISON");
        for _ in 0..3 {
            assert!(graph.add_episode(&episode("bad", "x POISON y")).await.is_err());
        }
        assert!(graph.add_episode(&episode("ok", "clean")).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_records_calls() {
        let graph = MockGraphService::new();
        let _ = graph.search("what is rust", &[], 5).await;
        assert_eq!(graph.call_count("search"), 1);
        assert_eq!(graph.calls()[0].input, "what is rust");
    }
}
