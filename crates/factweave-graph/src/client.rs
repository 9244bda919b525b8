//! HTTP implementation of the `GraphService` contract.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use factweave_core::{
    defaults, Episode, Error, Fact, GraphPath, GraphService, Result, TraversalDirection,
};

use crate::wire::*;

/// Default graph-service endpoint.
pub const DEFAULT_GRAPH_URL: &str = "http://localhost:8700";

/// reqwest-based graph-service client.
pub struct HttpGraphClient {
    client: Client,
    base_url: String,
}

impl HttpGraphClient {
    /// Create a client with a custom base URL and timeout.
    pub fn with_config(base_url: String, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GRAPH_SERVICE_URL` | `http://localhost:8700` |
    /// | `GRAPH_RPC_TIMEOUT_SECS` | `1800` |
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("GRAPH_SERVICE_URL").unwrap_or_else(|_| DEFAULT_GRAPH_URL.to_string());
        let timeout = std::env::var("GRAPH_RPC_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::GRAPH_RPC_TIMEOUT_SECS);

        Self::with_config(base_url, timeout)
    }

    async fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;
        Self::decode(path, response).await
    }

    async fn decode<Resp: DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> Result<Resp> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<Resp>().await?);
        }

        let detail = response.text().await.unwrap_or_default();
        if status.is_server_error()
            || status == StatusCode::REQUEST_TIMEOUT
            || status == StatusCode::TOO_MANY_REQUESTS
        {
            // Transient per the error taxonomy; callers retry.
            Err(Error::Graph(format!("{path}: {status}: {detail}")))
        } else {
            Err(Error::InvalidInput(format!("{path}: {status}: {detail}")))
        }
    }
}

#[async_trait]
impl GraphService for HttpGraphClient {
    #[instrument(skip(self, episode), fields(subsystem = "graph", component = "client"))]
    async fn add_episode(&self, episode: &Episode) -> Result<String> {
        let resp: AddEpisodeResponse = self
            .post("/episodes", &AddEpisodeRequest::from(episode))
            .await?;
        debug!(episode_id = %resp.episode_id, "Episode accepted");
        Ok(resp.episode_id)
    }

    #[instrument(skip(self, episodes), fields(subsystem = "graph", component = "client"))]
    async fn add_episodes_bulk(&self, episodes: &[Episode]) -> Result<Vec<String>> {
        let req = AddEpisodesBulkRequest {
            episodes: episodes.iter().map(AddEpisodeRequest::from).collect(),
        };
        let resp: AddEpisodesBulkResponse = self.post("/episodes/bulk", &req).await?;

        if resp.episode_ids.len() != episodes.len() {
            return Err(Error::Graph(format!(
                "bulk response returned {} ids for {} episodes",
                resp.episode_ids.len(),
                episodes.len()
            )));
        }
        Ok(resp.episode_ids)
    }

    #[instrument(skip(self), fields(subsystem = "graph", component = "client"))]
    async fn search(&self, query: &str, group_ids: &[String], top_k: usize) -> Result<Vec<Fact>> {
        let req = SearchRequest {
            query: query.to_string(),
            group_ids: group_ids.to_vec(),
            top_k,
        };
        let resp: SearchResponse = self.post("/search", &req).await?;
        resp.facts.into_iter().map(WireFact::into_fact).collect()
    }

    async fn get_entity_edges(&self, entity: &str, group_ids: &[String]) -> Result<Vec<Fact>> {
        let req = EntityEdgesRequest {
            entity: entity.to_string(),
            group_ids: group_ids.to_vec(),
        };
        let resp: SearchResponse = self.post("/entity-edges", &req).await?;
        resp.facts.into_iter().map(WireFact::into_fact).collect()
    }

    async fn traverse(
        &self,
        start_entity: &str,
        relation_types: &[String],
        max_hops: usize,
        direction: TraversalDirection,
        tenant_id: &str,
    ) -> Result<Vec<GraphPath>> {
        let direction = match direction {
            TraversalDirection::Outbound => "outbound",
            TraversalDirection::Inbound => "inbound",
            TraversalDirection::Both => "both",
        };
        let req = TraverseRequest {
            start_entity: start_entity.to_string(),
            relation_types: relation_types.to_vec(),
            max_hops,
            direction: direction.to_string(),
            group_id: tenant_id.to_string(),
        };
        let resp: TraverseResponse = self.post("/traverse", &req).await?;
        resp.paths.into_iter().map(WirePath::into_path).collect()
    }

    async fn shortest_path(
        &self,
        start_entity: &str,
        end_entity: &str,
        tenant_id: &str,
        max_hops: usize,
    ) -> Result<Option<GraphPath>> {
        let req = ShortestPathRequest {
            start_entity: start_entity.to_string(),
            end_entity: end_entity.to_string(),
            group_id: tenant_id.to_string(),
            max_hops,
        };
        let resp: ShortestPathResponse = self.post("/shortest-path", &req).await?;

        if !resp.found {
            return Ok(None);
        }
        resp.path
            .ok_or_else(|| Error::Graph("shortest-path: found=true but no path".into()))
            .and_then(WirePath::into_path)
            .map(Some)
    }

    async fn delete_episode(&self, episode_id: &str) -> Result<()> {
        let url = format!("{}/episodes/{}", self.base_url, episode_id);
        let response = self.client.delete(&url).send().await?;

        // Idempotent: deleting an already-gone episode is success.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::decode::<serde_json::Value>("/episodes (delete)", response)
            .await
            .map(|_| ())
    }

    async fn expire_episode(&self, episode_id: &str) -> Result<()> {
        let url = format!("{}/episodes/{}/expire", self.base_url, episode_id);
        let response = self.client.post(&url).send().await?;
        Self::decode::<serde_json::Value>("/episodes (expire)", response)
            .await
            .map(|_| ())
    }
}
