//! Wire types for the graph-service RPC surface.
//!
//! One request/response pair per RPC, validated when crossing the boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use factweave_core::{Episode, Error, Fact, GraphPath, Result};

#[derive(Debug, Clone, Serialize)]
pub struct AddEpisodeRequest {
    pub name: String,
    pub body: String,
    pub source_description: String,
    pub reference_time: DateTime<Utc>,
    pub group_id: String,
}

impl From<&Episode> for AddEpisodeRequest {
    fn from(e: &Episode) -> Self {
        Self {
            name: e.name.clone(),
            body: e.body.clone(),
            source_description: e.source_description.clone(),
            reference_time: e.reference_time,
            group_id: e.group_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddEpisodeResponse {
    pub episode_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddEpisodesBulkRequest {
    pub episodes: Vec<AddEpisodeRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddEpisodesBulkResponse {
    pub episode_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    pub query: String,
    pub group_ids: Vec<String>,
    pub top_k: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub facts: Vec<WireFact>,
}

/// A fact as returned by the graph service. Scores outside [0,1] are
/// rejected at the boundary rather than silently clamped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFact {
    pub entity: String,
    pub relation: String,
    pub fact: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub source_description: Option<String>,
    #[serde(default)]
    pub valid_at: Option<DateTime<Utc>>,
}

impl WireFact {
    /// Validate and convert into the domain type.
    pub fn into_fact(self) -> Result<Fact> {
        if let Some(score) = self.score {
            if !(0.0..=1.0).contains(&score) || score.is_nan() {
                return Err(Error::Graph(format!(
                    "fact score {} out of range for entity '{}'",
                    score, self.entity
                )));
            }
        }
        Ok(Fact {
            entity: self.entity,
            relation: self.relation,
            text: self.fact,
            score: self.score,
            source_description: self.source_description,
            timestamp: self.valid_at,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityEdgesRequest {
    pub entity: String,
    pub group_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TraverseRequest {
    pub start_entity: String,
    pub relation_types: Vec<String>,
    pub max_hops: usize,
    pub direction: String,
    pub group_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WirePath {
    pub entities: Vec<String>,
    pub facts: Vec<WireFact>,
}

impl WirePath {
    pub fn into_path(self) -> Result<GraphPath> {
        let hops = self.facts.len();
        let facts = self
            .facts
            .into_iter()
            .map(WireFact::into_fact)
            .collect::<Result<Vec<_>>>()?;
        Ok(GraphPath {
            entities: self.entities,
            facts,
            hops,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TraverseResponse {
    pub paths: Vec<WirePath>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShortestPathRequest {
    pub start_entity: String,
    pub end_entity: String,
    pub group_id: String,
    pub max_hops: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShortestPathResponse {
    pub found: bool,
    #[serde(default)]
    pub path: Option<WirePath>,
}
