use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;
use parking_lot::RwLock;
use serde::{Serialize, Deserialize};
use tracing::{debug, info, warn};
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::stats::{EngineStats, HealthStatus, StatsSnapshot};
use crate::core::types::{DocumentId, ScoredDocument};
use crate::encoder::Encoder;
use crate::index::sharded::ShardedInvertedIndex;
use crate::ranking::ranker::{AttachReport, ShardedRanker};

fn default_n_results() -> usize {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Boolean keyword query; blank means no keyword filter
    #[serde(default)]
    pub keywords: String,
    /// Text the results are ranked against
    #[serde(default)]
    pub ranking_source: String,
    /// Restrict results to these documents
    #[serde(default)]
    pub paper_list: Option<Vec<DocumentId>>,
    #[serde(default = "default_n_results")]
    pub n_results: usize,
    /// Restrict ranking to these embedding shards
    #[serde(default)]
    pub ranking_shards: Option<Vec<String>>,
}

impl SearchRequest {
    pub fn new(keywords: impl Into<String>, ranking_source: impl Into<String>) -> Self {
        SearchRequest {
            keywords: keywords.into(),
            ranking_source: ranking_source.into(),
            paper_list: None,
            n_results: default_n_results(),
            ranking_shards: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchState {
    Ok,
    /// No ranking shard is serving; the empty result says nothing about matches
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub matches: Vec<ScoredDocument>,
    /// Documents satisfying the keyword query, or every document when
    /// there is none
    pub match_count: usize,
    pub state: SearchState,
}

/// Keyword filtering plus embedding ranking behind one admission lock.
///
/// Queries share the lock; attach, detach, pause and reload take it
/// exclusively, after any slow loading has finished.
pub struct SearchEngine {
    admission: RwLock<()>,
    index: ShardedInvertedIndex,
    ranker: ShardedRanker,
    encoder: Arc<dyn Encoder>,
    stats: Arc<EngineStats>,
}

impl SearchEngine {
    pub fn open(config: &Config, encoder: Arc<dyn Encoder>) -> Result<Self> {
        config.validate()?;
        let stats = Arc::new(EngineStats::new());
        let index = ShardedInvertedIndex::open(config, Arc::clone(&stats))?;
        let ranker = ShardedRanker::open(config, Arc::clone(&stats))?;
        info!(documents = index.total_documents(), ranking_shards = ranker.ready_count(), "search engine ready");
        Ok(Self::from_parts(index, ranker, encoder, stats))
    }

    pub fn from_parts(index: ShardedInvertedIndex, ranker: ShardedRanker,
                      encoder: Arc<dyn Encoder>, stats: Arc<EngineStats>) -> Self {
        SearchEngine {
            admission: RwLock::new(()),
            index,
            ranker,
            encoder,
            stats,
        }
    }

    pub fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let _admitted = self.admission.read();
        let start = Instant::now();
        self.stats.queries_served.fetch_add(1, Ordering::Relaxed);

        if self.ranker.ready_count() == 0 {
            warn!("search rejected, no ranking shards are ready");
            self.stats.degraded_queries.fetch_add(1, Ordering::Relaxed);
            return Ok(SearchResponse { matches: Vec::new(), match_count: 0, state: SearchState::Unavailable });
        }

        let keywords = request.keywords.trim();
        let (filter, match_count) = if keywords.is_empty() {
            (None, self.index.total_documents())
        } else {
            let matches = self.index.get(keywords);
            let count = matches.count;
            (Some(matches), count)
        };
        let keyword_ms = start.elapsed().as_millis() as u64;

        let embedding = self.encoder.encode(std::slice::from_ref(&request.ranking_source))?
            .into_iter()
            .next()
            .ok_or_else(|| Error::new(ErrorKind::Internal, "encoder returned no embedding".to_string()))?;

        let matches = self.ranker.search(
            request.n_results,
            &embedding,
            filter.as_ref(),
            request.paper_list.as_deref(),
            request.ranking_shards.as_deref(),
        );

        debug!(keywords = %keywords, match_count, hits = matches.len(), keyword_ms,
               elapsed_ms = start.elapsed().as_millis() as u64, "search finished");
        Ok(SearchResponse { matches, match_count, state: SearchState::Ok })
    }

    /// Load embedding shards, then swap them in exclusively
    pub fn attach_ranking_shards(&self, ids: &[&str]) -> AttachReport {
        let prepared = self.ranker.prepare_shards(ids);
        let _exclusive = self.admission.write();
        self.ranker.install_shards(prepared)
    }

    pub fn detach_ranking_shards(&self, ids: &[&str]) -> usize {
        let _exclusive = self.admission.write();
        self.ranker.detach_shards(ids)
    }

    pub fn attach_index_shards(&self, ids: &[&str]) -> Result<usize> {
        let _exclusive = self.admission.write();
        self.index.attach_shards(ids)
    }

    pub fn pause_index_shards(&self, ids: &[&str]) -> usize {
        let _exclusive = self.admission.write();
        self.index.pause_shards(ids)
    }

    pub fn reload_index(&self) -> Result<()> {
        let _exclusive = self.admission.write();
        self.index.reload()
    }

    pub fn index(&self) -> &ShardedInvertedIndex {
        &self.index
    }

    pub fn ranker(&self) -> &ShardedRanker {
        &self.ranker
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn health(&self) -> HealthStatus {
        self.stats.health()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults() {
        let request: SearchRequest = serde_json::from_str(r#"{"ranking_source": "graph"}"#).unwrap();
        assert_eq!(request.n_results, 1000);
        assert!(request.keywords.is_empty());
        assert!(request.paper_list.is_none());
    }

    #[test]
    fn state_serializes_snake_case() {
        assert_eq!(serde_json::to_value(SearchState::Unavailable).unwrap(), "unavailable");
    }
}
