use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Serialize, Deserialize};
use crate::core::error::{Error, ErrorKind, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub inverted_index_dir: PathBuf,
    pub embedding_index_dir: PathBuf,
    pub duplicate_log_path: PathBuf,

    pub evaluation_threads: usize,

    pub query: QueryConfig,
    pub ranker: RankerConfig,
    pub dedup: DedupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub detect_names: bool,
    /// Minimum share of the fragment a recognized person span must cover
    pub name_coverage: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankerConfig {
    /// Accelerator device ids; empty means every shard is served by the approximate index
    pub devices: Vec<u32>,
    pub normalize_query_embedding: bool,
    pub approximate_candidates: usize,   // reorder depth of the approximate index
    pub exact_search_fraction: f64,      // subset smaller than this share of the shard is scored exactly
    pub exact_search_min: usize,         // ... or smaller than this absolute count
    pub packed_range_divisor: usize,     // ranges longer than num_docs / divisor are sent packed
    pub max_leaves: usize,
    pub leaves_to_search: usize,
    pub training_sample_size: usize,
    pub kmeans_iterations: usize,
    pub worker_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub fuzzy_threshold: f64,
    pub title_window: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            inverted_index_dir: PathBuf::from("./data/ranking/inverted_index"),
            embedding_index_dir: PathBuf::from("./data/ranking/embedding_index"),
            duplicate_log_path: PathBuf::from("./data/duplicate_checking/records.log"),
            evaluation_threads: num_cpus::get(),
            query: QueryConfig::default(),
            ranker: RankerConfig::default(),
            dedup: DedupConfig::default(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            detect_names: true,
            name_coverage: 0.9,
        }
    }
}

impl Default for RankerConfig {
    fn default() -> Self {
        RankerConfig {
            devices: Vec::new(),
            normalize_query_embedding: true,
            approximate_candidates: 100,
            exact_search_fraction: 0.01,
            exact_search_min: 10_000,
            packed_range_divisor: 32,
            max_leaves: 2000,
            leaves_to_search: 100,
            training_sample_size: 250_000,
            kmeans_iterations: 8,
            worker_timeout_ms: None,
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        DedupConfig {
            fuzzy_threshold: 90.0,
            title_window: 5,
        }
    }
}

impl RankerConfig {
    pub fn worker_timeout(&self) -> Option<Duration> {
        self.worker_timeout_ms.map(Duration::from_millis)
    }

    /// Candidate sets below this size are scored by exact dot products
    pub fn exact_search_limit(&self, shard_size: usize) -> usize {
        let fraction = (shard_size as f64 * self.exact_search_fraction) as usize;
        fraction.max(self.exact_search_min)
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.evaluation_threads == 0 {
            return Err(Error::new(ErrorKind::InvalidArgument, "evaluation_threads must be > 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.query.name_coverage) {
            return Err(Error::new(ErrorKind::InvalidArgument, "query.name_coverage must be within [0, 1]".to_string()));
        }
        if self.ranker.approximate_candidates == 0 || self.ranker.leaves_to_search == 0 || self.ranker.max_leaves == 0 {
            return Err(Error::new(ErrorKind::InvalidArgument, "approximate index parameters must be > 0".to_string()));
        }
        if self.ranker.packed_range_divisor == 0 {
            return Err(Error::new(ErrorKind::InvalidArgument, "ranker.packed_range_divisor must be > 0".to_string()));
        }
        if !(0.0..=100.0).contains(&self.dedup.fuzzy_threshold) {
            return Err(Error::new(ErrorKind::InvalidArgument, "dedup.fuzzy_threshold must be within [0, 100]".to_string()));
        }
        if self.dedup.title_window == 0 {
            return Err(Error::new(ErrorKind::InvalidArgument, "dedup.title_window must be > 0".to_string()));
        }
        Ok(())
    }
}
