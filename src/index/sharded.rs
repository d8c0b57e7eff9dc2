use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use crate::bitset::MatchVector;
use crate::bitset::ops::BitsetOps;
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::stats::EngineStats;
use crate::index::shard::{TermShard, SHARD_EXTENSION};
use crate::query::ast::QueryNode;
use crate::query::parser::QueryParser;

/// Corpus-wide keyword filter: one match vector per collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordMatches {
    pub per_collection: BTreeMap<String, MatchVector>,
    pub count: usize,
}

impl KeywordMatches {
    pub fn get(&self, collection: &str) -> Option<&MatchVector> {
        self.per_collection.get(collection)
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn positions(&self) -> BTreeMap<String, Vec<u32>> {
        self.per_collection.iter()
            .map(|(collection, mv)| (collection.clone(), mv.positions()))
            .collect()
    }
}

/// Result of evaluating a query on one shard
pub enum ShardOutcome {
    Matched {
        shard: String,
        collection: String,
        packed: Vec<u8>,
    },
    Failed {
        shard: String,
        error: Error,
    },
}

/// Immutable view of the active shards. Queries hold an `Arc` to it, so a
/// swap never disturbs in-flight evaluation.
#[derive(Default)]
struct ShardSet {
    shards: BTreeMap<String, Arc<TermShard>>,
    paused: BTreeSet<String>,
    total_documents: usize,
}

/// Inverted index partitioned by document ordinal across shard files.
pub struct ShardedInvertedIndex {
    dir: PathBuf,
    parser: QueryParser,
    active: RwLock<Arc<ShardSet>>,
    update_lock: Mutex<()>,
    pool: rayon::ThreadPool,
    stats: Arc<EngineStats>,
}

impl ShardedInvertedIndex {
    /// Load every shard under `config.inverted_index_dir`. A shard that
    /// fails to open aborts the whole load.
    pub fn open(config: &Config, stats: Arc<EngineStats>) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.evaluation_threads)
            .thread_name(|i| format!("litsearch-eval-{}", i))
            .build()
            .map_err(|e| Error::new(ErrorKind::Internal, format!("evaluation pool: {}", e)))?;

        let index = ShardedInvertedIndex {
            dir: config.inverted_index_dir.clone(),
            parser: QueryParser::new(&config.query)?,
            active: RwLock::new(Arc::new(ShardSet::default())),
            update_lock: Mutex::new(()),
            pool,
            stats,
        };

        let shards = Self::load_dir(&index.dir)?;
        let set = index.build_set(shards, BTreeSet::new());
        info!(dir = %index.dir.display(), shards = set.shards.len(),
              documents = set.total_documents, "inverted index opened");
        index.install(set);
        Ok(index)
    }

    fn load_dir(dir: &Path) -> Result<BTreeMap<String, Arc<TermShard>>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(SHARD_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut shards = BTreeMap::new();
        for path in paths {
            let shard = TermShard::open(&path)?;
            shards.insert(shard.id().to_string(), Arc::new(shard));
        }
        Ok(shards)
    }

    fn shard_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", id, SHARD_EXTENSION))
    }

    fn build_set(&self, shards: BTreeMap<String, Arc<TermShard>>, paused: BTreeSet<String>) -> ShardSet {
        let mut set = ShardSet { shards, paused, total_documents: 0 };
        set.total_documents = self.evaluate(&set, &QueryNode::match_all()).count;
        set
    }

    fn install(&self, set: ShardSet) {
        self.stats.inverted_shards.store(set.shards.len(), Ordering::Relaxed);
        self.stats.paused_shards.store(set.paused.len(), Ordering::Relaxed);
        *self.active.write() = Arc::new(set);
    }

    fn snapshot(&self) -> Arc<ShardSet> {
        Arc::clone(&self.active.read())
    }

    /// Parse `text` and evaluate it across all active shards
    pub fn get(&self, text: &str) -> KeywordMatches {
        let node = self.parser.parse(text);
        self.get_tree(&node)
    }

    /// Evaluate an already-built query tree across all active shards
    pub fn get_tree(&self, node: &QueryNode) -> KeywordMatches {
        let set = self.snapshot();
        self.evaluate(&set, node)
    }

    /// Like [`get`](Self::get) but as sorted ordinals per collection
    pub fn get_positions(&self, text: &str) -> BTreeMap<String, Vec<u32>> {
        self.get(text).positions()
    }

    pub fn parser(&self) -> &QueryParser {
        &self.parser
    }

    fn evaluate(&self, set: &ShardSet, node: &QueryNode) -> KeywordMatches {
        let start = Instant::now();

        let outcomes: Vec<ShardOutcome> = self.pool.install(|| {
            set.shards.par_iter()
                .map(|(id, shard)| match shard.evaluate(node) {
                    Ok(packed) => ShardOutcome::Matched {
                        shard: id.clone(),
                        collection: shard.collection().to_string(),
                        // Ordinals the shard does not hold never match
                        packed: BitsetOps::and(vec![packed, shard.packed_doc_ids().to_vec()]),
                    },
                    Err(error) => ShardOutcome::Failed { shard: id.clone(), error },
                })
                .collect()
        });

        let mut combined: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        for outcome in outcomes {
            match outcome {
                ShardOutcome::Matched { collection, packed, .. } => {
                    BitsetOps::or_into(combined.entry(collection).or_default(), &packed);
                }
                ShardOutcome::Failed { shard, error } => {
                    warn!(shard = %shard, error = %error, "shard evaluation failed, contributing nothing");
                    self.stats.shard_failures.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        let count = combined.values().map(|packed| BitsetOps::count_ones(packed)).sum();
        let per_collection = combined.into_iter()
            .map(|(collection, packed)| (collection, MatchVector::from_packed(&packed)))
            .collect();

        debug!(shards = set.shards.len(), count, elapsed_ms = start.elapsed().as_millis() as u64,
               "keyword evaluation finished");
        KeywordMatches { per_collection, count }
    }

    /// Remove shards from the active set. Unknown ids are ignored.
    /// Returns how many shards were paused.
    pub fn pause_shards(&self, ids: &[&str]) -> usize {
        let _guard = self.update_lock.lock();
        let current = self.snapshot();

        let mut shards = current.shards.clone();
        let mut paused = current.paused.clone();
        let mut removed = 0;
        for id in ids {
            if shards.remove(*id).is_some() {
                paused.insert(id.to_string());
                removed += 1;
            }
        }
        if removed == 0 {
            return 0;
        }

        let set = self.build_set(shards, paused);
        info!(paused = removed, active = set.shards.len(), "paused inverted index shards");
        self.install(set);
        removed
    }

    /// Load the named shards from the index directory and add them,
    /// replacing active shards with the same id.
    pub fn attach_shards(&self, ids: &[&str]) -> Result<usize> {
        let loaded = ids.iter()
            .map(|id| TermShard::open(self.shard_path(id)).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;

        let _guard = self.update_lock.lock();
        let current = self.snapshot();
        let mut shards = current.shards.clone();
        let mut paused = current.paused.clone();
        for shard in loaded {
            paused.remove(shard.id());
            shards.insert(shard.id().to_string(), shard);
        }

        let set = self.build_set(shards, paused);
        info!(attached = ids.len(), active = set.shards.len(), "attached inverted index shards");
        self.install(set);
        Ok(ids.len())
    }

    /// Re-read the index directory and swap the new shard set in. On
    /// error the current set stays active.
    pub fn reload(&self) -> Result<()> {
        let shards = Self::load_dir(&self.dir)?;

        let _guard = self.update_lock.lock();
        let set = self.build_set(shards, BTreeSet::new());
        info!(shards = set.shards.len(), documents = set.total_documents, "inverted index reloaded");
        self.install(set);
        Ok(())
    }

    /// Document count of the match-everything query, computed at load time
    pub fn total_documents(&self) -> usize {
        self.snapshot().total_documents
    }

    /// Match-everything filter over the active shards
    pub fn all_documents(&self) -> KeywordMatches {
        self.get_tree(&QueryNode::match_all())
    }

    pub fn shard_ids(&self) -> Vec<String> {
        self.snapshot().shards.keys().cloned().collect()
    }

    pub fn paused_shard_ids(&self) -> Vec<String> {
        self.snapshot().paused.iter().cloned().collect()
    }

    pub fn collections(&self) -> BTreeSet<String> {
        self.snapshot().shards.values()
            .map(|shard| shard.collection().to_string())
            .collect()
    }
}
