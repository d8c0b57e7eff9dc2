use std::cmp::Ordering as CmpOrdering;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;
use crossbeam::channel::{Receiver, RecvTimeoutError};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use crate::core::config::{Config, RankerConfig};
use crate::core::error::Result;
use crate::core::stats::EngineStats;
use crate::core::types::{DocumentId, ScoredDocument};
use crate::index::sharded::KeywordMatches;
use crate::ranking::embedding::EMBEDDING_EXTENSION;
use crate::ranking::registry::{ReadyShard, ShardRegistry, ShardState};
use crate::ranking::resolver::{CandidateRange, IndexRangeResolver};
use crate::ranking::worker::{RankReply, RankRequest, WorkerHandle, WorkerSpec, WorkerStatus};
use crate::simd::SimdOps;

/// Outcome of attaching a batch of shards
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachReport {
    pub attached: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// A worker that finished loading but is not serving yet
pub struct LoadedShard {
    id: String,
    device: Option<u32>,
    worker: Arc<WorkerHandle>,
    resolver: Arc<IndexRangeResolver>,
}

/// Result of `prepare_shards`, consumed by `install_shards`
#[derive(Default)]
pub struct PreparedShards {
    ready: Vec<LoadedShard>,
    failed: Vec<(String, String)>,
}

impl PreparedShards {
    pub fn ready_ids(&self) -> Vec<&str> {
        self.ready.iter().map(|s| s.id.as_str()).collect()
    }

    pub fn failed(&self) -> &[(String, String)] {
        &self.failed
    }
}

/// What one worker contributed to a query
pub enum WorkerOutcome {
    Ranked { shard: String, reply: RankReply },
    Failed { shard: String, reason: String },
    TimedOut { shard: String },
}

/// Coordinates one ranking worker per embedding shard.
///
/// A query is resolved to candidate rows per shard, scored by every
/// selected worker in parallel, and the partial lists are merged by score.
pub struct ShardedRanker {
    dir: PathBuf,
    config: RankerConfig,
    registry: ShardRegistry,
    stats: Arc<EngineStats>,
}

impl ShardedRanker {
    /// Attach every embedding shard found under `config.embedding_index_dir`.
    /// Shards that fail to load are reported in the log and stats only.
    pub fn open(config: &Config, stats: Arc<EngineStats>) -> Result<Self> {
        let ranker = Self::empty(config, stats);
        let ids = list_shards(&ranker.dir)?;
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        let report = ranker.attach_shards(&ids);
        info!(dir = %ranker.dir.display(), ready = report.attached.len(), failed = report.failed.len(),
              "ranker opened");
        Ok(ranker)
    }

    /// A ranker with no shards attached
    pub fn empty(config: &Config, stats: Arc<EngineStats>) -> Self {
        ShardedRanker {
            dir: config.embedding_index_dir.clone(),
            config: config.ranker.clone(),
            registry: ShardRegistry::new(config.ranker.devices.clone()),
            stats,
        }
    }

    fn shard_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", id, EMBEDDING_EXTENSION))
    }

    /// Load the named shards concurrently and swap them in. Shards already
    /// attached under the same id are replaced.
    pub fn attach_shards(&self, ids: &[&str]) -> AttachReport {
        let prepared = self.prepare_shards(ids);
        self.install_shards(prepared)
    }

    /// Spawn and load a worker per shard without touching the serving set.
    /// Workers that fail to load are already shut down on return.
    pub fn prepare_shards(&self, ids: &[&str]) -> PreparedShards {
        let mut pending: Vec<(String, Option<u32>, WorkerHandle, Receiver<WorkerStatus>)> = Vec::new();
        let mut prepared = PreparedShards::default();

        for &id in ids {
            let device = self.registry.assign_device();
            let spec = WorkerSpec {
                shard_id: id.to_string(),
                path: self.shard_path(id),
                device,
                config: self.config.clone(),
            };
            match WorkerHandle::spawn(spec) {
                Ok((worker, status)) => {
                    self.registry.begin_loading(id);
                    pending.push((id.to_string(), device, worker, status));
                }
                Err(e) => {
                    self.registry.release_device(device);
                    prepared.failed.push((id.to_string(), e.to_string()));
                }
            }
        }

        for (id, device, worker, status) in pending {
            let failure = match status.recv() {
                Ok(WorkerStatus::Ready(mapping)) => {
                    prepared.ready.push(LoadedShard {
                        id,
                        device,
                        worker: Arc::new(worker),
                        resolver: Arc::new(IndexRangeResolver::new(mapping)),
                    });
                    continue;
                }
                Ok(WorkerStatus::Failed(reason)) => reason,
                Err(_) => "worker exited before reporting".to_string(),
            };
            warn!(shard = %id, reason = %failure, "ranking shard failed to load");
            worker.shutdown();
            self.registry.release_device(device);
            prepared.failed.push((id, failure));
        }

        prepared
    }

    /// Swap prepared shards into the serving set. Replaced workers are shut
    /// down after the swap; failed ids evict whatever was attached before.
    pub fn install_shards(&self, prepared: PreparedShards) -> AttachReport {
        let mut report = AttachReport::default();
        let mut retired = Vec::new();

        for shard in prepared.ready {
            retired.extend(self.registry.install_ready(&shard.id, shard.device, shard.worker, shard.resolver));
            info!(shard = %shard.id, device = ?shard.device, "ranking shard ready");
            report.attached.push(shard.id);
        }
        for (id, reason) in prepared.failed {
            retired.extend(self.registry.install_failed(&id, reason.clone()));
            report.failed.push((id, reason));
        }

        for worker in retired {
            worker.shutdown();
        }
        self.stats.ranking_shards_failed.fetch_add(report.failed.len() as u64, Ordering::Relaxed);
        self.publish_ready();
        report
    }

    /// Stop and forget the named shards. Returns how many were attached.
    pub fn detach_shards(&self, ids: &[&str]) -> usize {
        let mut detached = 0;
        for &id in ids {
            if let Some(worker) = self.registry.remove(id) {
                worker.shutdown();
                detached += 1;
                info!(shard = %id, "detached ranking shard");
            }
        }
        self.publish_ready();
        detached
    }

    fn publish_ready(&self) {
        self.stats.ranking_shards_ready.store(self.registry.ready_count(), Ordering::Relaxed);
    }

    pub fn state(&self, id: &str) -> ShardState {
        self.registry.state(id)
    }

    pub fn ready_count(&self) -> usize {
        self.registry.ready_count()
    }

    pub fn shard_ids(&self) -> Vec<String> {
        self.registry.shard_ids()
    }

    pub fn registry(&self) -> &ShardRegistry {
        &self.registry
    }

    /// Top `n` documents by inner product with `embedding`.
    ///
    /// `keyword_filter` and `doc_ids` restrict the candidates (intersected
    /// when both are given); `shard_subset` restricts which shards are
    /// asked. Shards that fail or time out contribute nothing.
    pub fn search(
        &self,
        n: usize,
        embedding: &[f32],
        keyword_filter: Option<&KeywordMatches>,
        doc_ids: Option<&[DocumentId]>,
        shard_subset: Option<&[String]>,
    ) -> Vec<ScoredDocument> {
        let shards = self.registry.ready_shards(shard_subset);
        if shards.is_empty() || n == 0 {
            return Vec::new();
        }

        let mut query = embedding.to_vec();
        if self.config.normalize_query_embedding {
            SimdOps::normalize(&mut query);
        }
        let query = Arc::new(query);

        let start = Instant::now();
        let ranges: Vec<CandidateRange> = shards.par_iter()
            .map(|shard| {
                let rows = shard.resolver.resolve(keyword_filter, doc_ids);
                shard.resolver.candidate_range(rows, self.config.packed_range_divisor)
            })
            .collect();
        let resolve_ms = start.elapsed().as_millis() as u64;

        let mut in_flight = Vec::with_capacity(shards.len());
        for (shard, candidates) in shards.iter().zip(ranges) {
            let request = RankRequest { n, query: Arc::clone(&query), candidates };
            in_flight.push((shard, shard.worker.rank(request)));
        }

        let deadline = self.config.worker_timeout().map(|timeout| Instant::now() + timeout);
        let outcomes: Vec<WorkerOutcome> = in_flight.into_iter()
            .map(|(shard, sent)| match sent {
                Ok(receiver) => wait_for_reply(shard, &receiver, deadline),
                Err(e) => WorkerOutcome::Failed { shard: shard.id.clone(), reason: e.to_string() },
            })
            .collect();

        let results = self.merge(&shards, outcomes, n);
        debug!(shards = shards.len(), hits = results.len(), resolve_ms,
               elapsed_ms = start.elapsed().as_millis() as u64, "ranking finished");
        results
    }

    fn merge(&self, shards: &[ReadyShard], outcomes: Vec<WorkerOutcome>, n: usize) -> Vec<ScoredDocument> {
        let mut merged = Vec::new();
        for (shard, outcome) in shards.iter().zip(outcomes) {
            match outcome {
                WorkerOutcome::Ranked { reply, .. } => {
                    let mapping = shard.resolver.mapping();
                    for (&pos, &score) in reply.positions.iter().zip(reply.similarities.iter()) {
                        if let Some(doc_id) = mapping.doc_id(pos) {
                            merged.push(ScoredDocument { doc_id: doc_id.clone(), score });
                        }
                    }
                }
                WorkerOutcome::Failed { shard, reason } => {
                    warn!(shard = %shard, reason = %reason, "ranking worker failed, contributing nothing");
                    self.stats.worker_failures.fetch_add(1, Ordering::Relaxed);
                }
                WorkerOutcome::TimedOut { shard } => {
                    warn!(shard = %shard, "ranking worker timed out, contributing nothing");
                    self.stats.worker_timeouts.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        merged.sort_by(compare_hits);
        merged.truncate(n);
        merged
    }
}

/// Score descending, then document id ascending
fn compare_hits(a: &ScoredDocument, b: &ScoredDocument) -> CmpOrdering {
    b.score.total_cmp(&a.score).then_with(|| a.doc_id.cmp(&b.doc_id))
}

fn wait_for_reply(shard: &ReadyShard, receiver: &Receiver<RankReply>, deadline: Option<Instant>) -> WorkerOutcome {
    let shard_id = shard.id.clone();
    let received = match deadline {
        Some(deadline) => receiver.recv_deadline(deadline),
        None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
    };
    match received {
        Ok(reply) => WorkerOutcome::Ranked { shard: shard_id, reply },
        Err(RecvTimeoutError::Timeout) => WorkerOutcome::TimedOut { shard: shard_id },
        Err(RecvTimeoutError::Disconnected) => WorkerOutcome::Failed {
            shard: shard_id,
            reason: "worker dropped the request".to_string(),
        },
    }
}

/// Ids of the embedding shard files in `dir`, sorted
pub fn list_shards(dir: &Path) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(EMBEDDING_EXTENSION) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            ids.push(stem.to_string());
        }
    }
    ids.sort();
    Ok(ids)
}
