use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info};
use crate::core::config::RankerConfig;
use crate::core::error::{Error, ErrorKind, Result};
use crate::ranking::backend::{IndexBackendFactory, VectorIndex};
use crate::ranking::embedding::{EmbeddingShard, PositionMapping};
use crate::ranking::resolver::CandidateRange;
use crate::simd::SimdOps;

/// One scoring request for a shard
#[derive(Debug, Clone)]
pub struct RankRequest {
    pub n: usize,
    pub query: Arc<Vec<f32>>,
    pub candidates: CandidateRange,
}

/// Scores and shard-local rows, best first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankReply {
    pub similarities: Vec<f32>,
    pub positions: Vec<u32>,
}

impl RankReply {
    fn from_hits(hits: Vec<(u32, f32)>) -> Self {
        let (positions, similarities): (Vec<u32>, Vec<f32>) = hits.into_iter().unzip();
        RankReply { similarities, positions }
    }
}

enum WorkerMessage {
    Rank {
        request: RankRequest,
        reply: Sender<RankReply>,
    },
    Shutdown,
}

/// First message a worker sends after spawning
pub enum WorkerStatus {
    Ready(Arc<PositionMapping>),
    Failed(String),
}

/// What a worker needs to load its shard
#[derive(Debug, Clone)]
pub struct WorkerSpec {
    pub shard_id: String,
    pub path: PathBuf,
    pub device: Option<u32>,
    pub config: RankerConfig,
}

/// Coordinator-side handle to a shard worker thread.
///
/// The worker owns the matrix and its index for its whole lifetime; the
/// coordinator only exchanges messages with it.
pub struct WorkerHandle {
    shard_id: String,
    device: Option<u32>,
    sender: Sender<WorkerMessage>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerHandle {
    /// Start a worker. Its load result arrives on the returned receiver.
    pub fn spawn(spec: WorkerSpec) -> Result<(WorkerHandle, Receiver<WorkerStatus>)> {
        let (sender, inbox) = channel::unbounded();
        let (status_tx, status_rx) = channel::bounded(1);
        let shard_id = spec.shard_id.clone();
        let device = spec.device;

        let thread = thread::Builder::new()
            .name(format!("litsearch-rank-{}", shard_id))
            .spawn(move || run(spec, inbox, status_tx))?;

        Ok((WorkerHandle {
            shard_id,
            device,
            sender,
            thread: Mutex::new(Some(thread)),
        }, status_rx))
    }

    pub fn shard_id(&self) -> &str {
        &self.shard_id
    }

    pub fn device(&self) -> Option<u32> {
        self.device
    }

    /// Queue a request; the reply arrives on the returned receiver
    pub fn rank(&self, request: RankRequest) -> Result<Receiver<RankReply>> {
        let (reply, receiver) = channel::bounded(1);
        self.sender.send(WorkerMessage::Rank { request, reply })
            .map_err(|_| Error::new(ErrorKind::Unavailable, format!("worker {} has stopped", self.shard_id)))?;
        Ok(receiver)
    }

    /// Ask the worker to exit after the requests already queued, then
    /// wait for it
    pub fn shutdown(&self) {
        let _ = self.sender.send(WorkerMessage::Shutdown);
        if let Some(thread) = self.thread.lock().take() {
            if thread.join().is_err() {
                error!(shard = %self.shard_id, "ranking worker panicked");
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        let _ = self.sender.send(WorkerMessage::Shutdown);
    }
}

fn run(spec: WorkerSpec, inbox: Receiver<WorkerMessage>, status: Sender<WorkerStatus>) {
    let start = Instant::now();
    let worker = match ShardWorker::load(&spec) {
        Ok(worker) => worker,
        Err(e) => {
            error!(shard = %spec.shard_id, error = %e, "ranking shard failed to load");
            let _ = status.send(WorkerStatus::Failed(e.to_string()));
            return;
        }
    };
    info!(shard = %spec.shard_id, backend = worker.index.name(), rows = worker.index.len(),
          device = ?spec.device, elapsed_ms = start.elapsed().as_millis() as u64, "ranking shard ready");
    if status.send(WorkerStatus::Ready(Arc::clone(&worker.mapping))).is_err() {
        return;
    }

    for message in inbox.iter() {
        match message {
            WorkerMessage::Rank { request, reply } => {
                let _ = reply.send(worker.rank(request));
            }
            WorkerMessage::Shutdown => break,
        }
    }
    debug!(shard = %spec.shard_id, "ranking worker stopped");
}

/// State owned by a worker thread
struct ShardWorker {
    index: Box<dyn VectorIndex>,
    mapping: Arc<PositionMapping>,
    config: RankerConfig,
}

impl ShardWorker {
    fn load(spec: &WorkerSpec) -> Result<Self> {
        let EmbeddingShard { dim, mut matrix, mapping } = EmbeddingShard::load(&spec.path)?;
        SimdOps::normalize_rows(&mut matrix, dim);

        let index = IndexBackendFactory::for_device(spec.device).create(matrix, dim, &spec.config);
        let worker = ShardWorker {
            index,
            mapping: Arc::new(mapping),
            config: spec.config.clone(),
        };

        // Warm-up query
        let probe = vec![1.0 / (dim as f32).sqrt(); dim];
        worker.index.search(&probe, 10);
        Ok(worker)
    }

    fn rank(&self, request: RankRequest) -> RankReply {
        let RankRequest { n, query, candidates } = request;
        if query.len() != self.index.dimension() {
            debug!(expected = self.index.dimension(), got = query.len(), "query dimension mismatch");
            return RankReply::default();
        }

        let hits = match candidates.into_positions() {
            None if self.index.is_exact() => self.index.search(&query, n),
            None => {
                let mut hits = self.index.search(&query, self.config.approximate_candidates);
                hits.truncate(n);
                hits
            }
            Some(rows) if rows.is_empty() => Vec::new(),
            Some(rows) if self.index.is_exact() || rows.len() < self.config.exact_search_limit(self.index.len()) => {
                self.index.search_subset(&query, n, &rows)
            }
            Some(rows) => {
                // Wide filter: approximate top hits, then keep those in range
                let mut hits = self.index.search(&query, self.config.approximate_candidates);
                hits.retain(|(row, _)| rows.binary_search(row).is_ok());
                hits.truncate(n);
                hits
            }
        };
        RankReply::from_hits(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DocumentId;
    use crate::ranking::embedding::EmbeddingShardWriter;

    fn write_shard(dir: &std::path::Path, rows: usize) -> PathBuf {
        let path = dir.join("w0.emb");
        let mut writer = EmbeddingShardWriter::new(2);
        for i in 0..rows {
            let angle = i as f32 * 0.1;
            writer.add(DocumentId::new("arxiv", i as i64 + 1), &[angle.cos(), angle.sin()]).unwrap();
        }
        writer.finish(&path).unwrap();
        path
    }

    #[test]
    fn worker_serves_until_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let spec = WorkerSpec {
            shard_id: "w0".to_string(),
            path: write_shard(dir.path(), 20),
            device: None,
            config: RankerConfig { max_leaves: 4, leaves_to_search: 4, ..RankerConfig::default() },
        };
        let (handle, status) = WorkerHandle::spawn(spec).unwrap();
        let Ok(WorkerStatus::Ready(mapping)) = status.recv() else {
            panic!("worker failed to load");
        };
        assert_eq!(mapping.num_docs(), 20);

        let request = RankRequest {
            n: 2,
            query: Arc::new(vec![1.0, 0.0]),
            candidates: CandidateRange::Positions(vec![3, 7, 15]),
        };
        let reply = handle.rank(request).unwrap().recv().unwrap();
        assert_eq!(reply.positions, vec![3, 7]);

        handle.shutdown();
        let request = RankRequest { n: 1, query: Arc::new(vec![1.0, 0.0]), candidates: CandidateRange::All };
        assert!(handle.rank(request).is_err());
    }

    #[test]
    fn missing_file_reports_failure() {
        let spec = WorkerSpec {
            shard_id: "gone".to_string(),
            path: PathBuf::from("/nonexistent/gone.emb"),
            device: Some(0),
            config: RankerConfig::default(),
        };
        let (_handle, status) = WorkerHandle::spawn(spec).unwrap();
        assert!(matches!(status.recv(), Ok(WorkerStatus::Failed(_))));
    }
}
