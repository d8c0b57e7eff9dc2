use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;
use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info};
use crate::analysis::analyzer::Analyzer;
use crate::core::config::{Config, DedupConfig};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::stats::EngineStats;
use crate::core::types::DocumentId;
use crate::dedup::fuzzy;
use crate::dedup::log::DuplicateLog;
use crate::dedup::record::{DuplicateRecord, IdentityKeys, PaperIdentity};

/// Ids stored under one key; most keys are unique
#[derive(Debug, Clone, PartialEq, Eq)]
enum Postings {
    One(i64),
    Many(Vec<i64>),
}

impl Postings {
    fn push(&mut self, id: i64) {
        match self {
            Postings::One(first) => *self = Postings::Many(vec![*first, id]),
            Postings::Many(ids) => ids.push(id),
        }
    }

    fn as_slice(&self) -> &[i64] {
        match self {
            Postings::One(id) => std::slice::from_ref(id),
            Postings::Many(ids) => ids,
        }
    }
}

#[derive(Debug, Default)]
struct CollectionKeys {
    keys: HashMap<String, Postings>,
    titles: HashMap<i64, String>,
    authors: HashMap<i64, String>,
}

#[derive(Debug, Default)]
struct DuplicateState {
    collections: BTreeMap<String, CollectionKeys>,
    key_count: usize,
    record_count: usize,
}

impl DuplicateState {
    fn insert(&mut self, record: &DuplicateRecord) {
        let collection = self.collections.entry(record.collection.clone()).or_default();
        for key in record.keys.index_keys() {
            match collection.keys.get_mut(key) {
                Some(postings) => postings.push(record.id_value),
                None => {
                    collection.keys.insert(key.to_string(), Postings::One(record.id_value));
                    self.key_count += 1;
                }
            }
        }
        collection.titles.insert(record.id_value, record.keys.title.clone());
        collection.authors.insert(record.id_value, record.keys.abbreviated_author());
        self.record_count += 1;
    }

    /// Ids under `key` in every collection, collection order then insertion order
    fn lookup(&self, key: &str) -> Vec<(&str, i64)> {
        if key.is_empty() {
            return Vec::new();
        }
        self.collections.iter()
            .filter_map(|(name, collection)| collection.keys.get(key).map(|p| (name.as_str(), p)))
            .flat_map(|(name, postings)| postings.as_slice().iter().map(move |&id| (name, id)))
            .collect()
    }

    /// Matching rules shared by `check` and the batch gate
    fn find(&self, keys: &IdentityKeys, threshold: f64) -> Vec<(&str, i64)> {
        if !keys.md5.is_empty() {
            return self.lookup(&keys.md5);
        }
        if !keys.doi.is_empty() {
            let hits = self.lookup(&keys.doi);
            if !hits.is_empty() {
                return hits;
            }
        }
        if keys.title.is_empty() {
            return Vec::new();
        }

        let mut candidates = self.lookup(&keys.title);
        if candidates.is_empty() {
            candidates = self.lookup(&keys.title_head);
            for hit in self.lookup(&keys.title_tail) {
                if !candidates.contains(&hit) {
                    candidates.push(hit);
                }
            }
        }

        let author = keys.abbreviated_author();
        candidates.into_iter()
            .filter(|&(collection, id)| {
                let Some(stored) = self.collections.get(collection) else {
                    return false;
                };
                let title_score = fuzzy::ratio(stored.titles.get(&id).map_or("", String::as_str), &keys.title);
                if title_score < threshold {
                    return false;
                }
                author.is_empty()
                    || fuzzy::ratio(stored.authors.get(&id).map_or("", String::as_str), &author) >= threshold
            })
            .collect()
    }
}

const BATCH_COLLECTION: &str = "";

/// Identity keys of the papers accepted so far in one ingestion batch
pub struct BatchGate {
    state: DuplicateState,
    threshold: f64,
}

impl BatchGate {
    /// Batch position of the earliest accepted paper `keys` repeats
    pub fn repeat_of(&self, keys: &IdentityKeys) -> Option<usize> {
        self.state.find(keys, self.threshold)
            .into_iter()
            .filter_map(|(_, position)| usize::try_from(position).ok())
            .min()
    }

    pub fn admit(&mut self, position: usize, keys: IdentityKeys) {
        self.state.insert(&DuplicateRecord {
            collection: BATCH_COLLECTION.to_string(),
            id_value: position as i64,
            keys,
        });
    }
}

/// In-memory identity-key index over every ingested paper, backed by the
/// append-only duplicate log.
///
/// `check` calls run concurrently with each other; `update` excludes them
/// for the duration of the in-memory insert. Writers that check before
/// they update hold [`lock_writes`](DuplicateIndex::lock_writes) across both.
pub struct DuplicateIndex {
    state: RwLock<DuplicateState>,
    log: Mutex<DuplicateLog>,
    writes: Mutex<()>,
    analyzer: Analyzer,
    config: DedupConfig,
    stats: Arc<EngineStats>,
}

impl DuplicateIndex {
    /// Open the log at `config.duplicate_log_path` and rebuild the index
    /// by replaying it
    pub fn open(config: &Config, stats: Arc<EngineStats>) -> Result<Self> {
        let start = Instant::now();
        let (log, entries, summary) = DuplicateLog::open(&config.duplicate_log_path)?;

        let mut state = DuplicateState::default();
        for entry in &entries {
            state.insert(&entry.record);
        }
        stats.duplicate_keys.store(state.key_count, Ordering::Relaxed);
        stats.duplicate_log_bytes.store(log.len(), Ordering::Relaxed);
        info!(records = state.record_count, keys = state.key_count, skipped = summary.skipped,
              elapsed_ms = start.elapsed().as_millis() as u64, "duplicate index ready");

        Ok(DuplicateIndex {
            state: RwLock::new(state),
            log: Mutex::new(log),
            writes: Mutex::new(()),
            analyzer: Analyzer::duplicate_english(),
            config: config.dedup.clone(),
            stats,
        })
    }

    /// Normalize raw identity fields the way the index stores them
    pub fn identity_keys(&self, identity: &PaperIdentity) -> IdentityKeys {
        IdentityKeys::normalize(identity, &self.analyzer, self.config.title_window)
    }

    /// Ids of already-ingested papers with the same identity.
    ///
    /// A non-empty md5 decides alone. A DOI hit is returned, a DOI miss
    /// falls through to the title. Title candidates (exact title, else the
    /// head and tail windows) must pass the fuzzy title check and, when an
    /// author is given, the fuzzy author check.
    pub fn check(&self, md5: &str, doi: &str, title: &str, first_author: &str) -> Vec<DocumentId> {
        self.check_identity(&PaperIdentity {
            md5: md5.to_string(),
            doi: doi.to_string(),
            title: title.to_string(),
            first_author: first_author.to_string(),
        })
    }

    pub fn check_identity(&self, identity: &PaperIdentity) -> Vec<DocumentId> {
        self.check_keys(&self.identity_keys(identity))
    }

    /// `check` over keys already normalized by [`identity_keys`](Self::identity_keys)
    pub fn check_keys(&self, keys: &IdentityKeys) -> Vec<DocumentId> {
        let state = self.state.read();
        let hits: Vec<DocumentId> = state.find(keys, self.config.fuzzy_threshold)
            .into_iter()
            .map(|(collection, id)| DocumentId::new(collection, id))
            .collect();
        debug!(title = %keys.title, hits = hits.len(), "duplicate check");
        hits
    }

    /// Empty gate applying the same matching rules to the papers of one
    /// ingestion batch
    pub fn batch_gate(&self) -> BatchGate {
        BatchGate {
            state: DuplicateState::default(),
            threshold: self.config.fuzzy_threshold,
        }
    }

    /// Hold while checking and then recording papers so that no other
    /// writer can slip the same paper in between
    pub fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.writes.lock()
    }

    /// Record newly ingested papers: append them to the log, then add their
    /// keys to the in-memory index
    pub fn update(&self, papers: &[(DocumentId, PaperIdentity)]) -> Result<()> {
        let mut records = Vec::with_capacity(papers.len());
        for (doc_id, identity) in papers {
            if doc_id.ordinal().is_none() {
                return Err(Error::new(ErrorKind::InvalidInput,
                                      format!("{} has no integer ordinal", doc_id)));
            }
            records.push(DuplicateRecord {
                collection: doc_id.collection.clone(),
                id_value: doc_id.id_value,
                keys: self.identity_keys(identity),
            });
        }

        let mut log = self.log.lock();
        log.append(&records)?;

        let mut state = self.state.write();
        for record in &records {
            state.insert(record);
        }
        self.stats.duplicate_keys.store(state.key_count, Ordering::Relaxed);
        self.stats.duplicate_log_bytes.store(log.len(), Ordering::Relaxed);
        debug!(records = records.len(), keys = state.key_count, "duplicate index updated");
        Ok(())
    }

    pub fn record_count(&self) -> usize {
        self.state.read().record_count
    }

    pub fn key_count(&self) -> usize {
        self.state.read().key_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(dir: &tempfile::TempDir) -> DuplicateIndex {
        let config = Config {
            duplicate_log_path: dir.path().join("records.log"),
            ..Config::default()
        };
        DuplicateIndex::open(&config, Arc::new(EngineStats::new())).unwrap()
    }

    fn identity(md5: &str, doi: &str, title: &str, author: &str) -> PaperIdentity {
        PaperIdentity {
            md5: md5.to_string(),
            doi: doi.to_string(),
            title: title.to_string(),
            first_author: author.to_string(),
        }
    }

    #[test]
    fn postings_promote_on_collision() {
        let mut postings = Postings::One(4);
        assert_eq!(postings.as_slice(), &[4]);
        postings.push(9);
        assert_eq!(postings, Postings::Many(vec![4, 9]));
    }

    #[test]
    fn md5_decides_alone() {
        let dir = tempfile::tempdir().unwrap();
        let index = open(&dir);
        index.update(&[(DocumentId::new("arxiv", 1), identity("ABC", "10.1/x", "Graph Network Model", ""))]).unwrap();

        assert_eq!(index.check("abc", "", "", ""), vec![DocumentId::new("arxiv", 1)]);
        assert!(index.check("other", "10.1/x", "Graph Network Model", "").is_empty());
        assert!(index.check("", "", "", "").is_empty());
    }

    #[test]
    fn doi_miss_falls_through_to_title() {
        let dir = tempfile::tempdir().unwrap();
        let index = open(&dir);
        index.update(&[(DocumentId::new("arxiv", 1), identity("", "", "Graph Network Model", "John Smith"))]).unwrap();

        let hits = index.check("", "10.9/missing", "graph network model", "J. Smith");
        assert_eq!(hits, vec![DocumentId::new("arxiv", 1)]);
        assert!(index.check("", "", "graph network model", "Karl Smith").is_empty());
    }

    #[test]
    fn same_key_in_two_collections() {
        let dir = tempfile::tempdir().unwrap();
        let index = open(&dir);
        index.update(&[
            (DocumentId::new("pmcoa", 3), identity("", "10.1/abc", "", "")),
            (DocumentId::new("arxiv", 8), identity("", "10.1/ABC", "", "")),
        ]).unwrap();

        let hits = index.check("", "10.1/abc", "", "");
        assert_eq!(hits, vec![DocumentId::new("arxiv", 8), DocumentId::new("pmcoa", 3)]);
        assert_eq!(index.key_count(), 1);
    }

    #[test]
    fn reopen_replays_the_log() {
        let dir = tempfile::tempdir().unwrap();
        {
            let index = open(&dir);
            index.update(&[(DocumentId::new("arxiv", 5), identity("", "10.1/abc", "", ""))]).unwrap();
        }
        let index = open(&dir);
        assert_eq!(index.record_count(), 1);
        assert_eq!(index.check("", "10.1/abc", "", ""), vec![DocumentId::new("arxiv", 5)]);
    }
}
