mod common;

use std::sync::{Arc, Barrier};
use std::thread;
use serde_json::{json, Value};
use litsearch::core::error::{ErrorKind, Result};
use litsearch::core::stats::EngineStats;
use litsearch::core::types::DocumentId;
use litsearch::dedup::{DuplicateIndex, PaperIdentity};
use litsearch::engine::Ingestor;
use litsearch::store::{InMemoryPaperStore, PaperStore};
use common::config;

fn open(dir: &tempfile::TempDir) -> Arc<DuplicateIndex> {
    let config = config(dir.path());
    Arc::new(DuplicateIndex::open(&config, Arc::new(EngineStats::new())).unwrap())
}

fn titled(title: &str, author: &str) -> PaperIdentity {
    PaperIdentity {
        title: title.to_string(),
        first_author: author.to_string(),
        ..PaperIdentity::default()
    }
}

#[test]
fn doi_lookup_returns_stored_id() {
    let dir = tempfile::tempdir().unwrap();
    let index = open(&dir);
    index.update(&[
        (DocumentId::new("arxiv", 3), PaperIdentity { doi: "10.1000/XYZ123".to_string(), ..titled("Protein Design", "") }),
        (DocumentId::new("arxiv", 4), titled("Brain Map Atlas", "")),
    ]).unwrap();

    assert_eq!(index.check("", "10.1000/xyz123", "", ""), vec![DocumentId::new("arxiv", 3)]);
    assert!(index.check("", "10.1000/other", "", "").is_empty());
}

#[test]
fn title_window_candidates_need_fuzzy_confirmation() {
    let dir = tempfile::tempdir().unwrap();
    let index = open(&dir);
    index.update(&[(DocumentId::new("arxiv", 1), titled("Graph Network Model Protein Map Brain", ""))]).unwrap();

    // shares the head window and stays above the threshold
    let hits = index.check("", "", "Graph Network Model Protein Map Brain Tumor", "");
    assert_eq!(hits, vec![DocumentId::new("arxiv", 1)]);

    // shares the head window but diverges too far
    assert!(index.check("", "", "Graph Network Model Protein Map Kernel Vector", "").is_empty());
}

#[test]
fn author_check_uses_abbreviated_names() {
    let dir = tempfile::tempdir().unwrap();
    let index = open(&dir);
    index.update(&[(DocumentId::new("arxiv", 5), titled("Vector Models of Tumor Growth", "John Smith"))]).unwrap();

    assert_eq!(index.check("", "", "Vector Models of Tumor Growth", "J. Smith"),
               vec![DocumentId::new("arxiv", 5)]);
    assert!(index.check("", "", "Vector Models of Tumor Growth", "Karl Smith").is_empty());
    assert_eq!(index.check("", "", "Vector Models of Tumor Growth", "").len(), 1);
}

#[test]
fn md5_is_authoritative_even_when_empty() {
    let dir = tempfile::tempdir().unwrap();
    let index = open(&dir);
    index.update(&[(DocumentId::new("arxiv", 2), titled("Graph Kernel Methods", ""))]).unwrap();

    assert!(index.check("d41d8cd98f00b204", "", "Graph Kernel Methods", "").is_empty());
    assert_eq!(index.check("", "", "Graph Kernel Methods", "").len(), 1);
}

#[test]
fn ingestor_rejects_known_and_repeated_papers() {
    let dir = tempfile::tempdir().unwrap();
    let index = open(&dir);
    let store = Arc::new(InMemoryPaperStore::new());
    let ingestor = Ingestor::new(index.clone(), store.clone());

    let first = ingestor.ingest(vec![
        json!({"Title": "Deep Learning for Graph Networks", "MD5": "aaa"}),
        json!({"Title": "Protein Map of the Brain", "DOI": "10.1/brain",
               "Author": [{"GivenName": "Alice", "FamilyName": "Walker"}]}),
    ], "arxiv").unwrap();
    assert_eq!(first.inserted, vec![DocumentId::new("arxiv", 1), DocumentId::new("arxiv", 2)]);
    assert!(first.duplicates.is_empty());
    assert_eq!(index.record_count(), 2);

    let second = ingestor.ingest(vec![
        json!({"Title": "Something Else", "MD5": "AAA"}),
        json!({"Title": "Kernel Vector Machines", "DOI": "10.1/kernel"}),
        json!({"Title": "Kernel Vector Machines, Revised", "DOI": "10.1/KERNEL"}),
        json!({"Title": "Protein Map of the Brain", "First_Author": "A. Walker"}),
    ], "arxiv").unwrap();

    assert_eq!(second.inserted, vec![DocumentId::new("arxiv", 3)]);
    assert_eq!(second.duplicates, vec![
        (0, vec![DocumentId::new("arxiv", 1)]),
        (3, vec![DocumentId::new("arxiv", 2)]),
    ]);
    assert_eq!(second.repeated, vec![(2, 1)]);
    assert_eq!(store.get_max_ordinal("arxiv"), 3);
    assert_eq!(index.check("", "10.1/kernel", "", ""), vec![DocumentId::new("arxiv", 3)]);
}

#[test]
fn reopened_index_still_rejects_ingested_papers() {
    let dir = tempfile::tempdir().unwrap();
    {
        let index = open(&dir);
        let ingestor = Ingestor::new(index, Arc::new(InMemoryPaperStore::new()));
        ingestor.ingest(vec![json!({"Title": "Brain Network Model", "DOI": "10.2/net"})], "pmcoa").unwrap();
    }

    let index = open(&dir);
    assert_eq!(index.record_count(), 1);
    assert_eq!(index.check("", "", "brain network model", ""), vec![DocumentId::new("pmcoa", 1)]);
}

#[test]
fn same_title_twice_in_one_batch_is_a_repeat() {
    let dir = tempfile::tempdir().unwrap();
    let index = open(&dir);
    let store = Arc::new(InMemoryPaperStore::new());
    let ingestor = Ingestor::new(index.clone(), store.clone());

    let report = ingestor.ingest(vec![
        json!({"Title": "Vector Models of Tumor Growth", "First_Author": "John Smith"}),
        json!({"Title": "Vector Models of Tumor Growth.", "First_Author": "J. Smith"}),
        json!({"Title": "Vector Models of Tumor Growth", "First_Author": "Karl Smith"}),
    ], "arxiv").unwrap();

    assert_eq!(report.inserted, vec![DocumentId::new("arxiv", 1), DocumentId::new("arxiv", 2)]);
    assert_eq!(report.repeated, vec![(1, 0)]);
    assert!(report.duplicates.is_empty());
    assert_eq!(store.len("arxiv"), 2);
    assert_eq!(index.record_count(), 2);
}

#[test]
fn concurrent_batches_store_each_paper_once() {
    const ROUNDS: usize = 40;
    let dir = tempfile::tempdir().unwrap();
    let index = open(&dir);
    let store = Arc::new(InMemoryPaperStore::new());
    let ingestor = Arc::new(Ingestor::new(index.clone(), store.clone()));

    let barrier = Arc::new(Barrier::new(2));
    let workers: Vec<_> = (0..2).map(|_| {
        let ingestor = ingestor.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            for round in 0..ROUNDS {
                barrier.wait();
                let md5 = format!("m{}", round);
                ingestor.ingest(vec![json!({"MD5": md5})], "arxiv").unwrap();
            }
        })
    }).collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(store.len("arxiv"), ROUNDS);
    assert_eq!(index.record_count(), ROUNDS);
    for round in 0..ROUNDS {
        assert_eq!(index.check(&format!("m{}", round), "", "", "").len(), 1);
    }
}

/// Hands out ids the duplicate index cannot record
struct UnorderedStore;

impl PaperStore for UnorderedStore {
    fn get_documents(&self, ids: &[DocumentId], _projection: Option<&[&str]>) -> Vec<Option<Value>> {
        vec![None; ids.len()]
    }

    fn get_max_ordinal(&self, _collection: &str) -> i64 {
        0
    }

    fn insert_documents(&self, documents: Vec<Value>, collection: &str) -> Result<Vec<DocumentId>> {
        Ok((0..documents.len()).map(|i| DocumentId::new(collection, -1 - i as i64)).collect())
    }
}

#[test]
fn failed_index_update_names_stored_papers() {
    let dir = tempfile::tempdir().unwrap();
    let index = open(&dir);
    let ingestor = Ingestor::new(index.clone(), Arc::new(UnorderedStore));

    let err = ingestor.ingest(vec![json!({"Title": "Graph Kernel Methods", "MD5": "abc"})], "arxiv")
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
    assert!(err.context.contains("arxiv/"), "{}", err.context);
    assert!(err.context.contains(":-1"), "{}", err.context);
    assert_eq!(index.record_count(), 0);
}
