#![allow(dead_code)]

use std::fs;
use std::path::Path;
use litsearch::core::config::Config;
use litsearch::core::types::DocumentId;
use litsearch::encoder::HashingEncoder;
use litsearch::index::ShardWriter;
use litsearch::ranking::EmbeddingShardWriter;

pub const COLLECTION: &str = "arxiv";
pub const DIM: usize = 32;

pub struct Paper {
    pub ordinal: u32,
    pub title: &'static str,
    pub author: Option<(&'static str, &'static str)>,
    pub year: Option<u32>,
    pub doi: Option<&'static str>,
}

const fn paper(ordinal: u32, title: &'static str) -> Paper {
    Paper { ordinal, title, author: None, year: None, doi: None }
}

/// Sixteen papers with ordinals 1..=16
pub fn corpus() -> Vec<Paper> {
    vec![
        paper(1, "Deep Learning for Graph Networks"),
        Paper { year: Some(2019), ..paper(2, "Graph Kernel Methods") },
        Paper { doi: Some("10.1000/xyz123"), ..paper(3, "Deep Learning in Protein Design") },
        paper(4, "Protein Map of the Brain"),
        Paper { author: Some(("John", "Smith")), ..paper(5, "Vector Models of Tumor Growth") },
        paper(6, "Kernel Vector Machines"),
        paper(7, "Alice Walker Poetry"),
        Paper { author: Some(("Alice", "Walker")), ..paper(8, "Brain Map Atlas") },
        paper(9, "Mary Shelley Novels"),
        paper(10, "Graph Theory Primer"),
        paper(11, "Tumor Kernel Model"),
        Paper { year: Some(2021), ..paper(12, "Deep Learning for Tumor Maps") },
        paper(13, "Protein Network Kernel"),
        paper(14, "Brain Network Model"),
        paper(15, "Graph Vector Design"),
        paper(16, "Network Map Design"),
    ]
}

pub fn config(root: &Path) -> Config {
    let mut config = Config {
        inverted_index_dir: root.join("inverted_index"),
        embedding_index_dir: root.join("embedding_index"),
        duplicate_log_path: root.join("dedup").join("records.log"),
        evaluation_threads: 2,
        ..Config::default()
    };
    config.ranker.devices = vec![0];
    fs::create_dir_all(&config.inverted_index_dir).unwrap();
    fs::create_dir_all(&config.embedding_index_dir).unwrap();
    config
}

/// Term shards `<collection>_0` (ordinals below `split`) and `<collection>_1`
pub fn write_index(config: &Config, papers: &[Paper], split: u32) {
    let mut writers = [ShardWriter::new(COLLECTION), ShardWriter::new(COLLECTION)];
    for paper in papers {
        let writer = &mut writers[usize::from(paper.ordinal >= split)];
        writer.index_text(paper.ordinal, Some("title"), paper.title);
        if let Some((given, family)) = paper.author {
            writer.index_author(paper.ordinal, given, family);
        }
        if let Some(year) = paper.year {
            writer.index_year(paper.ordinal, year);
        }
        if let Some(doi) = paper.doi {
            writer.index_doi(paper.ordinal, doi);
        }
    }
    for (i, writer) in writers.into_iter().enumerate() {
        let path = config.inverted_index_dir.join(format!("{}_{}.shard", COLLECTION, i));
        writer.finish(path).unwrap();
    }
}

/// Embedding shards `emb_0` and `emb_1` split like `write_index`, with
/// title embeddings from the hashing encoder
pub fn write_embeddings(config: &Config, papers: &[Paper], split: u32) {
    let encoder = HashingEncoder::new(DIM);
    let mut writers = [EmbeddingShardWriter::new(DIM), EmbeddingShardWriter::new(DIM)];
    for paper in papers {
        let writer = &mut writers[usize::from(paper.ordinal >= split)];
        let id = DocumentId::new(COLLECTION, i64::from(paper.ordinal));
        writer.add(id, &encoder.encode_one(paper.title)).unwrap();
    }
    for (i, writer) in writers.into_iter().enumerate() {
        writer.finish(config.embedding_index_dir.join(format!("emb_{}.emb", i))).unwrap();
    }
}

pub fn ordinals(ids: &[DocumentId]) -> Vec<i64> {
    let mut ordinals: Vec<i64> = ids.iter().map(|id| id.id_value).collect();
    ordinals.sort();
    ordinals
}
