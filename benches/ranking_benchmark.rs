use criterion::{black_box, criterion_group, criterion_main, Criterion, BenchmarkId};
use litsearch::core::config::Config;
use litsearch::core::stats::EngineStats;
use litsearch::core::types::DocumentId;
use litsearch::ranking::{EmbeddingShardWriter, ShardedRanker};
use litsearch::simd::SimdOps;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use std::fs;
use std::sync::Arc;

const DIM: usize = 128;

fn random_vector(rng: &mut StdRng) -> Vec<f32> {
    let mut vector: Vec<f32> = (0..DIM).map(|_| rng.gen_range(-1.0..1.0)).collect();
    SimdOps::normalize(&mut vector);
    vector
}

// Two embedding shards of `docs_per_shard` random unit vectors each
fn build_ranker(docs_per_shard: usize, devices: Vec<u32>) -> (tempfile::TempDir, ShardedRanker) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config {
        embedding_index_dir: temp_dir.path().join("embedding_index"),
        ..Config::default()
    };
    config.ranker.devices = devices;
    fs::create_dir_all(&config.embedding_index_dir).unwrap();

    let mut rng = StdRng::seed_from_u64(7);
    for shard in 0..2 {
        let mut writer = EmbeddingShardWriter::new(DIM);
        for i in 0..docs_per_shard {
            let ordinal = (shard * docs_per_shard + i + 1) as i64;
            writer.add(DocumentId::new("arxiv", ordinal), &random_vector(&mut rng)).unwrap();
        }
        writer.finish(config.embedding_index_dir.join(format!("emb_{}.emb", shard))).unwrap();
    }

    let ranker = ShardedRanker::open(&config, Arc::new(EngineStats::new())).unwrap();
    (temp_dir, ranker)
}

fn bench_simd(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let a = random_vector(&mut rng);
    let b = random_vector(&mut rng);
    c.bench_function("dot_product_128", |bench| {
        bench.iter(|| black_box(SimdOps::dot_product(black_box(&a), black_box(&b))));
    });
}

fn bench_top_n(c: &mut Criterion) {
    let mut group = c.benchmark_group("ranking_top_n");
    group.sample_size(20);
    let query = random_vector(&mut StdRng::seed_from_u64(42));

    for (label, devices) in [("exact", vec![0, 1]), ("partitioned", Vec::new())] {
        let (_dir, ranker) = build_ranker(10_000, devices);
        group.bench_with_input(BenchmarkId::new(label, 100), &ranker, |b, ranker| {
            b.iter(|| black_box(ranker.search(100, black_box(&query), None, None, None)));
        });
    }
    group.finish();
}

fn bench_document_subset(c: &mut Criterion) {
    let mut group = c.benchmark_group("ranking_subset");
    let (_dir, ranker) = build_ranker(10_000, Vec::new());
    let query = random_vector(&mut StdRng::seed_from_u64(42));

    for size in [50usize, 2_000] {
        let subset: Vec<DocumentId> = (1..=size as i64)
            .map(|i| DocumentId::new("arxiv", i * 7))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &subset, |b, subset| {
            b.iter(|| black_box(ranker.search(20, black_box(&query), None, Some(subset.as_slice()), None)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_simd, bench_top_n, bench_document_subset);
criterion_main!(benches);
