//! Black-box text models used by search: a sentence encoder producing
//! query embeddings and an optional reranking scorer.

use crate::analysis::analyzer::Analyzer;
use crate::core::error::{Error, ErrorKind, Result};
use crate::simd::SimdOps;

/// Text to embedding. Must be deterministic for deterministic input.
pub trait Encoder: Send + Sync {
    /// One vector per input text, in input order
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn dimension(&self) -> usize;
}

/// Relevance scorer over (query, candidate text) pairs
pub trait Reranker: Send + Sync {
    /// One score per candidate, in candidate order
    fn score(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>>;
}

/// Score `candidates` and return their indices, best first.
/// Ties keep the original candidate order.
pub fn rerank(reranker: &dyn Reranker, query: &str, candidates: &[String]) -> Result<Vec<(usize, f32)>> {
    let scores = reranker.score(query, candidates)?;
    if scores.len() != candidates.len() {
        return Err(Error::new(ErrorKind::Internal,
                              format!("reranker returned {} scores for {} candidates", scores.len(), candidates.len())));
    }
    let mut ranked: Vec<(usize, f32)> = scores.into_iter().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(ranked)
}

/// Bag-of-terms encoder hashing analyzed keywords into a fixed number of
/// buckets. Stands in for a neural encoder in tests and benchmarks.
pub struct HashingEncoder {
    dim: usize,
    analyzer: Analyzer,
}

impl HashingEncoder {
    pub fn new(dim: usize) -> Self {
        HashingEncoder {
            dim: dim.max(1),
            analyzer: Analyzer::query_english(),
        }
    }

    pub fn encode_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];
        for token in self.analyzer.analyze(text) {
            if token.stopword {
                continue;
            }
            let bucket = crc32fast::hash(token.text.as_bytes()) as usize % self.dim;
            vector[bucket] += 1.0;
        }
        SimdOps::normalize(&mut vector);
        vector
    }
}

impl Encoder for HashingEncoder {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.encode_one(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LengthScorer;

    impl Reranker for LengthScorer {
        fn score(&self, _query: &str, candidates: &[String]) -> Result<Vec<f32>> {
            Ok(candidates.iter().map(|c| c.len() as f32).collect())
        }
    }

    struct BrokenScorer;

    impl Reranker for BrokenScorer {
        fn score(&self, _query: &str, _candidates: &[String]) -> Result<Vec<f32>> {
            Ok(vec![1.0])
        }
    }

    #[test]
    fn rerank_orders_by_score() {
        let candidates = vec!["ab".to_string(), "abcd".to_string(), "cd".to_string()];
        let ranked = rerank(&LengthScorer, "q", &candidates).unwrap();
        let order: Vec<usize> = ranked.iter().map(|r| r.0).collect();
        assert_eq!(order, vec![1, 0, 2]);
    }

    #[test]
    fn rerank_checks_length() {
        let candidates = vec!["a".to_string(), "b".to_string()];
        assert!(rerank(&BrokenScorer, "q", &candidates).is_err());
    }

    #[test]
    fn hashing_encoder_is_deterministic_and_unit() {
        let encoder = HashingEncoder::new(16);
        let texts = vec!["graph network".to_string(), "graph network".to_string()];
        let vectors = encoder.encode(&texts).unwrap();
        assert_eq!(vectors[0], vectors[1]);
        let norm: f32 = vectors[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}
