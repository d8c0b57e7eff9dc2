use crate::ranking::backend::{score_rows, top_k, VectorIndex};
use crate::simd::SimdOps;

/// Brute-force inner product search.
///
/// Used for shards pinned to an accelerator device and as the scorer for
/// narrow candidate subsets.
pub struct ExactIndex {
    matrix: Vec<f32>,
    dim: usize,
    device: Option<u32>,
}

impl ExactIndex {
    pub fn new(matrix: Vec<f32>, dim: usize, device: Option<u32>) -> Self {
        ExactIndex { matrix, dim, device }
    }

    pub fn device(&self) -> Option<u32> {
        self.device
    }
}

impl VectorIndex for ExactIndex {
    fn search(&self, query: &[f32], k: usize) -> Vec<(u32, f32)> {
        if self.dim == 0 {
            return Vec::new();
        }
        let scored = self.matrix.chunks_exact(self.dim)
            .enumerate()
            .map(|(row, values)| (row as u32, SimdOps::dot_product(query, values)))
            .collect();
        top_k(scored, k)
    }

    fn search_subset(&self, query: &[f32], k: usize, rows: &[u32]) -> Vec<(u32, f32)> {
        top_k(score_rows(&self.matrix, self.dim, query, rows), k)
    }

    fn is_exact(&self) -> bool {
        true
    }

    fn len(&self) -> usize {
        if self.dim == 0 { 0 } else { self.matrix.len() / self.dim }
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn name(&self) -> &'static str {
        "exact"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_best_rows_first() {
        let index = ExactIndex::new(vec![1.0, 0.0, 0.0, 1.0, 0.6, 0.8], 2, Some(0));
        let hits = index.search(&[0.0, 1.0], 2);
        assert_eq!(hits.iter().map(|h| h.0).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(index.search_subset(&[0.0, 1.0], 5, &[0, 2]).len(), 2);
        assert_eq!(index.device(), Some(0));
    }
}
