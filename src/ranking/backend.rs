use std::cmp::Ordering;
use crate::core::config::RankerConfig;
use crate::ranking::exact::ExactIndex;
use crate::ranking::partitioned::PartitionedIndex;
use crate::simd::SimdOps;

/// Searchable structure over one shard's normalized embedding matrix.
///
/// Results are `(row, score)` pairs sorted by score descending, then row
/// ascending, so repeated searches return identical orderings.
pub trait VectorIndex: Send {
    /// General-purpose top-`k` over the whole shard
    fn search(&self, query: &[f32], k: usize) -> Vec<(u32, f32)>;

    /// Exact top-`k` restricted to `rows`; rows out of range are ignored
    fn search_subset(&self, query: &[f32], k: usize, rows: &[u32]) -> Vec<(u32, f32)>;

    /// Whether [`search`](Self::search) is exhaustive
    fn is_exact(&self) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn dimension(&self) -> usize;

    fn name(&self) -> &'static str;
}

/// Chooses the backend for a shard at load time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexBackendFactory {
    /// Brute force pinned to an accelerator device
    Exact { device: u32 },
    /// Partitioned tree with quantized scoring, for CPU serving
    Partitioned,
}

impl IndexBackendFactory {
    pub fn for_device(device: Option<u32>) -> Self {
        match device {
            Some(device) => IndexBackendFactory::Exact { device },
            None => IndexBackendFactory::Partitioned,
        }
    }

    pub fn create(&self, matrix: Vec<f32>, dim: usize, config: &RankerConfig) -> Box<dyn VectorIndex> {
        match self {
            IndexBackendFactory::Exact { device } => Box::new(ExactIndex::new(matrix, dim, Some(*device))),
            IndexBackendFactory::Partitioned => Box::new(PartitionedIndex::build(matrix, dim, config)),
        }
    }
}

/// Score descending, then row ascending
pub fn compare_scored(a: &(u32, f32), b: &(u32, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

/// Keep the best `k` of `scored`, sorted
pub fn top_k(mut scored: Vec<(u32, f32)>, k: usize) -> Vec<(u32, f32)> {
    if k == 0 {
        return Vec::new();
    }
    if scored.len() > k {
        scored.select_nth_unstable_by(k - 1, compare_scored);
        scored.truncate(k);
    }
    scored.sort_by(compare_scored);
    scored
}

/// Exact scores of the given rows of a row-major matrix
pub fn score_rows(matrix: &[f32], dim: usize, query: &[f32], rows: &[u32]) -> Vec<(u32, f32)> {
    let num_rows = if dim == 0 { 0 } else { matrix.len() / dim };
    rows.iter()
        .filter(|&&row| (row as usize) < num_rows)
        .map(|&row| {
            let start = row as usize * dim;
            (row, SimdOps::dot_product(query, &matrix[start..start + dim]))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_k_breaks_ties_by_row() {
        let scored = vec![(4, 0.5), (1, 0.9), (3, 0.5), (2, 0.1)];
        assert_eq!(top_k(scored, 3), vec![(1, 0.9), (3, 0.5), (4, 0.5)]);
    }

    #[test]
    fn score_rows_ignores_out_of_range() {
        let matrix = [1.0, 0.0, 0.0, 1.0];
        let scored = score_rows(&matrix, 2, &[0.5, 2.0], &[1, 7]);
        assert_eq!(scored, vec![(1, 2.0)]);
    }
}
