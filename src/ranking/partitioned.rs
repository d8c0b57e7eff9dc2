use rayon::prelude::*;
use tracing::debug;
use crate::core::config::RankerConfig;
use crate::ranking::backend::{score_rows, top_k, VectorIndex};
use crate::simd::SimdOps;

/// Approximate inner-product index for CPU serving.
///
/// Rows are clustered into leaves by spherical k-means. A query scores the
/// leaf centroids, scans the rows of the best `leaves_to_search` leaves
/// with int8-quantized dot products, and rescores the best `reorder`
/// candidates exactly.
pub struct PartitionedIndex {
    matrix: Vec<f32>,
    dim: usize,
    centroids: Vec<f32>,
    leaves: Vec<Vec<u32>>,
    codes: Vec<i8>,
    scales: Vec<f32>,
    leaves_to_search: usize,
    reorder: usize,
}

impl PartitionedIndex {
    pub fn build(matrix: Vec<f32>, dim: usize, config: &RankerConfig) -> Self {
        let num_rows = if dim == 0 { 0 } else { matrix.len() / dim };

        let mut codes = Vec::with_capacity(matrix.len());
        let mut scales = Vec::with_capacity(num_rows);
        for row in matrix.chunks_exact(dim.max(1)).take(num_rows) {
            let (row_codes, scale) = SimdOps::quantize(row);
            codes.extend_from_slice(&row_codes);
            scales.push(scale);
        }

        let sample = sample_rows(num_rows, config.training_sample_size);
        let num_leaves = config.max_leaves.min(sample.len()).max(1);
        let centroids = if num_rows == 0 {
            Vec::new()
        } else {
            train_centroids(&matrix, dim, &sample, num_leaves, config.kmeans_iterations)
        };

        let mut leaves = vec![Vec::new(); if num_rows == 0 { 0 } else { num_leaves }];
        let assignments: Vec<usize> = (0..num_rows)
            .into_par_iter()
            .map(|row| nearest_centroid(&centroids, dim, &matrix[row * dim..(row + 1) * dim]))
            .collect();
        for (row, leaf) in assignments.into_iter().enumerate() {
            leaves[leaf].push(row as u32);
        }

        debug!(rows = num_rows, leaves = leaves.len(), "built partitioned index");
        PartitionedIndex {
            matrix,
            dim,
            centroids,
            leaves,
            codes,
            scales,
            leaves_to_search: config.leaves_to_search,
            reorder: config.approximate_candidates,
        }
    }

    pub fn num_leaves(&self) -> usize {
        self.leaves.len()
    }
}

impl VectorIndex for PartitionedIndex {
    fn search(&self, query: &[f32], k: usize) -> Vec<(u32, f32)> {
        if self.leaves.is_empty() || k == 0 {
            return Vec::new();
        }

        let leaf_scores = self.centroids.chunks_exact(self.dim)
            .enumerate()
            .map(|(leaf, centroid)| (leaf as u32, SimdOps::dot_product(query, centroid)))
            .collect();
        let probed = top_k(leaf_scores, self.leaves_to_search);

        let (query_codes, query_scale) = SimdOps::quantize(query);
        let mut approximate = Vec::new();
        for (leaf, _) in probed {
            for &row in &self.leaves[leaf as usize] {
                let start = row as usize * self.dim;
                let code_dot = SimdOps::dot_product_i8(&self.codes[start..start + self.dim], &query_codes);
                approximate.push((row, code_dot as f32 * self.scales[row as usize] * query_scale));
            }
        }

        let shortlist: Vec<u32> = top_k(approximate, self.reorder.max(k))
            .into_iter()
            .map(|(row, _)| row)
            .collect();
        top_k(score_rows(&self.matrix, self.dim, query, &shortlist), k)
    }

    fn search_subset(&self, query: &[f32], k: usize, rows: &[u32]) -> Vec<(u32, f32)> {
        top_k(score_rows(&self.matrix, self.dim, query, rows), k)
    }

    fn is_exact(&self) -> bool {
        false
    }

    fn len(&self) -> usize {
        self.scales.len()
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn name(&self) -> &'static str {
        "partitioned"
    }
}

/// Evenly strided sample of at most `limit` row ids
fn sample_rows(num_rows: usize, limit: usize) -> Vec<usize> {
    let size = num_rows.min(limit.max(1));
    if size == 0 {
        return Vec::new();
    }
    let step = num_rows / size;
    (0..size).map(|i| i * step).collect()
}

fn nearest_centroid(centroids: &[f32], dim: usize, row: &[f32]) -> usize {
    let mut best = 0;
    let mut best_score = f32::NEG_INFINITY;
    for (leaf, centroid) in centroids.chunks_exact(dim.max(1)).enumerate() {
        let score = SimdOps::dot_product(row, centroid);
        if score > best_score {
            best = leaf;
            best_score = score;
        }
    }
    best
}

/// Spherical k-means over the sampled rows
fn train_centroids(matrix: &[f32], dim: usize, sample: &[usize], num_leaves: usize, iterations: usize) -> Vec<f32> {
    let row = |r: usize| &matrix[r * dim..(r + 1) * dim];

    let stride = (sample.len() / num_leaves).max(1);
    let mut centroids: Vec<f32> = (0..num_leaves)
        .flat_map(|leaf| row(sample[(leaf * stride).min(sample.len() - 1)]).to_vec())
        .collect();

    for _ in 0..iterations {
        let assignments: Vec<usize> = sample.par_iter()
            .map(|&r| nearest_centroid(&centroids, dim, row(r)))
            .collect();

        let mut sums = vec![0.0f32; num_leaves * dim];
        let mut counts = vec![0usize; num_leaves];
        for (&r, &leaf) in sample.iter().zip(assignments.iter()) {
            counts[leaf] += 1;
            for (s, x) in sums[leaf * dim..(leaf + 1) * dim].iter_mut().zip(row(r)) {
                *s += x;
            }
        }

        for leaf in 0..num_leaves {
            // Empty clusters keep their previous centroid
            if counts[leaf] == 0 {
                continue;
            }
            let target = &mut centroids[leaf * dim..(leaf + 1) * dim];
            target.copy_from_slice(&sums[leaf * dim..(leaf + 1) * dim]);
            SimdOps::normalize(target);
        }
    }
    centroids
}
