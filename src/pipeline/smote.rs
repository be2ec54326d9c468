//! SMOTE class rebalancing

use crate::error::{ExoSeekrError, Result};
use ndarray::{Array1, Array2};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// Ordered distance/index pair for the k-nearest-neighbor heap
#[derive(Debug, Clone, Copy)]
struct DistIdx(f64, usize);

impl PartialEq for DistIdx {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for DistIdx {}
impl PartialOrd for DistIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

/// SMOTE (Synthetic Minority Over-sampling Technique).
///
/// Balances every class up to the majority count by interpolating between a
/// random class member and one of its k nearest same-class neighbors.
/// Applied to the training partition only, never at inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Smote {
    k_neighbors: usize,
    seed: Option<u64>,
}

impl Smote {
    pub fn new() -> Self {
        Self {
            k_neighbors: 5,
            seed: None,
        }
    }

    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn distance(a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(ai, bi)| (ai - bi).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// k nearest neighbors of `point` within `data`, excluding itself
    fn find_neighbors(point: &[f64], data: &[Vec<f64>], k: usize) -> Vec<usize> {
        let mut heap: BinaryHeap<DistIdx> = BinaryHeap::with_capacity(k + 1);
        for (i, d) in data.iter().enumerate() {
            let dist = Self::distance(point, d);
            if dist <= 0.0 {
                continue;
            }
            if heap.len() < k {
                heap.push(DistIdx(dist, i));
            } else if let Some(&DistIdx(max_dist, _)) = heap.peek() {
                if dist < max_dist {
                    heap.pop();
                    heap.push(DistIdx(dist, i));
                }
            }
        }
        heap.into_iter().map(|DistIdx(_, i)| i).collect()
    }

    /// Resample `x`/`y` so every class reaches the majority count.
    pub fn fit_resample(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<(Array2<f64>, Array1<f64>)> {
        let mut indices: HashMap<i64, Vec<usize>> = HashMap::new();
        for (i, &target) in y.iter().enumerate() {
            indices.entry(target.round() as i64).or_default().push(i);
        }

        if indices.len() < 2 {
            return Err(ExoSeekrError::ValidationError(
                "SMOTE requires at least 2 classes".to_string(),
            ));
        }

        let max_count = indices.values().map(|v| v.len()).max().unwrap_or(0);
        let n_features = x.ncols();

        let mut rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let mut synthetic_x: Vec<Vec<f64>> = Vec::new();
        let mut synthetic_y: Vec<f64> = Vec::new();

        let mut classes: Vec<i64> = indices.keys().copied().collect();
        classes.sort_unstable();

        for class in classes {
            let class_idx = &indices[&class];
            let n_to_generate = max_count.saturating_sub(class_idx.len());
            if n_to_generate == 0 {
                continue;
            }
            if class_idx.len() < 2 {
                tracing::warn!(
                    class,
                    "class too small for SMOTE interpolation, skipping rebalance"
                );
                continue;
            }

            let class_samples: Vec<Vec<f64>> = class_idx
                .iter()
                .map(|&i| x.row(i).iter().copied().collect())
                .collect();
            let k = self.k_neighbors.min(class_samples.len() - 1).max(1);

            let mut generated = 0;
            while generated < n_to_generate {
                let idx = rng.gen_range(0..class_samples.len());
                let sample = &class_samples[idx];

                let neighbors = Self::find_neighbors(sample, &class_samples, k);
                let synthetic = if neighbors.is_empty() {
                    // All duplicates of the same point; replicate it
                    sample.clone()
                } else {
                    let neighbor = &class_samples[neighbors[rng.gen_range(0..neighbors.len())]];
                    let gap: f64 = rng.gen();
                    sample
                        .iter()
                        .zip(neighbor.iter())
                        .map(|(&p, &n)| p + gap * (n - p))
                        .collect()
                };

                synthetic_x.push(synthetic);
                synthetic_y.push(class as f64);
                generated += 1;
            }
        }

        let n_original = x.nrows();
        let n_total = n_original + synthetic_x.len();
        let result_x = Array2::from_shape_fn((n_total, n_features), |(i, j)| {
            if i < n_original {
                x[[i, j]]
            } else {
                synthetic_x[i - n_original][j]
            }
        });

        let mut all_y: Vec<f64> = y.iter().copied().collect();
        all_y.extend_from_slice(&synthetic_y);

        Ok((result_x, Array1::from_vec(all_y)))
    }
}

impl Default for Smote {
    fn default() -> Self {
        Self::new()
    }
}
