//! Decision tree classifier

use crate::error::{ExoSeekrError, Result};
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with predicted class
    Leaf { value: f64, n_samples: usize },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Criterion {
    Gini,
    Entropy,
}

/// Binary decision tree classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Candidate features considered per split (None = all)
    pub max_features: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed for the per-split feature subsampling
    pub random_state: Option<u64>,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            random_state: None,
            n_features: 0,
            feature_importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the tree to training data. Targets must be 0/1.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(ExoSeekrError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(ExoSeekrError::ValidationError(
                "cannot fit a tree on zero samples".to_string(),
            ));
        }

        self.n_features = n_features;

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0));
        let mut importances = vec![0.0; n_features];
        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut rng, &mut importances));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
        importances: &mut [f64],
    ) -> TreeNode {
        let n_samples = indices.len();
        let n_pos = count_positive(y, indices);

        let should_stop = n_samples < self.min_samples_split
            || n_pos == 0
            || n_pos == n_samples
            || self.max_depth.map_or(false, |d| depth >= d);

        if should_stop {
            return TreeNode::Leaf {
                value: leaf_value(n_samples, n_pos),
                n_samples,
            };
        }

        let parent_impurity = self.impurity(n_samples, n_pos);

        if let Some((feature_idx, threshold, gain)) =
            self.find_best_split(x, y, indices, parent_impurity, rng)
        {
            let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| x[[i, feature_idx]] <= threshold);

            if left_indices.len() < self.min_samples_leaf
                || right_indices.len() < self.min_samples_leaf
            {
                return TreeNode::Leaf {
                    value: leaf_value(n_samples, n_pos),
                    n_samples,
                };
            }

            importances[feature_idx] += n_samples as f64 * gain;

            let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, rng, importances));
            let right =
                Box::new(self.build_tree(x, y, &right_indices, depth + 1, rng, importances));

            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                n_samples,
            }
        } else {
            TreeNode::Leaf {
                value: leaf_value(n_samples, n_pos),
                n_samples,
            }
        }
    }

    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        parent_impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<(usize, f64, f64)> {
        let n_features = x.ncols();
        let k = self
            .max_features
            .unwrap_or(n_features)
            .min(n_features)
            .max(1);

        // Random candidate subset, fresh per split
        let mut candidates: Vec<usize> = (0..n_features).collect();
        if k < n_features {
            candidates.shuffle(rng);
            candidates.truncate(k);
        }

        let results: Vec<Option<(usize, f64, f64)>> = candidates
            .par_iter()
            .map(|&feature_idx| {
                self.best_split_for_feature(x, y, indices, feature_idx, parent_impurity)
                    .map(|(threshold, gain)| (feature_idx, threshold, gain))
            })
            .collect();

        results
            .into_iter()
            .flatten()
            .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(Ordering::Equal))
    }

    /// Sorted single-pass sweep: sort samples by feature value, then move
    /// the class counts across each distinct-value boundary incrementally.
    fn best_split_for_feature(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        feature_idx: usize,
        parent_impurity: f64,
    ) -> Option<(f64, f64)> {
        let mut pairs: Vec<(f64, f64)> = indices
            .iter()
            .map(|&i| (x[[i, feature_idx]], y[i]))
            .collect();
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let n = pairs.len();
        let total_pos = pairs.iter().filter(|(_, t)| *t > 0.5).count();

        let mut left_n = 0usize;
        let mut left_pos = 0usize;
        let mut best: Option<(f64, f64)> = None;

        for i in 0..n - 1 {
            left_n += 1;
            if pairs[i].1 > 0.5 {
                left_pos += 1;
            }
            if pairs[i].0 == pairs[i + 1].0 {
                continue;
            }

            let right_n = n - left_n;
            if left_n < self.min_samples_leaf || right_n < self.min_samples_leaf {
                continue;
            }

            let right_pos = total_pos - left_pos;
            let weighted = (left_n as f64 * self.impurity(left_n, left_pos)
                + right_n as f64 * self.impurity(right_n, right_pos))
                / n as f64;
            let gain = parent_impurity - weighted;

            if gain > best.map_or(0.0, |(_, g)| g) {
                best = Some(((pairs[i].0 + pairs[i + 1].0) / 2.0, gain));
            }
        }

        best
    }

    fn impurity(&self, n: usize, n_pos: usize) -> f64 {
        if n == 0 {
            return 0.0;
        }
        let p = n_pos as f64 / n as f64;
        let q = 1.0 - p;
        match self.criterion {
            Criterion::Gini => 1.0 - p * p - q * q,
            Criterion::Entropy => {
                let mut entropy = 0.0;
                if p > 0.0 {
                    entropy -= p * p.ln();
                }
                if q > 0.0 {
                    entropy -= q * q.ln();
                }
                entropy
            }
        }
    }

    /// Make predictions (0.0 or 1.0 per row)
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(ExoSeekrError::ModelNotFitted)?;

        let predictions: Vec<f64> = (0..x.nrows())
            .map(|i| predict_sample(root, &x.row(i).to_vec()))
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get tree depth
    pub fn depth(&self) -> usize {
        match &self.root {
            None => 0,
            Some(node) => node_depth(node),
        }
    }
}

fn count_positive(y: &Array1<f64>, indices: &[usize]) -> usize {
    indices.iter().filter(|&&i| y[i] > 0.5).count()
}

/// Majority class; ties resolve to the negative class.
fn leaf_value(n: usize, n_pos: usize) -> f64 {
    if n_pos * 2 > n {
        1.0
    } else {
        0.0
    }
}

fn predict_sample(node: &TreeNode, sample: &[f64]) -> f64 {
    match node {
        TreeNode::Leaf { value, .. } => *value,
        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            ..
        } => {
            if sample[*feature_idx] <= *threshold {
                predict_sample(left, sample)
            } else {
                predict_sample(right, sample)
            }
        }
    }
}

fn node_depth(node: &TreeNode) -> usize {
    match node {
        TreeNode::Leaf { .. } => 1,
        TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_separable_classes() {
        let x = array![[0.0, 0.0], [0.1, 0.2], [0.2, 0.1], [1.0, 1.0], [1.1, 0.9], [0.9, 1.1]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        let predictions = tree.predict(&x).unwrap();
        assert_eq!(predictions.to_vec(), y.to_vec());
    }

    #[test]
    fn test_max_depth_bounds_tree() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]];
        let y = array![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];

        let mut tree = DecisionTree::new().with_max_depth(2);
        tree.fit(&x, &y).unwrap();

        assert!(tree.depth() <= 3); // root split + one more level + leaves
    }

    #[test]
    fn test_feature_importances_prefer_informative() {
        let x = array![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0], [4.0, 5.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        let importances = tree.feature_importances().unwrap();
        assert!(importances[0] > importances[1]);
    }

    #[test]
    fn test_pure_node_is_leaf() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![1.0, 1.0, 1.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.depth(), 1);
        let predictions = tree.predict(&x).unwrap();
        assert!(predictions.iter().all(|&p| p == 1.0));
    }

    #[test]
    fn test_unfitted_tree_errors() {
        let tree = DecisionTree::new();
        let x = array![[1.0]];
        assert!(matches!(
            tree.predict(&x),
            Err(ExoSeekrError::ModelNotFitted)
        ));
    }
}
