//! Stratified splitting for evaluation and search

use crate::error::{ExoSeekrError, Result};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// A stratified train/holdout partition
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// A single cross-validation fold
#[derive(Debug, Clone)]
pub struct CvSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

fn class_indices(y: &Array1<f64>, seed: u64) -> Result<BTreeMap<i64, Vec<usize>>> {
    let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, &val) in y.iter().enumerate() {
        by_class.entry(val.round() as i64).or_default().push(idx);
    }

    for (class, indices) in &by_class {
        if indices.len() < 2 {
            return Err(ExoSeekrError::ValidationError(format!(
                "class {class} has fewer than 2 samples, cannot stratify"
            )));
        }
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut shuffled = BTreeMap::new();
    for (class, mut indices) in by_class {
        indices.shuffle(&mut rng);
        shuffled.insert(class, indices);
    }
    Ok(shuffled)
}

/// Split samples into train/test partitions preserving the class ratio.
pub fn stratified_train_test_split(
    y: &Array1<f64>,
    test_fraction: f64,
    seed: u64,
) -> Result<TrainTestSplit> {
    if !(0.0..1.0).contains(&test_fraction) || test_fraction == 0.0 {
        return Err(ExoSeekrError::ValidationError(format!(
            "test_fraction must be in (0, 1), got {test_fraction}"
        )));
    }

    let by_class = class_indices(y, seed)?;

    let mut train = Vec::new();
    let mut test = Vec::new();
    for indices in by_class.values() {
        let n_test = ((indices.len() as f64 * test_fraction).round() as usize)
            .clamp(1, indices.len() - 1);
        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok(TrainTestSplit { train, test })
}

/// Stratified k-fold splits: per-class shuffled indices are dealt
/// round-robin across folds so every fold keeps the class distribution.
pub fn stratified_k_fold(y: &Array1<f64>, n_splits: usize, seed: u64) -> Result<Vec<CvSplit>> {
    if n_splits < 2 {
        return Err(ExoSeekrError::ValidationError(
            "n_splits must be at least 2".to_string(),
        ));
    }
    if y.len() < n_splits {
        return Err(ExoSeekrError::ValidationError(format!(
            "n_samples ({}) must be >= n_splits ({})",
            y.len(),
            n_splits
        )));
    }

    let by_class = class_indices(y, seed)?;

    let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
    for indices in by_class.values() {
        for (i, &idx) in indices.iter().enumerate() {
            folds[i % n_splits].push(idx);
        }
    }

    let splits = (0..n_splits)
        .map(|fold_idx| {
            let test_indices = folds[fold_idx].clone();
            let train_indices: Vec<usize> = folds
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != fold_idx)
                .flat_map(|(_, f)| f.iter().copied())
                .collect();
            CvSplit {
                train_indices,
                test_indices,
                fold_idx,
            }
        })
        .collect();

    Ok(splits)
}
