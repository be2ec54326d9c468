//! Binary classification metrics
//!
//! Every metric is computed independently; callers wrap each one in
//! `try_compute` so a metric that is undefined for the data at hand (for
//! example ROC-AUC with a single class present) is reported as absent.

use crate::error::{try_compute, ExoSeekrError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Evaluation metrics; any that could not be computed is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalMetrics {
    pub roc_auc: Option<f64>,
    pub pr_auc: Option<f64>,
    pub accuracy: Option<f64>,
    pub f1_score: Option<f64>,
    pub confusion_matrix: Option<Vec<Vec<u64>>>,
}

impl EvalMetrics {
    /// Compute all metrics, each best-effort.
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>, y_prob: &Array1<f64>) -> Self {
        Self {
            roc_auc: try_compute("roc_auc", || roc_auc_score(y_true, y_prob)),
            pr_auc: try_compute("pr_auc", || average_precision_score(y_true, y_prob)),
            accuracy: try_compute("accuracy", || accuracy_score(y_true, y_pred)),
            f1_score: try_compute("f1_score", || f1_score(y_true, y_pred)),
            confusion_matrix: try_compute("confusion_matrix", || {
                confusion_matrix(y_true, y_pred)
            }),
        }
    }
}

fn check_lengths(a: &Array1<f64>, b: &Array1<f64>) -> Result<()> {
    if a.len() != b.len() {
        return Err(ExoSeekrError::ShapeError {
            expected: format!("{} values", a.len()),
            actual: format!("{} values", b.len()),
        });
    }
    if a.is_empty() {
        return Err(ExoSeekrError::ComputationError(
            "metric undefined on empty input".to_string(),
        ));
    }
    Ok(())
}

fn class_counts(y_true: &Array1<f64>) -> (usize, usize) {
    let n_pos = y_true.iter().filter(|&&t| t > 0.5).count();
    (n_pos, y_true.len() - n_pos)
}

/// Area under the ROC curve via the rank statistic, with average ranks for
/// tied scores.
pub fn roc_auc_score(y_true: &Array1<f64>, y_score: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_score)?;
    let (n_pos, n_neg) = class_counts(y_true);
    if n_pos == 0 || n_neg == 0 {
        return Err(ExoSeekrError::ComputationError(
            "ROC AUC is undefined with a single class".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| {
        y_score[a]
            .partial_cmp(&y_score[b])
            .unwrap_or(Ordering::Equal)
    });

    // Average ranks across runs of equal scores
    let mut ranks = vec![0.0; y_score.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && y_score[order[j + 1]] == y_score[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let sum_pos_ranks: f64 = y_true
        .iter()
        .zip(ranks.iter())
        .filter(|(&t, _)| t > 0.5)
        .map(|(_, &r)| r)
        .sum();

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Ok((sum_pos_ranks - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Average precision: the step-wise sum over decreasing score thresholds.
pub fn average_precision_score(y_true: &Array1<f64>, y_score: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_score)?;
    let (n_pos, _) = class_counts(y_true);
    if n_pos == 0 {
        return Err(ExoSeekrError::ComputationError(
            "average precision is undefined without positive samples".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| {
        y_score[b]
            .partial_cmp(&y_score[a])
            .unwrap_or(Ordering::Equal)
    });

    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut prev_recall = 0.0;
    let mut ap = 0.0;

    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && y_score[order[j + 1]] == y_score[order[i]] {
            j += 1;
        }
        for &idx in &order[i..=j] {
            if y_true[idx] > 0.5 {
                tp += 1;
            } else {
                fp += 1;
            }
        }
        let recall = tp as f64 / n_pos as f64;
        let precision = tp as f64 / (tp + fp) as f64;
        ap += (recall - prev_recall) * precision;
        prev_recall = recall;
        i = j + 1;
    }

    Ok(ap)
}

/// Fraction of matching predictions
pub fn accuracy_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| (*t > &0.5) == (*p > &0.5))
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// F1 of the positive class
pub fn f1_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let (tp, fp, _tn, fn_) = confusion_counts(y_true, y_pred);
    let denom = 2 * tp + fp + fn_;
    if denom == 0 {
        return Ok(0.0);
    }
    Ok(2.0 * tp as f64 / denom as f64)
}

/// Confusion matrix [[tn, fp], [fn, tp]] (rows: true class, columns:
/// predicted class, classes in ascending order).
pub fn confusion_matrix(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Vec<Vec<u64>>> {
    check_lengths(y_true, y_pred)?;
    let (tp, fp, tn, fn_) = confusion_counts(y_true, y_pred);
    Ok(vec![vec![tn, fp], vec![fn_, tp]])
}

fn confusion_counts(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> (u64, u64, u64, u64) {
    let mut tp = 0;
    let mut fp = 0;
    let mut tn = 0;
    let mut fn_ = 0;
    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        match (*t > 0.5, *p > 0.5) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (false, false) => tn += 1,
            (true, false) => fn_ += 1,
        }
    }
    (tp, fp, tn, fn_)
}

/// ROC curve points as (false positive rate, true positive rate),
/// starting at (0, 0) and ending at (1, 1).
pub fn roc_curve(y_true: &Array1<f64>, y_score: &Array1<f64>) -> Result<Vec<(f64, f64)>> {
    check_lengths(y_true, y_score)?;
    let (n_pos, n_neg) = class_counts(y_true);
    if n_pos == 0 || n_neg == 0 {
        return Err(ExoSeekrError::ComputationError(
            "ROC curve is undefined with a single class".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| {
        y_score[b]
            .partial_cmp(&y_score[a])
            .unwrap_or(Ordering::Equal)
    });

    let mut points = vec![(0.0, 0.0)];
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && y_score[order[j + 1]] == y_score[order[i]] {
            j += 1;
        }
        for &idx in &order[i..=j] {
            if y_true[idx] > 0.5 {
                tp += 1;
            } else {
                fp += 1;
            }
        }
        points.push((fp as f64 / n_neg as f64, tp as f64 / n_pos as f64));
        i = j + 1;
    }

    Ok(points)
}

/// Precision-recall curve points as (recall, precision), starting at
/// (0, 1).
pub fn precision_recall_curve(
    y_true: &Array1<f64>,
    y_score: &Array1<f64>,
) -> Result<Vec<(f64, f64)>> {
    check_lengths(y_true, y_score)?;
    let (n_pos, _) = class_counts(y_true);
    if n_pos == 0 {
        return Err(ExoSeekrError::ComputationError(
            "PR curve is undefined without positive samples".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| {
        y_score[b]
            .partial_cmp(&y_score[a])
            .unwrap_or(Ordering::Equal)
    });

    let mut points = vec![(0.0, 1.0)];
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && y_score[order[j + 1]] == y_score[order[i]] {
            j += 1;
        }
        for &idx in &order[i..=j] {
            if y_true[idx] > 0.5 {
                tp += 1;
            } else {
                fp += 1;
            }
        }
        points.push((tp as f64 / n_pos as f64, tp as f64 / (tp + fp) as f64));
        i = j + 1;
    }

    Ok(points)
}
