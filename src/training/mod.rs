//! Model training: configuration, stratified splitting, metrics, and the
//! training engine itself.

mod config;
mod cross_validation;
mod engine;
mod metrics;

pub use config::{
    RfParams, DEFAULT_SEARCH_TRIALS, HOLDOUT_FRACTION, MAX_SEARCH_TRIALS, RANDOM_STATE,
    SEARCH_CV_FOLDS,
};
pub use cross_validation::{stratified_k_fold, stratified_train_test_split, CvSplit, TrainTestSplit};
pub use engine::{ranked_importances, TrainEngine, TrainOutcome, TrainRequest};
pub use metrics::{
    accuracy_score, average_precision_score, confusion_matrix, f1_score, precision_recall_curve,
    roc_auc_score, roc_curve, EvalMetrics,
};
