//! Training configuration and classifier hyperparameters

use crate::error::{ExoSeekrError, Result};
use crate::model::{MaxFeatures, RandomForest};
use crate::optimizer::{SearchSpace, TrialParams};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fixed random seed used across splitting, rebalancing, and tree building
pub const RANDOM_STATE: u64 = 42;

/// Safety cap on the number of hyperparameter search trials
pub const MAX_SEARCH_TRIALS: usize = 200;

/// Default number of search trials when the caller does not specify one
pub const DEFAULT_SEARCH_TRIALS: usize = 50;

/// Fraction of mapped rows held out for evaluation
pub const HOLDOUT_FRACTION: f64 = 0.2;

/// Folds for the per-trial cross-validated fitness
pub const SEARCH_CV_FOLDS: usize = 3;

/// Classifier-stage hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub max_features: MaxFeatures,
}

impl Default for RfParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            max_features: MaxFeatures::Sqrt,
        }
    }
}

impl RfParams {
    /// The search space of the black-box optimizer: tree count, depth
    /// bound, split size, and max-features strategy.
    pub fn search_space() -> SearchSpace {
        SearchSpace::new()
            .int("n_estimators", 100, 800)
            .categorical("max_depth", vec!["none", "10", "20", "30", "40"])
            .int("min_samples_split", 2, 15)
            .categorical("max_features", vec!["sqrt", "log2"])
    }

    /// Build a configured forest around these parameters.
    pub fn to_forest(&self, seed: u64) -> RandomForest {
        RandomForest::new(self.n_estimators)
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_samples_split)
            .with_max_features(self.max_features)
            .with_random_state(seed)
    }

    /// Decode a sampled trial into typed parameters.
    pub fn from_trial(params: &TrialParams) -> Result<Self> {
        let n_estimators = params
            .get("n_estimators")
            .and_then(|v| v.as_int())
            .ok_or_else(|| ExoSeekrError::ValidationError("trial missing n_estimators".into()))?
            as usize;
        let min_samples_split = params
            .get("min_samples_split")
            .and_then(|v| v.as_int())
            .ok_or_else(|| {
                ExoSeekrError::ValidationError("trial missing min_samples_split".into())
            })? as usize;
        let max_depth = match params.get("max_depth").and_then(|v| v.as_string()) {
            Some("none") | None => None,
            Some(other) => Some(other.parse::<usize>().map_err(|_| {
                ExoSeekrError::ValidationError(format!("invalid max_depth choice: {other}"))
            })?),
        };
        let max_features = match params.get("max_features").and_then(|v| v.as_string()) {
            Some("log2") => MaxFeatures::Log2,
            _ => MaxFeatures::Sqrt,
        };

        Ok(Self {
            n_estimators,
            max_depth,
            min_samples_split,
            max_features,
        })
    }

    /// Parse caller-supplied hyperparameters.
    ///
    /// Keys may carry a classifier-stage prefix (`rf__n_estimators` or
    /// `rf.n_estimators`) or be plain names, which are assumed to target
    /// the classifier stage. Unknown names or unparsable values are a
    /// validation error.
    pub fn from_user(map: &HashMap<String, serde_json::Value>) -> Result<Self> {
        let mut params = Self::default();

        for (raw_key, value) in map {
            let key = raw_key
                .strip_prefix("rf__")
                .or_else(|| raw_key.strip_prefix("rf."))
                .unwrap_or(raw_key);

            match key {
                "n_estimators" => {
                    params.n_estimators = parse_usize(key, value)?;
                }
                "max_depth" => {
                    params.max_depth = if value.is_null() {
                        None
                    } else {
                        Some(parse_usize(key, value)?)
                    };
                }
                "min_samples_split" => {
                    params.min_samples_split = parse_usize(key, value)?;
                }
                "max_features" => {
                    params.max_features = match value.as_str() {
                        Some("sqrt") => MaxFeatures::Sqrt,
                        Some("log2") => MaxFeatures::Log2,
                        _ => {
                            return Err(ExoSeekrError::ValidationError(format!(
                                "invalid max_features value: {value}"
                            )))
                        }
                    };
                }
                other => {
                    return Err(ExoSeekrError::ValidationError(format!(
                        "unknown hyperparameter: {other}"
                    )));
                }
            }
        }

        Ok(params)
    }
}

fn parse_usize(key: &str, value: &serde_json::Value) -> Result<usize> {
    value
        .as_u64()
        .map(|v| v as usize)
        .ok_or_else(|| ExoSeekrError::ValidationError(format!("invalid {key} value: {value}")))
}
