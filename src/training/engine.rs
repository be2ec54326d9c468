//! Training engine
//!
//! Orchestrates the full training operation: label mapping, feature
//! engineering, stratified splitting, hyperparameter search (or a direct
//! fit with supplied parameters), holdout evaluation, artifact
//! persistence, and diagnostic reporting.

use crate::data::{map_labels, take_rows, DataLoader, DataSchema, FeatureEngineer, FeatureTable};
use crate::error::{ExoSeekrError, Result};
use crate::optimizer::{Sampler, TpeSampler, TrialParams};
use crate::pipeline::TransitPipeline;
use crate::report::{render_diagnostics, PlotRefs};
use crate::store::{relative_display, ModelMetadata, ModelStore, MODEL_EXTENSION, MODEL_PREFIX};
use crate::training::config::{
    RfParams, HOLDOUT_FRACTION, MAX_SEARCH_TRIALS, RANDOM_STATE, SEARCH_CV_FOLDS,
};
use crate::training::cross_validation::{stratified_k_fold, stratified_train_test_split, CvSplit};
use crate::training::metrics::{average_precision_score, EvalMetrics};
use chrono::Utc;
use ndarray::Array1;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

/// A training request as accepted at job submission
#[derive(Debug, Clone)]
pub struct TrainRequest {
    pub data_source: PathBuf,
    pub n_trials: usize,
    pub hyperparameters: Option<HashMap<String, serde_json::Value>>,
}

/// The result payload of a completed training job
#[derive(Debug, Clone, Serialize)]
pub struct TrainOutcome {
    pub status: String,
    pub model_path: String,
    pub metrics: EvalMetrics,
    pub plots: PlotRefs,
    pub best_params: RfParams,
    pub metadata_path: String,
}

/// Orchestrates training runs against one artifact store
pub struct TrainEngine {
    loader: DataLoader,
    engineer: FeatureEngineer,
    store: ModelStore,
    plots_dir: PathBuf,
    project_root: PathBuf,
    seed: u64,
}

impl TrainEngine {
    pub fn new(
        project_root: impl Into<PathBuf>,
        store: ModelStore,
        plots_dir: impl Into<PathBuf>,
    ) -> Self {
        let project_root = project_root.into();
        Self {
            loader: DataLoader::new(project_root.clone()),
            engineer: FeatureEngineer::new(DataSchema::tess()),
            store,
            plots_dir: plots_dir.into(),
            project_root,
            seed: RANDOM_STATE,
        }
    }

    /// Run a full training operation.
    pub fn train(&self, request: &TrainRequest) -> Result<TrainOutcome> {
        // The cap check happens before any other work, including data
        // loading.
        if request.n_trials > MAX_SEARCH_TRIALS {
            return Err(ExoSeekrError::ValidationError(format!(
                "n_trials too large ({}) - limit is {}",
                request.n_trials, MAX_SEARCH_TRIALS
            )));
        }

        let start = Instant::now();
        let schema = self.engineer.schema().clone();
        let df = self.loader.load_csv(&request.data_source)?;

        let label_series = df
            .column(&schema.label_column)
            .map_err(|_| {
                ExoSeekrError::ValidationError(format!(
                    "Training CSV must contain '{}' for supervised training.",
                    schema.label_column
                ))
            })?
            .as_materialized_series()
            .clone();

        let labels = map_labels(&label_series)?;
        if labels.is_empty() {
            return Err(ExoSeekrError::ValidationError(
                "no rows with recognized disposition labels".to_string(),
            ));
        }

        let df = take_rows(&df, &labels.indices)?;
        let engineered = self.engineer.transform(&df);
        let table =
            self.engineer
                .feature_table(&engineered, &schema.training_exclusions(), &labels.indices)?;
        if table.n_samples() == 0 || table.n_features() == 0 {
            return Err(ExoSeekrError::ValidationError(
                "No usable numeric features after preprocessing.".to_string(),
            ));
        }

        let y = Array1::from_vec(labels.targets.clone());
        let split = stratified_train_test_split(&y, HOLDOUT_FRACTION, self.seed)?;
        let train_table = table.subset(&split.train);
        let test_table = table.subset(&split.test);
        let y_train = select_targets(&y, &split.train);
        let y_test = select_targets(&y, &split.test);

        tracing::info!(
            samples = table.n_samples(),
            features = table.n_features(),
            train = y_train.len(),
            holdout = y_test.len(),
            "training data prepared"
        );

        let best_params = match &request.hyperparameters {
            Some(map) => RfParams::from_user(map)?,
            None => self.search(&train_table, &y_train, request.n_trials)?,
        };

        let mut pipeline = TransitPipeline::new(best_params.to_forest(self.seed), self.seed);
        pipeline.fit(&train_table, &y_train)?;

        let y_pred = pipeline.predict(&test_table)?;
        let y_prob = pipeline.predict_proba(&test_table)?;
        let metrics = EvalMetrics::compute(&y_test, &y_pred, &y_prob);

        let ts = Utc::now().format("%Y%m%dT%H%M%S").to_string();
        let model_filename = format!("{MODEL_PREFIX}{ts}.{MODEL_EXTENSION}");
        let resolved_source = self.loader.resolve(&request.data_source)?;
        let meta = ModelMetadata {
            created_at: ts.clone(),
            model_filename: model_filename.clone(),
            model_path: relative_display(
                &self.store.dir().join(&model_filename),
                &self.project_root,
            ),
            metrics: metrics.clone(),
            best_params: best_params.clone(),
            train_data: relative_display(&resolved_source, &self.project_root),
            retrainable: true,
        };
        let (model_path, meta_path) = self.store.save(&pipeline, &meta)?;

        let importances = ranked_importances(&pipeline);
        let plots = render_diagnostics(
            &self.plots_dir,
            &self.project_root,
            &ts,
            Some(&metrics),
            Some((&y_test, &y_prob)),
            importances.as_deref(),
        );

        tracing::info!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            model = %model_path.display(),
            "training complete"
        );

        Ok(TrainOutcome {
            status: "success".to_string(),
            model_path: relative_display(&model_path, &self.project_root),
            metrics,
            plots,
            best_params,
            metadata_path: relative_display(&meta_path, &self.project_root),
        })
    }

    /// Black-box search: sample trial parameters, score each by mean
    /// cross-validated average precision on the training partition, keep
    /// the best.
    fn search(&self, table: &FeatureTable, y: &Array1<f64>, n_trials: usize) -> Result<RfParams> {
        let space = RfParams::search_space();
        let mut sampler = TpeSampler::new(Some(self.seed));
        let folds = stratified_k_fold(y, SEARCH_CV_FOLDS, self.seed)?;

        let mut history: Vec<(TrialParams, f64)> = Vec::new();
        let mut best: Option<(RfParams, f64)> = None;

        for trial_idx in 0..n_trials {
            let trial = sampler.sample(&space, &history);
            let params = RfParams::from_trial(&trial)?;

            match self.cv_average_precision(table, y, &folds, &params) {
                Ok(score) => {
                    tracing::debug!(trial_idx, score, ?params, "search trial complete");
                    if best.as_ref().map_or(true, |(_, b)| score > *b) {
                        best = Some((params, score));
                    }
                    history.push((trial, score));
                }
                Err(err) => {
                    tracing::warn!(trial_idx, %err, "search trial failed");
                    history.push((trial, f64::NEG_INFINITY));
                }
            }
        }

        best.map(|(params, score)| {
            tracing::info!(score, ?params, "hyperparameter search finished");
            params
        })
        .ok_or_else(|| {
            ExoSeekrError::ComputationError(
                "hyperparameter search produced no successful trial".to_string(),
            )
        })
    }

    fn cv_average_precision(
        &self,
        table: &FeatureTable,
        y: &Array1<f64>,
        folds: &[CvSplit],
        params: &RfParams,
    ) -> Result<f64> {
        let mut scores = Vec::with_capacity(folds.len());
        for fold in folds {
            let fold_train = table.subset(&fold.train_indices);
            let fold_test = table.subset(&fold.test_indices);
            let y_train = select_targets(y, &fold.train_indices);
            let y_test = select_targets(y, &fold.test_indices);

            let mut pipeline = TransitPipeline::new(params.to_forest(self.seed), self.seed);
            pipeline.fit(&fold_train, &y_train)?;
            let prob = pipeline.predict_proba(&fold_test)?;
            scores.push(average_precision_score(&y_test, &prob)?);
        }
        Ok(scores.iter().sum::<f64>() / scores.len() as f64)
    }

}

fn select_targets(y: &Array1<f64>, indices: &[usize]) -> Array1<f64> {
    Array1::from_vec(indices.iter().map(|&i| y[i]).collect())
}

/// Classifier-stage importances aligned to feature names when the lengths
/// match, sorted descending.
pub fn ranked_importances(pipeline: &TransitPipeline) -> Option<Vec<(String, f64)>> {
    let importances = pipeline.feature_importances()?;
    let names = pipeline.feature_names();

    let mut pairs: Vec<(String, f64)> = if importances.len() == names.len() {
        names
            .iter()
            .cloned()
            .zip(importances.iter().copied())
            .collect()
    } else {
        importances
            .iter()
            .copied()
            .enumerate()
            .map(|(i, v)| (format!("feature_{i}"), v))
            .collect()
    };

    pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    Some(pairs)
}
