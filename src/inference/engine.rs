//! Prediction engine
//!
//! Resolves a persisted pipeline, engineers features with the inference
//! exclusion policy, scores every row, computes metrics opportunistically
//! when labels are present, and attaches model provenance.

use crate::data::{map_labels, take_rows, DataLoader, DataSchema, FeatureEngineer};
use crate::error::{try_compute, ExoSeekrError, Result};
use crate::report::{render_diagnostics, PlotRefs};
use crate::store::{relative_display, ModelStore, BASE_MODEL_FILENAME};
use crate::training::{ranked_importances, EvalMetrics};
use chrono::Utc;
use ndarray::Array1;
use serde::Serialize;
use std::path::PathBuf;

/// Which historical pipeline contract a prediction runs under.
///
/// The base variant is the immutable predict-only model: it resolves a
/// fixed artifact and reports the raw predicted class as the detection
/// flag, ignoring the caller threshold. The retrainable variant resolves
/// versioned artifacts and requires the confidence to meet the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelVariant {
    Base,
    Retrainable,
}

/// A prediction request as accepted at job submission
#[derive(Debug, Clone)]
pub struct PredictRequest {
    pub data_source: PathBuf,
    pub model_path: Option<String>,
    pub threshold: f64,
}

/// One scored row
#[derive(Debug, Clone, Serialize)]
pub struct RowPrediction {
    pub index: usize,
    pub prediction: u8,
    pub transit_detected: bool,
    pub confidence: f64,
}

/// Where the predictions came from
#[derive(Debug, Clone, Serialize)]
pub struct ModelProvenance {
    pub source: String,
    pub train_data: Option<String>,
    pub retrainable: bool,
}

/// The result payload of a completed prediction job
#[derive(Debug, Clone, Serialize)]
pub struct PredictOutcome {
    pub total_samples: usize,
    pub exoplanets_detected: usize,
    pub predictions: Vec<RowPrediction>,
    pub metrics: Option<EvalMetrics>,
    pub plots: PlotRefs,
    pub model_info: ModelProvenance,
}

/// Orchestrates prediction runs against one artifact store
pub struct PredictEngine {
    loader: DataLoader,
    engineer: FeatureEngineer,
    store: ModelStore,
    plots_dir: PathBuf,
    project_root: PathBuf,
    variant: ModelVariant,
}

impl PredictEngine {
    pub fn new(
        project_root: impl Into<PathBuf>,
        store: ModelStore,
        plots_dir: impl Into<PathBuf>,
        variant: ModelVariant,
    ) -> Self {
        let project_root = project_root.into();
        Self {
            loader: DataLoader::new(project_root.clone()),
            engineer: FeatureEngineer::new(DataSchema::tess()),
            store,
            plots_dir: plots_dir.into(),
            project_root,
            variant,
        }
    }

    /// Run a full prediction operation.
    pub fn predict(&self, request: &PredictRequest) -> Result<PredictOutcome> {
        let model_path = self.resolve_model(request.model_path.as_deref())?;
        let pipeline = self.store.load(&model_path)?;

        let schema = self.engineer.schema().clone();
        let mut df = self.loader.load_csv(&request.data_source)?;

        // Labels are optional at inference: when the disposition column is
        // present, map it and restrict rows so metrics can be computed;
        // any failure here simply suppresses the metrics.
        let mut row_indices: Vec<usize> = (0..df.height()).collect();
        let mut y: Option<Array1<f64>> = None;
        let label_series = df
            .column(&schema.label_column)
            .ok()
            .map(|col| col.as_materialized_series().clone());
        if let Some(series) = label_series {
            if let Some(mapped) = try_compute("label mapping", || map_labels(&series)) {
                df = take_rows(&df, &mapped.indices)?;
                row_indices = mapped.indices.clone();
                y = Some(Array1::from_vec(mapped.targets));
            }
        }

        let engineered = self.engineer.transform(&df);
        let table = self.engineer.feature_table(
            &engineered,
            &schema.inference_exclusions(),
            &row_indices,
        )?;
        if table.n_samples() == 0 || table.n_features() == 0 {
            return Err(ExoSeekrError::ValidationError(
                "No usable numeric features found after preprocessing.".to_string(),
            ));
        }

        let preds = pipeline
            .predict(&table)
            .map_err(|e| ExoSeekrError::ComputationError(format!("Model prediction failed: {e}")))?;
        let probs = pipeline
            .predict_proba(&table)
            .map_err(|e| ExoSeekrError::ComputationError(format!("Model prediction failed: {e}")))?;

        let mut predictions = Vec::with_capacity(table.n_samples());
        let mut detected = 0usize;
        for i in 0..table.n_samples() {
            let positive = preds[i] > 0.5;
            let flag = match self.variant {
                ModelVariant::Base => positive,
                ModelVariant::Retrainable => positive && probs[i] >= request.threshold,
            };
            if flag {
                detected += 1;
            }
            predictions.push(RowPrediction {
                index: table.row_indices[i],
                prediction: positive as u8,
                transit_detected: flag,
                confidence: probs[i],
            });
        }

        let metrics = y
            .as_ref()
            .map(|y_true| EvalMetrics::compute(y_true, &preds, &probs));

        let ts = Utc::now().format("%Y%m%dT%H%M%S").to_string();
        let importances = ranked_importances(&pipeline);
        let plots = render_diagnostics(
            &self.plots_dir,
            &self.project_root,
            &ts,
            metrics.as_ref(),
            y.as_ref().map(|y_true| (y_true, &probs)),
            importances.as_deref(),
        );

        let model_filename = model_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let meta = try_compute("model metadata", || self.store.metadata(&model_filename));
        let model_info = ModelProvenance {
            source: relative_display(&model_path, &self.project_root),
            train_data: meta.map(|m| m.train_data),
            retrainable: self.variant == ModelVariant::Retrainable,
        };

        tracing::info!(
            samples = table.n_samples(),
            detected,
            model = %model_info.source,
            "prediction complete"
        );

        Ok(PredictOutcome {
            total_samples: table.n_samples(),
            exoplanets_detected: detected,
            predictions,
            metrics,
            plots,
            model_info,
        })
    }

    /// Resolve the pipeline artifact to score with.
    ///
    /// The base variant always uses its fixed artifact. The retrainable
    /// variant takes an explicit reference (absolute or project-root
    /// relative) when given, otherwise the newest persisted artifact.
    fn resolve_model(&self, reference: Option<&str>) -> Result<PathBuf> {
        match self.variant {
            ModelVariant::Base => {
                let path = self.store.dir().join(BASE_MODEL_FILENAME);
                if !path.exists() {
                    return Err(ExoSeekrError::NotFound(format!(
                        "Pre-trained model not found at: {}",
                        path.display()
                    )));
                }
                Ok(path)
            }
            ModelVariant::Retrainable => match reference.map(str::trim).filter(|r| !r.is_empty()) {
                Some(reference) => {
                    let path = PathBuf::from(reference);
                    let candidate = if path.is_absolute() {
                        path
                    } else {
                        self.project_root.join(path)
                    };
                    if !candidate.exists() {
                        return Err(ExoSeekrError::NotFound(format!(
                            "Model not found at: {reference}"
                        )));
                    }
                    Ok(candidate)
                }
                None => self.store.latest()?.ok_or_else(|| {
                    ExoSeekrError::NotFound(
                        "No model artifacts found. Provide model_path or train a model first."
                            .to_string(),
                    )
                }),
            },
        }
    }
}
