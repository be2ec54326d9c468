//! The trained pipeline: impute -> scale -> rebalance -> classify
//!
//! Mirrors the persisted artifact contract: once fitted and saved, a
//! pipeline is immutable and fully self-contained (stages, fitted
//! parameters, and training-time feature names).

mod imputer;
mod scaler;
mod smote;

pub use imputer::MedianImputer;
pub use scaler::StandardScaler;
pub use smote::Smote;

use crate::data::FeatureTable;
use crate::error::{ExoSeekrError, Result};
use crate::model::RandomForest;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Ordered transformation chain plus the fitted classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitPipeline {
    imputer: MedianImputer,
    scaler: StandardScaler,
    smote: Smote,
    forest: RandomForest,
    feature_names: Vec<String>,
    is_fitted: bool,
}

impl TransitPipeline {
    /// Build an unfitted pipeline around a configured forest.
    pub fn new(forest: RandomForest, seed: u64) -> Self {
        Self {
            imputer: MedianImputer::new(),
            scaler: StandardScaler::new(),
            smote: Smote::new().with_seed(seed),
            forest,
            feature_names: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fit all stages on the training table. SMOTE rebalancing is applied
    /// to the training data only.
    pub fn fit(&mut self, table: &FeatureTable, y: &Array1<f64>) -> Result<&mut Self> {
        if table.n_samples() != y.len() {
            return Err(ExoSeekrError::ShapeError {
                expected: format!("{} targets", table.n_samples()),
                actual: format!("{}", y.len()),
            });
        }

        let imputed = self.imputer.fit_transform(&table.x)?;
        let scaled = self.scaler.fit_transform(&imputed)?;
        let (balanced_x, balanced_y) = self.smote.fit_resample(&scaled, y)?;
        self.forest.fit(&balanced_x, &balanced_y)?;

        self.feature_names = table.columns.clone();
        self.is_fitted = true;
        Ok(self)
    }

    /// Predicted class per row (0.0 or 1.0).
    pub fn predict(&self, table: &FeatureTable) -> Result<Array1<f64>> {
        let x = self.prepare(table)?;
        self.forest.predict(&x)
    }

    /// Positive-class probability per row.
    pub fn predict_proba(&self, table: &FeatureTable) -> Result<Array1<f64>> {
        let x = self.prepare(table)?;
        self.forest.predict_proba(&x)
    }

    /// Align an inference table to the training feature set and run the
    /// fitted transform stages.
    ///
    /// A trained feature absent from the input is tolerated as all-missing
    /// (the training median fills it); input columns the pipeline was not
    /// trained on are ignored. If the input shares no feature at all with
    /// the training table, prediction fails.
    fn prepare(&self, table: &FeatureTable) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(ExoSeekrError::ModelNotFitted);
        }

        let aligned = if table.columns == self.feature_names {
            table.x.clone()
        } else {
            let positions: Vec<Option<usize>> = self
                .feature_names
                .iter()
                .map(|name| table.columns.iter().position(|c| c == name))
                .collect();

            if positions.iter().all(|p| p.is_none()) {
                return Err(ExoSeekrError::ComputationError(format!(
                    "Model prediction failed: none of the {} training features are present in the input",
                    self.feature_names.len()
                )));
            }

            Array2::from_shape_fn((table.n_samples(), self.feature_names.len()), |(i, j)| {
                match positions[j] {
                    Some(src) => table.x[[i, src]],
                    None => f64::NAN,
                }
            })
        };

        let imputed = self.imputer.transform(&aligned)?;
        self.scaler.transform(&imputed)
    }

    /// Training-time feature names, in matrix order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Importances from the classifier stage, in feature-name order.
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.forest.feature_importances()
    }

    /// Serialize the fitted pipeline for persistence.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| ExoSeekrError::SerializationError(e.to_string()))
    }

    /// Deserialize a persisted pipeline.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| ExoSeekrError::SerializationError(e.to_string()))
    }
}
