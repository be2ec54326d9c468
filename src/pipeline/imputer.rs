//! Missing value imputation over the feature matrix

use crate::error::{ExoSeekrError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Per-column median imputer.
///
/// Fitting records the median of the non-missing values in each column;
/// transforming replaces every NaN with the recorded median. A column that
/// was entirely missing at fit time imputes to 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedianImputer {
    medians: Vec<f64>,
    is_fitted: bool,
}

impl MedianImputer {
    pub fn new() -> Self {
        Self {
            medians: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        self.medians = (0..x.ncols())
            .map(|j| {
                let mut values: Vec<f64> =
                    x.column(j).iter().copied().filter(|v| !v.is_nan()).collect();
                if values.is_empty() {
                    return 0.0;
                }
                values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let mid = values.len() / 2;
                if values.len() % 2 == 0 {
                    (values[mid - 1] + values[mid]) / 2.0
                } else {
                    values[mid]
                }
            })
            .collect();
        self.is_fitted = true;
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(ExoSeekrError::ModelNotFitted);
        }
        if x.ncols() != self.medians.len() {
            return Err(ExoSeekrError::ShapeError {
                expected: format!("{} columns", self.medians.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut result = x.clone();
        for (j, median) in self.medians.iter().enumerate() {
            for value in result.column_mut(j).iter_mut() {
                if value.is_nan() {
                    *value = *median;
                }
            }
        }
        Ok(result)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

impl Default for MedianImputer {
    fn default() -> Self {
        Self::new()
    }
}
