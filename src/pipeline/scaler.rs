//! Feature scaling over the feature matrix

use crate::error::{ExoSeekrError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Standard (z-score) scaler: (x - mean) / std per column.
/// A zero-variance column scales by 1 instead of dividing by zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
    is_fitted: bool,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self {
            means: Vec::new(),
            scales: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        let n = x.nrows() as f64;
        if n == 0.0 {
            return Err(ExoSeekrError::ValidationError(
                "cannot fit a scaler on zero samples".to_string(),
            ));
        }

        self.means = (0..x.ncols())
            .map(|j| x.column(j).sum() / n)
            .collect();
        self.scales = (0..x.ncols())
            .map(|j| {
                let mean = self.means[j];
                let var = x.column(j).iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                if std == 0.0 {
                    1.0
                } else {
                    std
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
        if x.ncols() != self.means.len() {
            return Err(ExoSeekrError::ShapeError {
                expected: format!("{} columns", self.means.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut result = x.clone();
        for j in 0..result.ncols() {
            let mean = self.means[j];
            let scale = self.scales[j];
            for value in result.column_mut(j).iter_mut() {
                *value = (*value - mean) / scale;
            }
        }
        Ok(result)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standard_scaling() {
        let x = array![[1.0], [2.0], [3.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();

        let mean: f64 = scaled.column(0).sum() / 3.0;
        assert!(mean.abs() < 1e-12);
        assert!(scaled[[0, 0]] < 0.0 && scaled[[2, 0]] > 0.0);
    }

    #[test]
    fn test_constant_column_is_not_divided_by_zero() {
        let x = array![[5.0], [5.0], [5.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();
        assert!(scaled.iter().all(|v| v.is_finite()));
        assert!(scaled.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_transform_uses_fit_statistics() {
        let train = array![[0.0], [10.0]];
        let mut scaler = StandardScaler::new();
        scaler.fit(&train).unwrap();

        let test = array![[5.0]];
        let scaled = scaler.transform(&test).unwrap();
        assert!(scaled[[0, 0]].abs() < 1e-12); // 5 is the training mean
    }
}
