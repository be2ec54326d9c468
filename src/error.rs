//! Error types for the ExoSeekr pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ExoSeekrError>;

/// Main error type for the ExoSeekr pipeline
#[derive(Error, Debug)]
pub enum ExoSeekrError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,
}

impl From<polars::error::PolarsError> for ExoSeekrError {
    fn from(err: polars::error::PolarsError) -> Self {
        ExoSeekrError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for ExoSeekrError {
    fn from(err: serde_json::Error) -> Self {
        ExoSeekrError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ExoSeekrError {
    fn from(err: ndarray::ShapeError) -> Self {
        ExoSeekrError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

/// Run a fallible computation and flatten the failure into `None`.
///
/// Derived features, individual metrics, and diagnostic plots are all
/// best-effort: one of them failing must never abort the surrounding
/// train/predict operation. Every such site goes through this helper so
/// the absent-on-failure contract is explicit and the failure is still
/// logged.
pub fn try_compute<T, F>(what: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Result<T>,
{
    match f() {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!(what, %err, "best-effort computation skipped");
            None
        }
    }
}
