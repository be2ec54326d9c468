//! Model inference

mod engine;

pub use engine::{
    ModelProvenance, ModelVariant, PredictEngine, PredictOutcome, PredictRequest, RowPrediction,
};
