//! HTTP request handlers

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{Path as UrlPath, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::try_compute;
use crate::inference::PredictRequest;
use crate::jobs::JobKind;
use crate::store::BASE_MODEL_FILENAME;
use crate::training::{TrainRequest, DEFAULT_SEARCH_TRIALS, MAX_SEARCH_TRIALS};

use super::error::{Result, ServerError};
use super::AppState;

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Deserialize)]
pub struct TrainRequestBody {
    data_source: String,
    n_trials: Option<usize>,
    hyperparameters: Option<HashMap<String, Value>>,
}

#[derive(Deserialize)]
pub struct PredictRequestBody {
    data_source: String,
    model_path: Option<String>,
    threshold: Option<f64>,
}

#[derive(Deserialize)]
pub struct BasePredictRequestBody {
    csv_path: String,
}

/// Fail fast at submission when the data file does not exist; the engine
/// re-resolves the path inside the job.
fn ensure_csv_exists(project_root: &Path, source: &str) -> Result<PathBuf> {
    let path = PathBuf::from(source);
    let resolved = if path.is_absolute() {
        path
    } else {
        project_root.join(path)
    };
    if !resolved.exists() {
        return Err(ServerError::BadRequest(format!(
            "CSV not found at: {source}"
        )));
    }
    Ok(resolved)
}

// ============================================================================
// Root
// ============================================================================

pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the ExoSeekr API",
        "endpoints": {
            "health": "/health",
            "base_model": {
                "predict": "/base/predict",
                "jobs_status": "/base/jobs/{job_id}/status",
                "models_list": "/base/models/list",
            },
            "retrainable_model": {
                "train": "/retrainable/train",
                "predict": "/retrainable/predict",
                "jobs_status": "/retrainable/jobs/{job_id}/status",
                "models_list": "/retrainable/models/list",
                "model_metadata": "/retrainable/models/{model_filename}/metadata",
            },
        },
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "time": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ============================================================================
// Base model (immutable, predict-only)
// ============================================================================

/// The base model is permanently immutable; its training endpoint always
/// rejects.
pub async fn base_train_disabled() -> ServerError {
    ServerError::Forbidden("Training disabled for the base (immutable) model".to_string())
}

pub async fn base_predict(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BasePredictRequestBody>,
) -> Result<Json<Value>> {
    let csv_path = ensure_csv_exists(&state.config.project_root, &body.csv_path)?;

    let engine = state.base_predict_engine();
    let request = PredictRequest {
        data_source: csv_path,
        model_path: None,
        threshold: 0.5,
    };
    let job_id = state
        .base_jobs
        .submit(JobKind::Predict, move || {
            let outcome = engine.predict(&request)?;
            Ok(serde_json::to_value(outcome)?)
        })
        .await;

    Ok(Json(json!({ "job_id": job_id, "status": "PENDING" })))
}

pub async fn base_job_status(
    State(state): State<Arc<AppState>>,
    UrlPath(job_id): UrlPath<String>,
) -> Result<Json<Value>> {
    let record = state.base_jobs.poll(&job_id).await?;
    Ok(Json(serde_json::to_value(record).map_err(|e| {
        ServerError::Internal(e.to_string())
    })?))
}

pub async fn base_models_list(State(state): State<Arc<AppState>>) -> Json<Value> {
    let store = state.base_store();
    let meta = try_compute("base model metadata", || store.metadata(BASE_MODEL_FILENAME));

    Json(json!({
        "models": [{
            "name": "randomforest_tess_base",
            "version": "1.0.0",
            "source": store.dir().join(BASE_MODEL_FILENAME).display().to_string(),
            "metrics": meta.as_ref().map(|m| m.metrics.clone()),
            "train_data": meta.as_ref().map(|m| m.train_data.clone()),
            "retrainable": false,
            "description": "Immutable random forest trained on the TESS Objects of Interest table. Prediction-only.",
        }],
    }))
}

// ============================================================================
// Retrainable model (train + predict)
// ============================================================================

pub async fn retrain_train(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TrainRequestBody>,
) -> Result<Json<Value>> {
    let n_trials = body.n_trials.unwrap_or(DEFAULT_SEARCH_TRIALS);
    if n_trials > MAX_SEARCH_TRIALS {
        return Err(ServerError::BadRequest(format!(
            "n_trials too large ({n_trials}); max allowed is {MAX_SEARCH_TRIALS}"
        )));
    }
    let csv_path = ensure_csv_exists(&state.config.project_root, &body.data_source)?;

    let engine = state.train_engine();
    let request = TrainRequest {
        data_source: csv_path,
        n_trials,
        hyperparameters: body.hyperparameters,
    };
    let job_id = state
        .retrain_jobs
        .submit(JobKind::Train, move || {
            let outcome = engine.train(&request)?;
            Ok(serde_json::to_value(outcome)?)
        })
        .await;

    Ok(Json(json!({ "job_id": job_id })))
}

pub async fn retrain_predict(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PredictRequestBody>,
) -> Result<Json<Value>> {
    let csv_path = ensure_csv_exists(&state.config.project_root, &body.data_source)?;

    let engine = state.retrain_predict_engine();
    let request = PredictRequest {
        data_source: csv_path,
        model_path: body.model_path,
        threshold: body.threshold.unwrap_or(0.5),
    };
    let job_id = state
        .retrain_jobs
        .submit(JobKind::Predict, move || {
            let outcome = engine.predict(&request)?;
            Ok(serde_json::to_value(outcome)?)
        })
        .await;

    Ok(Json(json!({ "job_id": job_id })))
}

pub async fn retrain_job_status(
    State(state): State<Arc<AppState>>,
    UrlPath(job_id): UrlPath<String>,
) -> Result<Json<Value>> {
    let record = state.retrain_jobs.poll(&job_id).await?;
    Ok(Json(serde_json::to_value(record).map_err(|e| {
        ServerError::Internal(e.to_string())
    })?))
}

pub async fn retrain_jobs_list(State(state): State<Arc<AppState>>) -> Json<Value> {
    let jobs = state.retrain_jobs.list().await;
    Json(json!({ "jobs": jobs }))
}

pub async fn retrain_models_list(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let models = state.retrain_store().list()?;
    Ok(Json(json!({ "models": models })))
}

pub async fn retrain_model_metadata(
    State(state): State<Arc<AppState>>,
    UrlPath(model_filename): UrlPath<String>,
) -> Result<Json<Value>> {
    let meta = state.retrain_store().metadata(&model_filename)?;
    Ok(Json(serde_json::to_value(meta).map_err(|e| {
        ServerError::Internal(e.to_string())
    })?))
}
