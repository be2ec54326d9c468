//! Model artifact store
//!
//! Owns the directory of persisted pipelines. A pipeline file
//! `rf_pipeline_<TS>.bin` and its metadata `rf_pipeline_<TS>.meta.json`
//! share the timestamp-derived base name so the two are always found
//! together by substituting one extension for the other.

use crate::error::{try_compute, ExoSeekrError, Result};
use crate::pipeline::TransitPipeline;
use crate::training::{EvalMetrics, RfParams};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Base-name prefix of persisted pipeline artifacts
pub const MODEL_PREFIX: &str = "rf_pipeline_";
/// Extension of pipeline artifacts
pub const MODEL_EXTENSION: &str = "bin";
/// Fixed artifact name of the immutable base model
pub const BASE_MODEL_FILENAME: &str = "rf_pipeline_base.bin";

/// Metadata persisted alongside every trained pipeline. Created atomically
/// with the artifact at training time and read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub created_at: String,
    pub model_filename: String,
    pub model_path: String,
    pub metrics: EvalMetrics,
    pub best_params: RfParams,
    pub train_data: String,
    pub retrainable: bool,
}

/// One entry in a model listing: the artifact plus its metadata when the
/// metadata file exists and parses.
#[derive(Debug, Clone, Serialize)]
pub struct ModelEntry {
    pub model_filename: String,
    pub path: String,
    pub created_at: Option<String>,
    pub retrainable: bool,
    pub metrics: Option<EvalMetrics>,
    pub best_params: Option<RfParams>,
    pub metadata_path: Option<String>,
}

/// Filesystem-backed store of trained pipelines
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the metadata file paired with a pipeline artifact.
    pub fn metadata_path_for(model_path: &Path) -> PathBuf {
        model_path.with_extension("meta.json")
    }

    /// Persist a fitted pipeline and its metadata, keyed by
    /// `meta.model_filename`. Returns (model path, metadata path).
    pub fn save(
        &self,
        pipeline: &TransitPipeline,
        meta: &ModelMetadata,
    ) -> Result<(PathBuf, PathBuf)> {
        std::fs::create_dir_all(&self.dir)?;

        let model_path = self.dir.join(&meta.model_filename);
        std::fs::write(&model_path, pipeline.to_bytes()?)?;

        let meta_path = Self::metadata_path_for(&model_path);
        std::fs::write(&meta_path, serde_json::to_string_pretty(meta)?)?;

        tracing::info!(model = %model_path.display(), "persisted pipeline artifact");
        Ok((model_path, meta_path))
    }

    /// Load a persisted pipeline.
    pub fn load(&self, path: &Path) -> Result<TransitPipeline> {
        if !path.exists() {
            return Err(ExoSeekrError::NotFound(format!(
                "Model not found at: {}",
                path.display()
            )));
        }
        let bytes = std::fs::read(path)?;
        TransitPipeline::from_bytes(&bytes)
    }

    fn artifact_filenames(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        if !self.dir.exists() {
            return Ok(names);
        }
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(MODEL_PREFIX) && name.ends_with(&format!(".{MODEL_EXTENSION}")) {
                names.push(name);
            }
        }
        // Timestamp in the name makes lexicographic order chronological
        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names)
    }

    /// Enumerate persisted artifacts newest-first, with metadata when
    /// readable.
    pub fn list(&self) -> Result<Vec<ModelEntry>> {
        let entries = self
            .artifact_filenames()?
            .into_iter()
            .map(|name| {
                let path = self.dir.join(&name);
                let meta_path = Self::metadata_path_for(&path);
                let meta = try_compute("model metadata", || self.read_metadata(&meta_path));
                ModelEntry {
                    model_filename: name,
                    path: path.display().to_string(),
                    created_at: meta.as_ref().map(|m| m.created_at.clone()),
                    retrainable: meta.as_ref().map(|m| m.retrainable).unwrap_or(true),
                    metrics: meta.as_ref().map(|m| m.metrics.clone()),
                    best_params: meta.as_ref().map(|m| m.best_params.clone()),
                    metadata_path: meta_path
                        .exists()
                        .then(|| meta_path.display().to_string()),
                }
            })
            .collect();
        Ok(entries)
    }

    /// Most recently created artifact, by descending filename order.
    pub fn latest(&self) -> Result<Option<PathBuf>> {
        Ok(self
            .artifact_filenames()?
            .into_iter()
            .next()
            .map(|name| self.dir.join(name)))
    }

    /// Full metadata record for an artifact name; not-found when either
    /// the artifact or its metadata file is missing.
    pub fn metadata(&self, model_filename: &str) -> Result<ModelMetadata> {
        let model_path = self.dir.join(model_filename);
        if !model_path.exists() {
            return Err(ExoSeekrError::NotFound(format!(
                "Model not found: {model_filename}"
            )));
        }
        let meta_path = Self::metadata_path_for(&model_path);
        if !meta_path.exists() {
            return Err(ExoSeekrError::NotFound(format!(
                "Metadata file not found for model: {model_filename}"
            )));
        }
        self.read_metadata(&meta_path)
    }

    fn read_metadata(&self, meta_path: &Path) -> Result<ModelMetadata> {
        let raw = std::fs::read_to_string(meta_path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Render a path relative to the project root when possible.
pub fn relative_display(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
