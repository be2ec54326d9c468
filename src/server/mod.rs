//! HTTP service
//!
//! Thin glue over the pipeline: two sub-services (immutable base model and
//! retrainable model), each with its own job coordinator and artifact
//! store, mounted under one axum router as the original deployment runs
//! them.

mod api;
mod error;
mod handlers;

pub use api::create_router;
pub use error::ServerError;

use crate::inference::{ModelVariant, PredictEngine};
use crate::jobs::JobCoordinator;
use crate::store::ModelStore;
use crate::training::TrainEngine;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub project_root: PathBuf,
    pub base_models_dir: PathBuf,
    pub retrain_models_dir: PathBuf,
    pub base_plots_dir: PathBuf,
    pub retrain_plots_dir: PathBuf,
}

impl ServerConfig {
    /// Configuration rooted at a project directory, with the artifact and
    /// plot directories laid out beneath it.
    pub fn with_project_root(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            base_models_dir: project_root.join("models/base"),
            retrain_models_dir: project_root.join("models/retrainable"),
            base_plots_dir: project_root.join("static/plots/base"),
            retrain_plots_dir: project_root.join("static/plots/retrainable"),
            project_root,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::with_project_root(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

/// Application state shared across handlers. Each model variant keeps its
/// own job table, as the two sub-services are independent.
pub struct AppState {
    pub config: ServerConfig,
    pub base_jobs: JobCoordinator,
    pub retrain_jobs: JobCoordinator,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            base_jobs: JobCoordinator::new(),
            retrain_jobs: JobCoordinator::new(),
        }
    }

    pub fn base_store(&self) -> ModelStore {
        ModelStore::new(&self.config.base_models_dir)
    }

    pub fn retrain_store(&self) -> ModelStore {
        ModelStore::new(&self.config.retrain_models_dir)
    }

    pub fn train_engine(&self) -> TrainEngine {
        TrainEngine::new(
            &self.config.project_root,
            self.retrain_store(),
            &self.config.retrain_plots_dir,
        )
    }

    pub fn base_predict_engine(&self) -> PredictEngine {
        PredictEngine::new(
            &self.config.project_root,
            self.base_store(),
            &self.config.base_plots_dir,
            ModelVariant::Base,
        )
    }

    pub fn retrain_predict_engine(&self) -> PredictEngine {
        PredictEngine::new(
            &self.config.project_root,
            self.retrain_store(),
            &self.config.retrain_plots_dir,
            ModelVariant::Retrainable,
        )
    }
}

/// Start the server with the given configuration.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();

    std::fs::create_dir_all(&config.base_models_dir)?;
    std::fs::create_dir_all(&config.retrain_models_dir)?;
    std::fs::create_dir_all(&config.base_plots_dir)?;
    std::fs::create_dir_all(&config.retrain_plots_dir)?;

    info!(
        project_root = %config.project_root.display(),
        base_models = %config.base_models_dir.display(),
        retrain_models = %config.retrain_models_dir.display(),
        "initialized service directories"
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = Arc::new(AppState::new(config));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        address = %addr,
        started_at = %start_time.to_rfc3339(),
        "ExoSeekr backend listening"
    );

    let shutdown_signal = async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C signal handler");
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(
            uptime_secs = uptime.num_seconds(),
            "shutdown signal received, stopping server gracefully"
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_directory_layout() {
        let config = ServerConfig::with_project_root("/srv/exoseekr");
        assert_eq!(
            config.retrain_models_dir,
            PathBuf::from("/srv/exoseekr/models/retrainable")
        );
        assert_eq!(
            config.base_plots_dir,
            PathBuf::from("/srv/exoseekr/static/plots/base")
        );
    }
}
