//! API route definitions

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::{handlers, AppState};

async fn handle_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": true,
            "detail": "Not found. Visit / for the endpoint map or /health to check status.",
        })),
    )
}

/// Create the main application router: the base (immutable) and
/// retrainable sub-services mounted under their own prefixes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let base_routes = Router::new()
        .route("/train", post(handlers::base_train_disabled))
        .route("/predict", post(handlers::base_predict))
        .route("/jobs/:job_id/status", get(handlers::base_job_status))
        .route("/models/list", get(handlers::base_models_list));

    let retrainable_routes = Router::new()
        .route("/train", post(handlers::retrain_train))
        .route("/predict", post(handlers::retrain_predict))
        .route("/jobs/:job_id/status", get(handlers::retrain_job_status))
        .route("/jobs/list", get(handlers::retrain_jobs_list))
        .route("/models/list", get(handlers::retrain_models_list))
        .route(
            "/models/:model_filename/metadata",
            get(handlers::retrain_model_metadata),
        );

    // CORS stays wide open: the service fronts a separate web UI
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .nest("/base", base_routes)
        .nest("/retrainable", retrainable_routes)
        .fallback(handle_404)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
