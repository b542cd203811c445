//! HTTP prediction service.
//!
//! Routes:
//! - `GET /` liveness message
//! - `GET /health` health probe
//! - `POST /predict` score one credit application
//! - `GET /metrics` request and prediction statistics
//! - `GET /model` metadata of the loaded model

use crate::config::ServerConfig;
use crate::metrics::{MetricsSnapshot, ServiceMetrics};
use crate::models::{ClassifierKind, ModelArtifact, ParamSet};
use crate::types::{CreditApplication, PredictionResponse, RiskLevelThresholds};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error};

/// Shared, read-only state of the service
#[derive(Clone)]
pub struct AppState {
    pub artifact: Arc<ModelArtifact>,
    pub threshold: f64,
    pub risk_levels: RiskLevelThresholds,
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    pub fn new(artifact: ModelArtifact, config: &ServerConfig) -> Self {
        Self {
            artifact: Arc::new(artifact),
            threshold: config.threshold,
            risk_levels: config.risk_levels.clone(),
            metrics: Arc::new(ServiceMetrics::new()),
        }
    }
}

/// Errors returned to API callers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Prediction error: {0}")]
    Prediction(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Prediction(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "detail": self.to_string() }));
        (self.status(), body).into_response()
    }
}

/// Body of `GET /model`
#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub classifier: ClassifierKind,
    pub best_params: ParamSet,
    pub cv_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub run_id: Option<String>,
    pub threshold: f64,
    pub n_features: usize,
    pub feature_names: Vec<String>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/metrics", get(metrics))
        .route("/model", get(model_info))
        .with_state(state)
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    state.metrics.record_request();
    Json(json!({ "message": "Credit Scoring API is running" }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    state.metrics.record_request();
    Json(json!({ "status": "healthy" }))
}

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<CreditApplication>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    state.metrics.record_request();
    let start = Instant::now();

    // Syntax errors and missing content types are rejected like schema errors
    let Json(application) = payload.map_err(|rejection| {
        debug!(status = %rejection.status(), "Rejected request body");
        ApiError::InvalidBody(rejection.body_text())
    })?;

    let probability = match state.artifact.score(&application) {
        Ok(p) if p.is_finite() => p,
        Ok(p) => {
            state.metrics.record_error();
            return Err(ApiError::Prediction(format!("model returned non-finite probability {p}")));
        }
        Err(e) => {
            state.metrics.record_error();
            error!(error = %e, "Prediction failed");
            return Err(ApiError::Prediction(e.to_string()));
        }
    };

    let response = PredictionResponse::new(probability, state.threshold, &state.risk_levels);
    let latency = start.elapsed();
    state
        .metrics
        .record_prediction(latency, probability, response.risk_level, response.prediction == 1);

    debug!(
        probability = probability,
        class = ?response.class_name,
        risk_level = ?response.risk_level,
        latency_us = latency.as_micros() as u64,
        "Prediction served"
    );
    Ok(Json(response))
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    state.metrics.record_request();
    Json(state.metrics.snapshot())
}

async fn model_info(State(state): State<AppState>) -> Json<ModelInfo> {
    state.metrics.record_request();
    let artifact = &state.artifact;
    Json(ModelInfo {
        classifier: artifact.classifier,
        best_params: artifact.best_params.clone(),
        cv_score: artifact.cv_score,
        created_at: artifact.created_at,
        run_id: artifact.run_id.clone(),
        threshold: state.threshold,
        n_features: artifact.feature_names.len(),
        feature_names: artifact.feature_names.clone(),
    })
}

/// Resolves when the process receives Ctrl-C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
