//! HTTP API: the single `POST /predict` route.

use crate::error::ScoringError;
use crate::metrics::ServiceMetrics;
use crate::models::inference::ScoringEngine;
use crate::types::request::PredictRequest;
use crate::types::response::ErrorBody;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// Shared, read-only state handed to every request
pub struct AppState {
    /// Loaded artifacts; never mutated after startup
    pub engine: ScoringEngine,
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    pub fn new(engine: ScoringEngine, metrics: Arc<ServiceMetrics>) -> Self {
        Self { engine, metrics }
    }
}

/// Build the axum [`Router`] with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict", post(predict_handler))
        .with_state(state)
}

impl IntoResponse for ScoringError {
    fn into_response(self) -> Response {
        let body = ErrorBody::new("scoring_error", self.to_string());
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// `POST /predict`: align, scale and classify one record.
///
/// Missing or unknown features never fail the request. A shape mismatch
/// between the aligned row and the fitted artifacts, or a NaN decision value,
/// returns a 500.
pub async fn predict_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> Response {
    let start = Instant::now();

    match state.engine.predict(&request.data) {
        Ok(prediction) => {
            let latency = start.elapsed();
            let positive = prediction.is_positive(state.engine.classes());
            state.metrics.record_success(latency, &prediction, positive);

            debug!(
                fields = request.data.len(),
                prediction = prediction.label,
                probability = prediction.probability,
                latency_us = latency.as_micros() as u64,
                "Prediction served"
            );

            Json(prediction.to_response()).into_response()
        }
        Err(e) => {
            state.metrics.record_failure(start.elapsed());
            error!(error = %e, fields = request.data.len(), "Scoring failed");
            e.into_response()
        }
    }
}
