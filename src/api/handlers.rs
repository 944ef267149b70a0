use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::core::QuarterlyRiskAssessor;
use crate::domain::model::{QuarterlyRiskInput, RiskReport};
use crate::utils::error::{Result, RiskError};

pub struct AppState {
    pub assessor: QuarterlyRiskAssessor,
}

impl AppState {
    pub fn new(assessor: QuarterlyRiskAssessor) -> Self {
        Self { assessor }
    }
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "quarterly-risk",
        })),
    )
}

/// Forecast both series and flag the quarterly risk.
///
/// Fitting is CPU-bound, so the assessment runs on the blocking pool.
pub async fn assess_quarterly_risk(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<QuarterlyRiskInput>, JsonRejection>,
) -> Result<(StatusCode, Json<RiskReport>)> {
    let Json(input) = payload?;

    let report = tokio::task::spawn_blocking(move || state.assessor.assess_report(&input))
        .await
        .map_err(|e| RiskError::Internal {
            message: format!("assessment task failed: {}", e),
        })??;

    Ok((StatusCode::OK, Json(report)))
}
