use crate::utils::error::RiskError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
}

impl IntoResponse for RiskError {
    fn into_response(self) -> Response {
        let status = match &self {
            RiskError::ValidationError { .. }
            | RiskError::SerializationError(_)
            | RiskError::CsvError(_) => StatusCode::BAD_REQUEST,
            RiskError::FittingError { .. } | RiskError::DegenerateVolatilityError { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let (field, index, series) = match &self {
            RiskError::ValidationError { field, index, .. } => (Some(field.clone()), *index, None),
            RiskError::FittingError { series, .. }
            | RiskError::DegenerateVolatilityError { series, .. } => {
                (None, None, Some(series.to_string()))
            }
            _ => (None, None, None),
        };

        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "internal error while assessing quarterly risk".to_string()
        } else {
            tracing::warn!(error = %self, code = self.error_code(), "Request rejected");
            self.to_string()
        };

        let body = ErrorResponse {
            error: self.error_code().to_string(),
            message,
            field,
            index,
            series,
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for RiskError {
    fn from(rejection: JsonRejection) -> Self {
        RiskError::validation("body", rejection.body_text())
    }
}
