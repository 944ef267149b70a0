use crate::domain::quarter::Quarter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Request payload: three index-aligned sequences, one entry per quarter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterlyRiskInput {
    pub quarters: Vec<String>,
    pub penalty_per_year: Vec<f64>,
    pub percent_returns_late: Vec<f64>,
}

/// Which of the two input series a value, model or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    Penalty,
    LatePct,
}

impl SeriesKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesKind::Penalty => "penalty",
            SeriesKind::LatePct => "late_pct",
        }
    }

    /// Name of the request field the series is built from.
    pub fn field_name(&self) -> &'static str {
        match self {
            SeriesKind::Penalty => "penalty_per_year",
            SeriesKind::LatePct => "percent_returns_late",
        }
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A quarter-indexed series that lives for one assessment.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub kind: SeriesKind,
    pub index: Vec<Quarter>,
    pub values: Vec<f64>,
}

impl TimeSeries {
    /// True when every quarter is strictly after the one before it.
    pub fn is_chronological(&self) -> bool {
        self.index.windows(2).all(|w| w[0] < w[1])
    }

    pub fn last_quarter(&self) -> Option<Quarter> {
        self.index.last().copied()
    }
}

/// Order of an ARIMA(p, d, q) model, written as `[p, d, q]` in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[usize; 3]", into = "[usize; 3]")]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub const fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Observations needed so the differenced series has at least one more
    /// point than there are ARMA coefficients.
    pub fn min_observations(&self) -> usize {
        self.p + self.d + self.q + 1
    }
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

impl From<[usize; 3]> for ArimaOrder {
    fn from([p, d, q]: [usize; 3]) -> Self {
        Self { p, d, q }
    }
}

impl From<ArimaOrder> for [usize; 3] {
    fn from(order: ArimaOrder) -> Self {
        [order.p, order.d, order.q]
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// Wire response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub penalty_forecast_next_2_quarters: [f64; 2],
    pub late_pct_forecast_next_2_quarters: [f64; 2],
    pub risk_score: f64,
    pub risk_flag: bool,
}

/// Estimated parameters of one fitted series model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub series: SeriesKind,
    pub order: ArimaOrder,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub sigma2: f64,
    pub log_likelihood: f64,
    pub iterations: usize,
}

/// Full-precision result of one assessment; only `report` crosses the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub report: RiskReport,
    pub raw_risk_score: f64,
    pub penalty_volatility: f64,
    pub late_pct_volatility: f64,
    pub forecast_quarters: Vec<Quarter>,
    pub penalty_model: ModelSummary,
    pub late_pct_model: ModelSummary,
    pub generated_at: DateTime<Utc>,
}

impl RiskAssessment {
    pub fn into_report(self) -> RiskReport {
        self.report
    }
}
