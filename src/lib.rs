//! Quarterly tax-risk assessment: ARIMA forecasts of penalty and late-filing
//! series plus a volatility-based risk flag, served over HTTP or the CLI.

pub mod adapters;
pub mod api;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use config::{AssessmentConfig, TomlConfig};
pub use crate::core::QuarterlyRiskAssessor;
pub use domain::model::{QuarterlyRiskInput, RiskAssessment, RiskReport, SeriesKind};
pub use utils::error::{Result, RiskError};
