pub mod arima;
pub mod assessor;
pub mod optimizer;
pub mod volatility;

pub use crate::domain::model::{QuarterlyRiskInput, RiskAssessment, RiskReport};
pub use crate::domain::ports::ConfigProvider;
pub use crate::utils::error::Result;
pub use assessor::QuarterlyRiskAssessor;
