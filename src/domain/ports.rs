use crate::domain::model::ArimaOrder;

/// Source of the assessment policy: model order, score weights and flag threshold.
pub trait ConfigProvider: Send + Sync {
    fn arima_order(&self) -> ArimaOrder;
    fn penalty_weight(&self) -> f64;
    fn late_weight(&self) -> f64;
    fn risk_threshold(&self) -> f64;
}
