use crate::config::AssessmentConfig;
use crate::core::arima::{ArimaEstimator, FittedArima};
use crate::core::volatility;
use crate::domain::model::{
    ArimaOrder, ModelSummary, QuarterlyRiskInput, RiskAssessment, RiskReport, SeriesKind,
    TimeSeries,
};
use crate::domain::ports::ConfigProvider;
use crate::domain::quarter::Quarter;
use crate::utils::error::{Result, RiskError};
use crate::utils::validation::{validate_finite_sequence, validate_length};
use chrono::Utc;

/// Number of quarters forecast past the last observation.
pub const FORECAST_HORIZON: usize = 2;

/// Decimal places of the reported risk score.
pub const RISK_SCORE_DECIMALS: u32 = 3;

/// Forecasts both series and scores their volatility. Holds only policy
/// constants, so one instance can serve concurrent requests.
#[derive(Debug, Clone, PartialEq)]
pub struct QuarterlyRiskAssessor {
    order: ArimaOrder,
    penalty_weight: f64,
    late_weight: f64,
    risk_threshold: f64,
}

impl QuarterlyRiskAssessor {
    pub fn new<C: ConfigProvider>(config: &C) -> Self {
        Self {
            order: config.arima_order(),
            penalty_weight: config.penalty_weight(),
            late_weight: config.late_weight(),
            risk_threshold: config.risk_threshold(),
        }
    }

    /// Wire-level result of [`assess`](Self::assess).
    pub fn assess_report(&self, input: &QuarterlyRiskInput) -> Result<RiskReport> {
        self.assess(input).map(RiskAssessment::into_report)
    }

    pub fn assess(&self, input: &QuarterlyRiskInput) -> Result<RiskAssessment> {
        let (penalty, late_pct) = align(input)?;

        if !penalty.is_chronological() {
            tracing::warn!(
                quarters = ?input.quarters,
                "Quarters are not strictly increasing; trend interpretation is undefined"
            );
        }

        let penalty_model = self.fit(&penalty)?;
        let late_model = self.fit(&late_pct)?;

        let penalty_forecast = forecast_pair(&penalty_model)?;
        let late_forecast = forecast_pair(&late_model)?;

        let penalty_volatility = series_volatility(&penalty)?;
        let late_pct_volatility = series_volatility(&late_pct)?;

        let raw_risk_score = volatility::composite_score(
            penalty_volatility,
            late_pct_volatility,
            self.penalty_weight,
            self.late_weight,
        );
        if !raw_risk_score.is_finite() {
            // Each volatility is finite; only the weighted sum overflowed.
            let dominant = if self.penalty_weight * penalty_volatility
                >= self.late_weight * late_pct_volatility
            {
                &penalty
            } else {
                &late_pct
            };
            return Err(RiskError::DegenerateVolatilityError {
                series: dominant.kind,
                observations: volatility::percent_changes(&dominant.values).len(),
            });
        }
        let risk_flag = volatility::exceeds_threshold(raw_risk_score, self.risk_threshold);
        let risk_score = volatility::round_to(raw_risk_score, RISK_SCORE_DECIMALS);

        let forecast_quarters = penalty
            .last_quarter()
            .map(|last| {
                std::iter::successors(Some(last.next()), |q| Some(q.next()))
                    .take(FORECAST_HORIZON)
                    .collect::<Vec<Quarter>>()
            })
            .unwrap_or_default();

        tracing::info!(
            quarters = penalty.values.len(),
            order = %self.order,
            penalty_volatility,
            late_pct_volatility,
            risk_score,
            risk_flag,
            "Quarterly risk assessed"
        );

        Ok(RiskAssessment {
            report: RiskReport {
                penalty_forecast_next_2_quarters: penalty_forecast,
                late_pct_forecast_next_2_quarters: late_forecast,
                risk_score,
                risk_flag,
            },
            raw_risk_score,
            penalty_volatility,
            late_pct_volatility,
            forecast_quarters,
            penalty_model: summarize(penalty.kind, &penalty_model),
            late_pct_model: summarize(late_pct.kind, &late_model),
            generated_at: Utc::now(),
        })
    }

    fn fit(&self, series: &TimeSeries) -> Result<FittedArima> {
        ArimaEstimator::new(self.order)
            .fit(&series.values)
            .map_err(|source| {
                tracing::debug!(series = %series.kind, error = %source, "Model fitting failed");
                RiskError::FittingError {
                    series: series.kind,
                    source,
                }
            })
    }
}

impl Default for QuarterlyRiskAssessor {
    fn default() -> Self {
        Self::new(&AssessmentConfig::default())
    }
}

/// Validates the payload and builds both quarter-indexed series.
pub fn align(input: &QuarterlyRiskInput) -> Result<(TimeSeries, TimeSeries)> {
    let n = input.quarters.len();
    if n == 0 {
        return Err(RiskError::validation(
            "quarters",
            "at least one quarter is required",
        ));
    }
    validate_length(SeriesKind::Penalty.field_name(), input.penalty_per_year.len(), n)?;
    validate_length(SeriesKind::LatePct.field_name(), input.percent_returns_late.len(), n)?;

    let index = input
        .quarters
        .iter()
        .enumerate()
        .map(|(i, label)| {
            label
                .parse::<Quarter>()
                .map_err(|e| RiskError::validation_at("quarters", i, e.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;

    validate_finite_sequence(SeriesKind::Penalty.field_name(), &input.penalty_per_year)?;
    validate_finite_sequence(SeriesKind::LatePct.field_name(), &input.percent_returns_late)?;

    if let Some(i) = input.penalty_per_year.iter().position(|v| *v < 0.0) {
        return Err(RiskError::validation_at(
            SeriesKind::Penalty.field_name(),
            i,
            format!("penalty must be non-negative, got {}", input.penalty_per_year[i]),
        ));
    }

    let penalty = TimeSeries {
        kind: SeriesKind::Penalty,
        index: index.clone(),
        values: input.penalty_per_year.clone(),
    };
    let late_pct = TimeSeries {
        kind: SeriesKind::LatePct,
        index,
        values: input.percent_returns_late.clone(),
    };
    Ok((penalty, late_pct))
}

fn forecast_pair(model: &FittedArima) -> Result<[f64; FORECAST_HORIZON]> {
    model
        .forecast(FORECAST_HORIZON)
        .try_into()
        .map_err(|values: Vec<f64>| RiskError::Internal {
            message: format!(
                "expected {} forecast values, got {}",
                FORECAST_HORIZON,
                values.len()
            ),
        })
}

fn series_volatility(series: &TimeSeries) -> Result<f64> {
    volatility::volatility(&series.values).map_err(|observations| {
        RiskError::DegenerateVolatilityError {
            series: series.kind,
            observations,
        }
    })
}

fn summarize(series: SeriesKind, model: &FittedArima) -> ModelSummary {
    ModelSummary {
        series,
        order: model.order,
        ar: model.ar.clone(),
        ma: model.ma.clone(),
        sigma2: model.sigma2,
        log_likelihood: model.log_likelihood,
        iterations: model.iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(quarters: &[&str], penalty: &[f64], late: &[f64]) -> QuarterlyRiskInput {
        QuarterlyRiskInput {
            quarters: quarters.iter().map(|q| q.to_string()).collect(),
            penalty_per_year: penalty.to_vec(),
            percent_returns_late: late.to_vec(),
        }
    }

    #[test]
    fn test_align_rejects_empty_input() {
        let err = align(&input(&[], &[], &[])).unwrap_err();
        assert!(matches!(err, RiskError::ValidationError { ref field, .. } if field == "quarters"));
    }

    #[test]
    fn test_align_rejects_length_mismatch() {
        let err = align(&input(
            &["2023-Q1", "2023-Q2", "2023-Q3", "2023-Q4"],
            &[1.0, 2.0, 3.0],
            &[1.0, 2.0, 3.0, 4.0],
        ))
        .unwrap_err();
        assert!(
            matches!(err, RiskError::ValidationError { ref field, index: None, .. } if field == "penalty_per_year")
        );
    }

    #[test]
    fn test_align_reports_bad_quarter_index() {
        let err = align(&input(
            &["2023-Q1", "2023-Q7", "2023-Q3"],
            &[1.0, 2.0, 3.0],
            &[1.0, 2.0, 3.0],
        ))
        .unwrap_err();
        assert!(
            matches!(err, RiskError::ValidationError { ref field, index: Some(1), .. } if field == "quarters")
        );
    }

    #[test]
    fn test_align_rejects_negative_penalty() {
        let err = align(&input(&["2023-Q1", "2023-Q2"], &[10.0, -1.0], &[1.0, 2.0])).unwrap_err();
        assert!(
            matches!(err, RiskError::ValidationError { ref field, index: Some(1), .. } if field == "penalty_per_year")
        );
    }

    #[test]
    fn test_align_rejects_nan() {
        let err = align(&input(&["2023-Q1", "2023-Q2"], &[10.0, 11.0], &[f64::NAN, 2.0])).unwrap_err();
        assert!(
            matches!(err, RiskError::ValidationError { ref field, index: Some(0), .. } if field == "percent_returns_late")
        );
    }

    #[test]
    fn test_two_quarters_fail_in_fitting() {
        let assessor = QuarterlyRiskAssessor::default();
        let err = assessor
            .assess(&input(&["2023-Q1", "2023-Q2"], &[100.0, 110.0], &[2.0, 2.1]))
            .unwrap_err();
        assert!(matches!(
            err,
            RiskError::FittingError {
                series: SeriesKind::Penalty,
                source: crate::core::arima::FitError::InsufficientData { observations: 2, required: 4 }
            }
        ));
    }

    #[test]
    fn test_zero_penalties_are_degenerate() {
        let assessor = QuarterlyRiskAssessor::default();
        let err = assessor
            .assess(&input(
                &["2023-Q1", "2023-Q2", "2023-Q3", "2023-Q4"],
                &[0.0, 0.0, 0.0, 100.0],
                &[5.0, 6.2, 4.8, 7.1],
            ))
            .unwrap_err();
        assert!(matches!(
            err,
            RiskError::DegenerateVolatilityError {
                series: SeriesKind::Penalty,
                observations: 0
            }
        ));
    }

    #[test]
    fn test_forecast_quarters_follow_last_label() {
        let assessor = QuarterlyRiskAssessor::default();
        let assessment = assessor
            .assess(&input(
                &["2023-Q2", "2023-Q3", "2023-Q4", "2024-Q1", "2024-Q2"],
                &[1000.0, 1100.0, 1050.0, 1300.0, 1250.0],
                &[5.0, 5.5, 5.2, 6.0, 5.8],
            ))
            .unwrap();
        let labels: Vec<String> = assessment
            .forecast_quarters
            .iter()
            .map(|q| q.to_string())
            .collect();
        assert_eq!(labels, vec!["2024-Q3", "2024-Q4"]);
        assert_eq!(assessment.penalty_model.series, SeriesKind::Penalty);
        assert_eq!(assessment.late_pct_model.order, ArimaOrder::new(1, 1, 1));
    }

    #[test]
    fn test_flag_uses_unrounded_score() {
        let config = AssessmentConfig {
            arima_order: ArimaOrder::new(0, 1, 0),
            penalty_weight: 1.0,
            late_weight: 0.0,
            risk_threshold: 0.1412,
        };
        let assessment = QuarterlyRiskAssessor::new(&config)
            .assess(&input(
                &["2023-Q1", "2023-Q2", "2023-Q3"],
                &[100.0, 110.0, 99.0],
                &[5.0, 5.0, 5.0],
            ))
            .unwrap();

        // sqrt(0.02) = 0.14142.. is above the threshold, its rounding is not.
        assert!(assessment.raw_risk_score > config.risk_threshold);
        assert_eq!(assessment.report.risk_score, 0.141);
        assert!(assessment.report.risk_flag);
    }

    #[test]
    fn test_overflowing_score_is_degenerate() {
        let config = AssessmentConfig {
            arima_order: ArimaOrder::new(0, 1, 0),
            penalty_weight: 1e300,
            late_weight: 0.4,
            risk_threshold: 0.25,
        };
        let err = QuarterlyRiskAssessor::new(&config)
            .assess(&input(
                &["2023-Q1", "2023-Q2", "2023-Q3", "2023-Q4", "2024-Q1"],
                &[1e-160, 1.0, 1e-160, 1.0, 1e-160],
                &[5.0, 5.5, 5.2, 6.0, 5.8],
            ))
            .unwrap_err();
        assert!(matches!(
            err,
            RiskError::DegenerateVolatilityError {
                series: SeriesKind::Penalty,
                observations: 4
            }
        ));
    }

    #[test]
    fn test_huge_relative_changes_keep_score_finite() {
        let report = QuarterlyRiskAssessor::default()
            .assess_report(&input(
                &["2023-Q1", "2023-Q2", "2023-Q3", "2023-Q4", "2024-Q1"],
                &[1e-160, 1.0, 1e-160, 1.0, 1e-160],
                &[5.0, 5.5, 5.2, 6.0, 5.8],
            ))
            .unwrap();
        assert!(report.risk_score.is_finite());
        assert!(report.risk_flag);

        let wire = serde_json::to_value(&report).unwrap();
        assert!(wire["risk_score"].is_f64());
    }

    #[test]
    fn test_unordered_and_duplicate_quarters_are_used_as_given() {
        let assessment = QuarterlyRiskAssessor::default()
            .assess(&input(
                &["2024-Q1", "2023-Q2", "2023-Q2", "2023-Q3", "2023-Q4"],
                &[1000.0, 1100.0, 1050.0, 1300.0, 1250.0],
                &[5.0, 5.5, 5.2, 6.0, 5.8],
            ))
            .unwrap();
        let labels: Vec<String> = assessment
            .forecast_quarters
            .iter()
            .map(|q| q.to_string())
            .collect();
        assert_eq!(labels, vec!["2024-Q1", "2024-Q2"]);
        assert!(assessment.report.risk_score >= 0.0);
    }

    #[test]
    fn test_custom_threshold_and_weights() {
        let config = AssessmentConfig {
            arima_order: ArimaOrder::new(0, 1, 0),
            penalty_weight: 1.0,
            late_weight: 0.0,
            risk_threshold: 0.0,
        };
        let assessor = QuarterlyRiskAssessor::new(&config);
        let assessment = assessor
            .assess(&input(
                &["2023-Q1", "2023-Q2", "2023-Q3"],
                &[100.0, 110.0, 99.0],
                &[5.0, 5.0, 5.0],
            ))
            .unwrap();

        let expected = volatility::volatility(&[100.0, 110.0, 99.0]).unwrap();
        assert!((assessment.raw_risk_score - expected).abs() < 1e-12);
        assert!(assessment.report.risk_flag);
        // Random walk forecasts repeat the last value.
        assert_eq!(assessment.report.penalty_forecast_next_2_quarters, [99.0, 99.0]);
    }
}
