use crate::core::arima::FitError;
use crate::domain::model::SeriesKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Validation failed for `{field}`{}: {reason}", at_index(.index))]
    ValidationError {
        field: String,
        index: Option<usize>,
        reason: String,
    },

    #[error("Model fitting failed for {series} series: {source}")]
    FittingError {
        series: SeriesKind,
        #[source]
        source: FitError,
    },

    #[error("Volatility is undefined for {series} series ({observations} usable percentage change(s); at least 2 with a finite spread are needed)")]
    DegenerateVolatilityError {
        series: SeriesKind,
        observations: usize,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid configuration value for {field}: {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

pub type Result<T> = std::result::Result<T, RiskError>;

fn at_index(index: &Option<usize>) -> String {
    index.map(|i| format!(" at index {}", i)).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Model,
    Scoring,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl RiskError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        RiskError::ValidationError {
            field: field.into(),
            index: None,
            reason: reason.into(),
        }
    }

    pub fn validation_at(field: impl Into<String>, index: usize, reason: impl Into<String>) -> Self {
        RiskError::ValidationError {
            field: field.into(),
            index: Some(index),
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            RiskError::ValidationError { .. }
            | RiskError::SerializationError(_)
            | RiskError::CsvError(_) => ErrorCategory::Input,
            RiskError::FittingError { .. } => ErrorCategory::Model,
            RiskError::DegenerateVolatilityError { .. } => ErrorCategory::Scoring,
            RiskError::ConfigError { .. } | RiskError::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            RiskError::IoError(_) | RiskError::Internal { .. } => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::Model | ErrorCategory::Scoring => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Stable machine-readable code used in HTTP error bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            RiskError::ValidationError { .. }
            | RiskError::SerializationError(_)
            | RiskError::CsvError(_) => "validation_error",
            RiskError::FittingError { .. } => "fitting_error",
            RiskError::DegenerateVolatilityError { .. } => "degenerate_volatility",
            RiskError::ConfigError { .. } | RiskError::InvalidConfigValueError { .. } => {
                "config_error"
            }
            RiskError::IoError(_) | RiskError::Internal { .. } => "internal_error",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            RiskError::ValidationError { .. } => format!("輸入資料無效: {}", self),
            RiskError::FittingError { series, .. } => {
                format!("無法為 {} 序列建立預測模型: {}", series, self)
            }
            RiskError::DegenerateVolatilityError { series, .. } => {
                format!("{} 序列的波動度無法計算: {}", series, self)
            }
            RiskError::ConfigError { .. } | RiskError::InvalidConfigValueError { .. } => {
                format!("配置錯誤: {}", self)
            }
            RiskError::IoError(e) => format!("檔案讀寫失敗: {}", e),
            RiskError::SerializationError(e) => format!("JSON 格式錯誤: {}", e),
            RiskError::CsvError(e) => format!("CSV 格式錯誤: {}", e),
            RiskError::Internal { message } => format!("內部錯誤: {}", message),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            RiskError::ValidationError { .. } => {
                "Check that every quarter label looks like 2023-Q1 and that all three sequences have the same length"
            }
            RiskError::FittingError { .. } => {
                "Provide more quarters of history (at least p + d + q + 1 observations)"
            }
            RiskError::DegenerateVolatilityError { .. } => {
                "Provide at least three quarters with non-zero preceding values"
            }
            RiskError::ConfigError { .. } | RiskError::InvalidConfigValueError { .. } => {
                "Review the configuration file and command-line overrides"
            }
            RiskError::IoError(_) => "Check the file path and permissions",
            RiskError::SerializationError(_) | RiskError::CsvError(_) => {
                "Check the input file format"
            }
            RiskError::Internal { .. } => "Retry the request; report the issue if it persists",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_includes_index() {
        let err = RiskError::validation_at("quarters", 2, "unparseable quarter label `2023-Q5`");
        let text = err.to_string();
        assert!(text.contains("`quarters` at index 2"));
        assert!(text.contains("2023-Q5"));

        let err = RiskError::validation("penalty_per_year", "length mismatch");
        assert_eq!(
            err.to_string(),
            "Validation failed for `penalty_per_year`: length mismatch"
        );
    }

    #[test]
    fn test_error_kinds_are_distinct() {
        let fitting = RiskError::FittingError {
            series: SeriesKind::Penalty,
            source: FitError::InsufficientData {
                observations: 2,
                required: 4,
            },
        };
        let degenerate = RiskError::DegenerateVolatilityError {
            series: SeriesKind::LatePct,
            observations: 1,
        };

        assert_eq!(fitting.category(), ErrorCategory::Model);
        assert_eq!(degenerate.category(), ErrorCategory::Scoring);
        assert_ne!(fitting.error_code(), degenerate.error_code());
        assert!(fitting.to_string().contains("penalty"));
        assert!(degenerate.to_string().contains("late_pct"));
    }

    #[test]
    fn test_severity_ordering() {
        let input = RiskError::validation("quarters", "empty");
        let config = RiskError::ConfigError {
            message: "bad".to_string(),
        };
        assert_eq!(input.severity(), ErrorSeverity::High);
        assert!(config.severity() > input.severity());
    }
}
