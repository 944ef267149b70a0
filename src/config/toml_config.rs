use crate::domain::model::ArimaOrder;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{Result, RiskError};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MAX_AR_ORDER: usize = 5;
pub const MAX_DIFFERENCING: usize = 2;
pub const MAX_MA_ORDER: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub assessment: AssessmentConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
}

/// Policy constants of the assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentConfig {
    pub arima_order: ArimaOrder,
    pub penalty_weight: f64,
    pub late_weight: f64,
    pub risk_threshold: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: std::env::var("LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
        }
    }
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            arima_order: ArimaOrder::default(),
            penalty_weight: 0.6,
            late_weight: 0.4,
            risk_threshold: 0.25,
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RiskError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| RiskError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${LISTEN_ADDR})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| RiskError::Internal {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn listen_addr(&self) -> &str {
        &self.server.listen_addr
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_socket_addr("server.listen_addr", &self.listen_addr)
    }
}

impl Validate for AssessmentConfig {
    fn validate(&self) -> Result<()> {
        let order = self.arima_order;
        validation::validate_range("assessment.arima_order.p", order.p, 0, MAX_AR_ORDER)?;
        validation::validate_range("assessment.arima_order.d", order.d, 0, MAX_DIFFERENCING)?;
        validation::validate_range("assessment.arima_order.q", order.q, 0, MAX_MA_ORDER)?;

        validation::validate_non_negative("assessment.penalty_weight", self.penalty_weight)?;
        validation::validate_non_negative("assessment.late_weight", self.late_weight)?;
        if self.penalty_weight + self.late_weight <= 0.0 {
            return Err(RiskError::InvalidConfigValueError {
                field: "assessment.penalty_weight".to_string(),
                value: format!("{} + {}", self.penalty_weight, self.late_weight),
                reason: "At least one weight must be positive".to_string(),
            });
        }

        validation::validate_non_negative("assessment.risk_threshold", self.risk_threshold)
    }
}

impl Validate for LoggingConfig {
    fn validate(&self) -> Result<()> {
        if let Some(level) = &self.level {
            validation::validate_non_empty_string("logging.level", level)?;
            let known = ["trace", "debug", "info", "warn", "error", "off"];
            if !known.contains(&level.to_ascii_lowercase().as_str()) {
                return Err(RiskError::InvalidConfigValueError {
                    field: "logging.level".to_string(),
                    value: level.clone(),
                    reason: format!("Unknown level. Valid levels: {}", known.join(", ")),
                });
            }
        }
        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.assessment.validate()?;
        self.logging.validate()
    }
}

impl ConfigProvider for AssessmentConfig {
    fn arima_order(&self) -> ArimaOrder {
        self.arima_order
    }

    fn penalty_weight(&self) -> f64 {
        self.penalty_weight
    }

    fn late_weight(&self) -> f64 {
        self.late_weight
    }

    fn risk_threshold(&self) -> f64 {
        self.risk_threshold
    }
}

impl ConfigProvider for TomlConfig {
    fn arima_order(&self) -> ArimaOrder {
        self.assessment.arima_order
    }

    fn penalty_weight(&self) -> f64 {
        self.assessment.penalty_weight
    }

    fn late_weight(&self) -> f64 {
        self.assessment.late_weight
    }

    fn risk_threshold(&self) -> f64 {
        self.assessment.risk_threshold
    }
}
