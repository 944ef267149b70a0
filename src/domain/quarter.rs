use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

// 2023-Q1, 2023Q1, 2023 Q1, Q1-2023, Q1 2023
static QUARTER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:(\d{4})\s*-?\s*Q([1-4])|Q([1-4])\s*-?\s*(\d{4}))\s*$")
        .expect("quarter pattern is a valid regex")
});

/// A calendar quarter such as `2023-Q1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Quarter {
    year: i32,
    quarter: u8,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unparseable quarter label `{label}` (expected a form like 2023-Q1)")]
pub struct ParseQuarterError {
    pub label: String,
}

impl Quarter {
    pub fn new(year: i32, quarter: u8) -> Option<Self> {
        (1..=4).contains(&quarter).then_some(Self { year, quarter })
    }

    pub fn next(&self) -> Self {
        if self.quarter == 4 {
            Self {
                year: self.year + 1,
                quarter: 1,
            }
        } else {
            Self {
                year: self.year,
                quarter: self.quarter + 1,
            }
        }
    }
}

impl FromStr for Quarter {
    type Err = ParseQuarterError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let err = || ParseQuarterError {
            label: label.to_string(),
        };

        let caps = QUARTER_PATTERN.captures(label).ok_or_else(err)?;
        let (year, quarter) = match (caps.get(1), caps.get(2), caps.get(3), caps.get(4)) {
            (Some(y), Some(q), _, _) | (_, _, Some(q), Some(y)) => (y.as_str(), q.as_str()),
            _ => return Err(err()),
        };

        let year: i32 = year.parse().map_err(|_| err())?;
        let quarter: u8 = quarter.parse().map_err(|_| err())?;
        Quarter::new(year, quarter).ok_or_else(err)
    }
}

impl TryFrom<String> for Quarter {
    type Error = ParseQuarterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Quarter> for String {
    fn from(value: Quarter) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-Q{}", self.year, self.quarter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepted_forms() {
        let expected = Quarter::new(2023, 1).unwrap();
        for label in ["2023-Q1", "2023Q1", "2023 Q1", "2023q1", "Q1-2023", "Q1 2023", " 2023-Q1 "] {
            assert_eq!(label.parse::<Quarter>().unwrap(), expected, "label {label:?}");
        }
    }

    #[test]
    fn test_parse_rejects_invalid_labels() {
        for label in ["", "2023-Q5", "2023-Q0", "2023", "Q3", "23-Q1", "2023-03-31", "2023-Q1-Q2"] {
            assert!(label.parse::<Quarter>().is_err(), "label {label:?}");
        }
    }

    #[test]
    fn test_ordering_and_next() {
        let q4 = Quarter::new(2023, 4).unwrap();
        let q1 = q4.next();
        assert_eq!(q1, Quarter::new(2024, 1).unwrap());
        assert!(q4 < q1);
        assert_eq!(q1.next().to_string(), "2024-Q2");
    }

    #[test]
    fn test_serde_as_label() {
        let q: Quarter = serde_json::from_str("\"2024Q2\"").unwrap();
        assert_eq!(serde_json::to_string(&q).unwrap(), "\"2024-Q2\"");
        assert!(serde_json::from_str::<Quarter>("\"2024-Q9\"").is_err());
    }
}
