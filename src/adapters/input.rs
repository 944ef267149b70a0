use crate::domain::model::QuarterlyRiskInput;
use crate::utils::error::{Result, RiskError};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// One CSV row: `quarter,penalty_per_year,percent_returns_late`.
#[derive(Debug, Deserialize)]
struct QuarterRow {
    quarter: String,
    penalty_per_year: f64,
    percent_returns_late: f64,
}

/// Reads an assessment request from a `.json` or `.csv` file.
pub fn load_input<P: AsRef<Path>>(path: P) -> Result<QuarterlyRiskInput> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    tracing::debug!("Loading assessment input from {}", path.display());

    match extension.as_deref() {
        Some("json") => from_json_reader(std::fs::File::open(path)?),
        Some("csv") => from_csv_reader(std::fs::File::open(path)?),
        _ => Err(RiskError::InvalidConfigValueError {
            field: "input".to_string(),
            value: path.display().to_string(),
            reason: "Unsupported file extension. Allowed extensions: json, csv".to_string(),
        }),
    }
}

pub fn from_json_reader<R: Read>(reader: R) -> Result<QuarterlyRiskInput> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn from_csv_reader<R: Read>(reader: R) -> Result<QuarterlyRiskInput> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut input = QuarterlyRiskInput {
        quarters: Vec::new(),
        penalty_per_year: Vec::new(),
        percent_returns_late: Vec::new(),
    };

    for row in csv_reader.deserialize() {
        let row: QuarterRow = row?;
        input.quarters.push(row.quarter);
        input.penalty_per_year.push(row.penalty_per_year);
        input.percent_returns_late.push(row.percent_returns_late);
    }

    Ok(input)
}
