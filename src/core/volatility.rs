/// Period-over-period relative changes `(x[t] - x[t-1]) / x[t-1]`.
///
/// Changes that are not finite (the preceding value is zero) are dropped.
pub fn percent_changes(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| (w[1] - w[0]) / w[0])
        .filter(|change| change.is_finite())
        .collect()
}

/// Sample standard deviation (n - 1 denominator); `None` below two values.
///
/// Values are scaled by their largest magnitude first so squaring cannot
/// overflow.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }

    let scale = values.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    if scale == 0.0 {
        return Some(0.0);
    }

    let n = values.len() as f64;
    let mean = values.iter().map(|v| v / scale).sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|v| (v / scale - mean).powi(2))
        .sum::<f64>()
        / (n - 1.0);
    Some(variance.sqrt() * scale)
}

/// Volatility of a series.
///
/// On failure returns the number of usable changes: fewer than two, or a
/// spread too large to represent.
pub fn volatility(values: &[f64]) -> Result<f64, usize> {
    let changes = percent_changes(values);
    sample_std_dev(&changes)
        .filter(|std| std.is_finite())
        .ok_or(changes.len())
}

pub fn composite_score(
    penalty_volatility: f64,
    late_volatility: f64,
    penalty_weight: f64,
    late_weight: f64,
) -> f64 {
    penalty_weight * penalty_volatility + late_weight * late_volatility
}

/// Rounds to `decimals` places using the exact decimal value of `value`,
/// ties to even. `0.0055` is stored just below the tie and becomes `0.005`.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    format!("{:.*}", decimals as usize, value)
        .parse()
        .unwrap_or(value)
}

/// Strict comparison: a score equal to the threshold is not flagged.
pub fn exceeds_threshold(score: f64, threshold: f64) -> bool {
    score > threshold
}
