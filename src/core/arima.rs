//! ARIMA(p, d, q) estimation by exact maximum likelihood.
//!
//! The series is differenced `d` times and the result is treated as a
//! zero-mean ARMA(p, q) process (the sample mean is removed first when
//! `d == 0`). The ARMA part is cast in state-space form and its Gaussian
//! likelihood is evaluated with a Kalman filter started from the stationary
//! state covariance. The innovation variance is concentrated out, so the
//! optimizer only searches over the p + q coefficients.
//!
//! Coefficients are searched in an unconstrained space. Each unconstrained
//! value is mapped to a partial autocorrelation in (-1, 1) and the
//! Durbin–Levinson recursion turns those into coefficients, which keeps the
//! AR part stationary and the MA part invertible everywhere in the search
//! space.
//!
//! The optimizer's box bound of ±10 on the unconstrained values caps every
//! partial autocorrelation at about ±0.995. A fitted MA coefficient therefore
//! stays strictly inside the invertible region and never lands on the unit
//! root, even for short over-differenced series whose likelihood peaks there.

use crate::core::optimizer::NelderMead;
use crate::domain::model::ArimaOrder;
use nalgebra::{DMatrix, DVector};
use thiserror::Error;

const LN_2PI: f64 = 1.837_877_066_409_345_5;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("insufficient data: {observations} observation(s), the model order needs at least {required}")]
    InsufficientData { observations: usize, required: usize },

    #[error("optimizer did not converge after {iterations} iterations")]
    NonConvergence { iterations: usize },

    #[error("likelihood is not finite at the estimated parameters")]
    NonFiniteLikelihood,
}

/// A fitted model, ready to forecast past the last observation.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedArima {
    pub order: ArimaOrder,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub sigma2: f64,
    pub log_likelihood: f64,
    pub iterations: usize,
    mean: f64,
    // Last observed value of each differencing level 0..d.
    level_tails: Vec<f64>,
    // One-step-ahead predicted state after the final observation.
    state: DVector<f64>,
}

pub struct ArimaEstimator {
    order: ArimaOrder,
    optimizer: NelderMead,
}

impl ArimaEstimator {
    pub fn new(order: ArimaOrder) -> Self {
        Self {
            order,
            optimizer: NelderMead::default(),
        }
    }

    pub fn with_optimizer(mut self, optimizer: NelderMead) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn fit(&self, series: &[f64]) -> Result<FittedArima, FitError> {
        let order = self.order;
        let required = order.min_observations();
        if series.len() < required {
            return Err(FitError::InsufficientData {
                observations: series.len(),
                required,
            });
        }

        let (mut working, level_tails) = difference(series, order.d);
        let mean = if order.d == 0 {
            working.iter().sum::<f64>() / working.len() as f64
        } else {
            0.0
        };
        working.iter_mut().for_each(|w| *w -= mean);

        let objective = |params: &[f64]| {
            let (ar, ma) = constrain(params, order.p);
            match kalman_filter(&working, &ar, &ma) {
                Some(output) => -output.log_likelihood,
                None => f64::INFINITY,
            }
        };

        let start = vec![0.0; order.p + order.q];
        let minimum = self.optimizer.minimize(objective, &start);

        if !minimum.value.is_finite() {
            return Err(FitError::NonFiniteLikelihood);
        }
        if !minimum.converged {
            return Err(FitError::NonConvergence {
                iterations: minimum.iterations,
            });
        }

        let (ar, ma) = constrain(&minimum.point, order.p);
        let output = kalman_filter(&working, &ar, &ma).ok_or(FitError::NonFiniteLikelihood)?;

        tracing::debug!(
            order = %order,
            ?ar,
            ?ma,
            sigma2 = output.sigma2,
            log_likelihood = output.log_likelihood,
            iterations = minimum.iterations,
            "ARIMA model fitted"
        );

        Ok(FittedArima {
            order,
            ar,
            ma,
            sigma2: output.sigma2,
            log_likelihood: output.log_likelihood,
            iterations: minimum.iterations,
            mean,
            level_tails,
            state: output.state,
        })
    }
}

impl FittedArima {
    /// Point forecasts for the next `horizon` periods, on the original scale.
    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        let transition = Transition::new(&self.ar, &self.ma);
        let mut state = self.state.clone();
        let mut values = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            values.push(state[0] + self.mean);
            state = transition.apply(&state);
        }

        // Integrate back up through each differencing level.
        for tail in self.level_tails.iter().rev() {
            let mut running = *tail;
            for v in values.iter_mut() {
                running += *v;
                *v = running;
            }
        }
        values
    }
}

/// Differences `series` `d` times, returning the result and the last value of
/// every level before it was differenced.
fn difference(series: &[f64], d: usize) -> (Vec<f64>, Vec<f64>) {
    let mut current = series.to_vec();
    let mut tails = Vec::with_capacity(d);
    for _ in 0..d {
        if let Some(&last) = current.last() {
            tails.push(last);
        }
        current = current.windows(2).map(|w| w[1] - w[0]).collect();
    }
    (current, tails)
}

/// Maps unconstrained optimizer parameters to stationary AR and invertible MA coefficients.
pub(crate) fn constrain(params: &[f64], p: usize) -> (Vec<f64>, Vec<f64>) {
    let (ar_raw, ma_raw) = params.split_at(p);
    let ar = durbin_levinson(&to_partials(ar_raw));
    let ma = durbin_levinson(&to_partials(ma_raw))
        .into_iter()
        .map(|c| -c)
        .collect();
    (ar, ma)
}

fn to_partials(raw: &[f64]) -> Vec<f64> {
    raw.iter().map(|u| u / (1.0 + u * u).sqrt()).collect()
}

/// Coefficients of `1 - c1 L - ... - ck L^k` from partial autocorrelations in (-1, 1).
fn durbin_levinson(partials: &[f64]) -> Vec<f64> {
    let mut coefficients: Vec<f64> = Vec::with_capacity(partials.len());
    for (k, &r) in partials.iter().enumerate() {
        let previous = coefficients.clone();
        for j in 0..k {
            coefficients[j] = previous[j] - r * previous[k - 1 - j];
        }
        coefficients.push(r);
    }
    coefficients
}

/// Harvey state-space form of an ARMA(p, q) process.
struct Transition {
    // First column holds the AR coefficients, the superdiagonal is ones.
    matrix: DMatrix<f64>,
    // R R'
    noise: DMatrix<f64>,
}

impl Transition {
    fn new(ar: &[f64], ma: &[f64]) -> Self {
        let dim = ar.len().max(ma.len() + 1);
        let mut matrix = DMatrix::zeros(dim, dim);
        for (i, &phi) in ar.iter().enumerate() {
            matrix[(i, 0)] = phi;
        }
        for i in 0..dim - 1 {
            matrix[(i, i + 1)] = 1.0;
        }

        let mut loading = DVector::zeros(dim);
        loading[0] = 1.0;
        for (i, &theta) in ma.iter().enumerate() {
            loading[i + 1] = theta;
        }
        let noise = &loading * loading.transpose();

        Self { matrix, noise }
    }

    fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    fn apply(&self, state: &DVector<f64>) -> DVector<f64> {
        &self.matrix * state
    }

    /// `T P T' + R R'`
    fn propagate(&self, cov: &DMatrix<f64>) -> DMatrix<f64> {
        &self.matrix * cov * self.matrix.transpose() + &self.noise
    }

    /// Stationary covariance: solves `(I - T ⊗ T) vec(P) = vec(R R')`.
    fn stationary_covariance(&self) -> Option<DMatrix<f64>> {
        let n = self.dim();
        let system = DMatrix::identity(n * n, n * n) - self.matrix.kronecker(&self.matrix);
        let rhs = DVector::from_column_slice(self.noise.as_slice());

        let solution = system.lu().solve(&rhs)?;
        let cov = DMatrix::from_column_slice(n, n, solution.as_slice());
        let cov = (&cov + cov.transpose()) * 0.5;
        cov.iter().all(|v| v.is_finite()).then_some(cov)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FilterOutput {
    pub log_likelihood: f64,
    pub sigma2: f64,
    pub state: DVector<f64>,
}

/// Concentrated exact log-likelihood of a zero-mean ARMA process.
///
/// Returns `None` when the state covariance cannot be initialised or the
/// filter produces a non-positive prediction variance.
pub(crate) fn kalman_filter(observations: &[f64], ar: &[f64], ma: &[f64]) -> Option<FilterOutput> {
    let transition = Transition::new(ar, ma);
    let mut state = DVector::zeros(transition.dim());
    let mut cov = transition.stationary_covariance()?;

    let mut sum_scaled_sq = 0.0;
    let mut sum_log_var = 0.0;

    for &y in observations {
        let variance = cov[(0, 0)];
        if !(variance.is_finite() && variance > 0.0) {
            return None;
        }
        let innovation = y - state[0];
        sum_scaled_sq += innovation * innovation / variance;
        sum_log_var += variance.ln();

        // Measurement update; the first column of P is the gain direction.
        let gain = cov.column(0) / variance;
        state += &gain * innovation;
        let first_row = cov.row(0).into_owned();
        cov -= &gain * first_row;

        state = transition.apply(&state);
        cov = transition.propagate(&cov);
    }

    let count = observations.len() as f64;
    let sigma2 = (sum_scaled_sq / count).max(f64::MIN_POSITIVE);
    let log_likelihood = -0.5 * count * (LN_2PI + sigma2.ln() + 1.0) - 0.5 * sum_log_var;

    log_likelihood.is_finite().then_some(FilterOutput {
        log_likelihood,
        sigma2,
        state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data() {
        let estimator = ArimaEstimator::new(ArimaOrder::default());
        let err = estimator.fit(&[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(
            err,
            FitError::InsufficientData {
                observations: 3,
                required: 4
            }
        );
    }

    #[test]
    fn test_difference_keeps_level_tails() {
        let (diffed, tails) = difference(&[1.0, 4.0, 9.0, 16.0], 2);
        assert_eq!(diffed, vec![2.0, 2.0]);
        assert_eq!(tails, vec![16.0, 7.0]);
    }

    #[test]
    fn test_durbin_levinson_ar2() {
        let coefficients = durbin_levinson(&[0.5, 0.2]);
        assert!((coefficients[0] - 0.4).abs() < 1e-12);
        assert!((coefficients[1] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_constrain_stays_inside_unit_interval() {
        for u in [-50.0, -3.0, -0.1, 0.0, 0.7, 10.0, 1e6] {
            let (ar, ma) = constrain(&[u, u], 1);
            assert!(ar[0].abs() < 1.0);
            assert!(ma[0].abs() < 1.0);
        }
    }

    #[test]
    fn test_ar1_stationary_variance() {
        let transition = Transition::new(&[0.5], &[]);
        let cov = transition.stationary_covariance().unwrap();
        assert!((cov[(0, 0)] - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_arma11_stationary_variance() {
        // Var(w) = (1 + 2 phi theta + theta^2) / (1 - phi^2)
        let (phi, theta) = (0.6, 0.3);
        let transition = Transition::new(&[phi], &[theta]);
        let cov = transition.stationary_covariance().unwrap();
        let expected = (1.0 + 2.0 * phi * theta + theta * theta) / (1.0 - phi * phi);
        assert!((cov[(0, 0)] - expected).abs() < 1e-10);
    }

    #[test]
    fn test_stationary_covariance_is_fixed_point() {
        let transition = Transition::new(&[0.4, -0.3], &[0.5, 0.2]);
        let cov = transition.stationary_covariance().unwrap();
        let next = transition.propagate(&cov);
        assert_eq!(cov.nrows(), 3);
        assert!((next - &cov).amax() < 1e-10);
    }

    #[test]
    fn test_white_noise_likelihood() {
        let data = [1.0, -2.0, 0.5, 1.5];
        let output = kalman_filter(&data, &[], &[]).unwrap();
        let sigma2 = data.iter().map(|v| v * v).sum::<f64>() / 4.0;
        let expected = -0.5 * 4.0 * (LN_2PI + sigma2.ln() + 1.0);
        assert!((output.sigma2 - sigma2).abs() < 1e-12);
        assert!((output.log_likelihood - expected).abs() < 1e-10);
    }

    #[test]
    fn test_random_walk_forecasts_last_value() {
        let estimator = ArimaEstimator::new(ArimaOrder::new(0, 1, 0));
        let fitted = estimator.fit(&[3.0, 5.0, 4.0, 6.0]).unwrap();
        assert_eq!(fitted.forecast(2), vec![6.0, 6.0]);
    }

    #[test]
    fn test_second_difference_extends_linear_trend() {
        let estimator = ArimaEstimator::new(ArimaOrder::new(0, 2, 0));
        let fitted = estimator.fit(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(fitted.forecast(2), vec![6.0, 7.0]);
    }

    #[test]
    fn test_mean_model_without_differencing() {
        let estimator = ArimaEstimator::new(ArimaOrder::new(0, 0, 0));
        let fitted = estimator.fit(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(fitted.forecast(2), vec![2.0, 2.0]);
    }

    #[test]
    fn test_constant_series_forecasts_constant() {
        let estimator = ArimaEstimator::new(ArimaOrder::default());
        let fitted = estimator.fit(&[5.0; 8]).unwrap();
        assert_eq!(fitted.forecast(2), vec![5.0, 5.0]);
    }

    #[test]
    fn test_arima111_fit_is_deterministic_and_finite() {
        let series = [1000.0, 1100.0, 1050.0, 1300.0, 1250.0, 1400.0, 1380.0, 1500.0];
        let estimator = ArimaEstimator::new(ArimaOrder::default());
        let a = estimator.fit(&series).unwrap();
        let b = estimator.fit(&series).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.ar.len(), 1);
        assert_eq!(a.ma.len(), 1);
        assert!(a.ar[0].abs() < 1.0);
        assert!(a.ma[0].abs() < 1.0);
        assert!(a.sigma2 > 0.0);

        let forecast = a.forecast(2);
        assert_eq!(forecast.len(), 2);
        assert!(forecast.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_minimum_sample_fits() {
        let estimator = ArimaEstimator::new(ArimaOrder::default());
        let fitted = estimator.fit(&[5.0, 6.2, 4.8, 7.1]).unwrap();
        assert!(fitted.forecast(2).iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_non_convergence_is_reported() {
        let estimator = ArimaEstimator::new(ArimaOrder::new(2, 1, 2)).with_optimizer(NelderMead {
            max_iterations: 1,
            ..NelderMead::default()
        });
        let series = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0, 5.0, 3.0];
        let err = estimator.fit(&series).unwrap_err();
        assert!(matches!(err, FitError::NonConvergence { iterations: 1 }));
    }
}
