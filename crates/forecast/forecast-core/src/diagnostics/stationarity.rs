//! Augmented Dickey-Fuller unit-root test with a constant term.
//!
//! The lag order is chosen by AIC over a common sample, then the regression is
//! refit on all usable rows. P-values use MacKinnon's (1994) response-surface
//! approximation for a single series with a constant.

use forecast_spi::Capabilities;
use serde::{Deserialize, Serialize};

use crate::math::linalg::LeastSquares;
use crate::math::stats::normal_cdf;

/// Series shorter than this are treated as non-stationary
pub const MIN_STATIONARITY_SAMPLES: usize = 10;

/// Reject the unit root below this p-value
pub const STATIONARITY_P_VALUE: f64 = 0.05;

const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

/// Outcome of an ADF test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdfResult {
    pub statistic: f64,
    pub p_value: f64,
    pub used_lag: usize,
    pub observations: usize,
}

/// "Stationary" iff the test is available, `n >= 10` and `p < 0.05`.
pub fn is_stationary(data: &[f64], capabilities: &Capabilities) -> bool {
    if !capabilities.has_stationarity_test() || data.len() < MIN_STATIONARITY_SAMPLES {
        return false;
    }
    adf_test(data)
        .map(|r| r.p_value < STATIONARITY_P_VALUE)
        .unwrap_or(false)
}

/// Run the test; `None` when the regression cannot be estimated.
pub fn adf_test(data: &[f64]) -> Option<AdfResult> {
    let nobs = data.len();
    if nobs < 4 {
        return None;
    }

    let schwert = (12.0 * (nobs as f64 / 100.0).powf(0.25)).ceil() as usize;
    let max_lag = schwert.min((nobs / 2).checked_sub(2)?);

    let diff: Vec<f64> = data.windows(2).map(|w| w[1] - w[0]).collect();

    // Lag selection on the common sample that the largest lag allows
    let mut best: Option<(f64, usize)> = None;
    for lag in 0..=max_lag {
        let Some(fit) = regression(data, &diff, lag, max_lag) else {
            continue;
        };
        let n = fit.observations as f64;
        let k = fit.coefficients.len() as f64;
        let aic = n * (fit.rss.max(1e-300) / n).ln() + 2.0 * k;
        if best.map(|(b, _)| aic < b).unwrap_or(true) {
            best = Some((aic, lag));
        }
    }
    let (_, used_lag) = best?;

    let fit = regression(data, &diff, used_lag, used_lag)?;
    let se = fit.standard_error(1)?;
    let statistic = fit.coefficients[1] / se;
    if !statistic.is_finite() {
        return None;
    }

    Some(AdfResult {
        statistic,
        p_value: mackinnon_p_value(statistic),
        used_lag,
        observations: fit.observations,
    })
}

/// `diff[t] ~ 1 + level[t] + diff[t-1] + ... + diff[t-lag]`, rows starting at `start`.
fn regression(data: &[f64], diff: &[f64], lag: usize, start: usize) -> Option<LeastSquares> {
    let mut rows = Vec::new();
    let mut y = Vec::new();
    for t in start..diff.len() {
        let mut row = Vec::with_capacity(lag + 2);
        row.push(1.0);
        row.push(data[t]);
        for i in 1..=lag {
            row.push(diff[t - i]);
        }
        rows.push(row);
        y.push(diff[t]);
    }
    if rows.len() <= lag + 2 {
        return None;
    }
    LeastSquares::fit(&rows, &y)
}

/// Approximate p-value of the ADF statistic (constant, one series)
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }
    let coefficients: &[f64] = if statistic <= TAU_STAR { &SMALL_P } else { &LARGE_P };
    let z = coefficients
        .iter()
        .rev()
        .fold(0.0, |acc, &c| acc * statistic + c);
    normal_cdf(z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn white_noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
    }

    fn random_walk(n: usize, seed: u64) -> Vec<f64> {
        let mut level = 0.0;
        white_noise(n, seed)
            .into_iter()
            .map(|e| {
                level += e;
                level
            })
            .collect()
    }

    #[test]
    fn test_white_noise_is_stationary() {
        let data = white_noise(200, 7);
        let result = adf_test(&data).unwrap();
        assert!(result.p_value < 0.05, "p = {}", result.p_value);
        assert!(is_stationary(&data, &Capabilities::all()));
    }

    #[test]
    fn test_random_walks_are_mostly_not_stationary() {
        // Under the unit-root null about 5% of walks are rejected by chance
        let caps = Capabilities::all();
        let non_stationary = (0..20u64)
            .filter(|&seed| !is_stationary(&random_walk(100, seed), &caps))
            .count();
        assert!(non_stationary >= 15, "only {} of 20 walks kept the unit root", non_stationary);
    }

    #[test]
    fn test_short_series_conservatively_non_stationary() {
        let data = white_noise(9, 3);
        assert!(!is_stationary(&data, &Capabilities::all()));
    }

    #[test]
    fn test_missing_backend_conservatively_non_stationary() {
        let data = white_noise(200, 7);
        let caps = Capabilities::all().with_stationarity_test(false);
        assert!(!is_stationary(&data, &caps));
    }

    #[test]
    fn test_constant_series_has_no_test() {
        assert!(adf_test(&[1.0; 40]).is_none());
        assert!(!is_stationary(&[1.0; 40], &Capabilities::all()));
    }

    #[test]
    fn test_mackinnon_p_value_shape() {
        assert_eq!(mackinnon_p_value(3.0), 1.0);
        assert_eq!(mackinnon_p_value(-20.0), 0.0);
        // 5% critical value for the constant-only case is about -2.86
        let p = mackinnon_p_value(-2.86);
        assert!((p - 0.05).abs() < 0.01, "p = {}", p);
        assert!(mackinnon_p_value(-4.0) < mackinnon_p_value(-2.0));
    }
}
