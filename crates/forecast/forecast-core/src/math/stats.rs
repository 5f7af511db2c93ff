//! Descriptive statistics and the standard normal distribution.

pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population variance.
pub fn variance(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64
}

/// Pearson correlation between the series and itself shifted by `lag`.
///
/// `None` when there are fewer than two overlapping pairs or either side is constant.
pub fn lag_correlation(data: &[f64], lag: usize) -> Option<f64> {
    if lag >= data.len() || data.len() - lag < 2 {
        return None;
    }
    let head = &data[..data.len() - lag];
    let tail = &data[lag..];
    let (mh, mt) = (mean(head), mean(tail));

    let mut cov = 0.0;
    let mut var_h = 0.0;
    let mut var_t = 0.0;
    for (a, b) in head.iter().zip(tail.iter()) {
        cov += (a - mh) * (b - mt);
        var_h += (a - mh).powi(2);
        var_t += (b - mt).powi(2);
    }

    let denom = (var_h * var_t).sqrt();
    if denom < 1e-12 {
        None
    } else {
        Some(cov / denom)
    }
}

/// Error function (Abramowitz and Stegun 7.1.26, |error| < 1.5e-7).
pub fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.327_591_1 * x);
    let inner = -1.453_152_027 + t * 1.061_405_429;
    let poly = t * (0.254_829_592 + t * (-0.284_496_736 + t * (1.421_413_741 + t * inner)));
    sign * (1.0 - poly * (-x * x).exp())
}

/// Standard normal cumulative distribution function.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_variance() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(mean(&data), 2.5);
        assert_eq!(variance(&data), 1.25);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_lag_correlation_of_trend_is_one() {
        let data: Vec<f64> = (0..20).map(|x| x as f64).collect();
        let r = lag_correlation(&data, 1).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_lag_correlation_of_alternating_is_minus_one() {
        let data: Vec<f64> = (0..20).map(|x| if x % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let r = lag_correlation(&data, 1).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_lag_correlation_constant_is_none() {
        assert!(lag_correlation(&[3.0; 10], 1).is_none());
        assert!(lag_correlation(&[1.0, 2.0], 1).is_none());
    }

    #[test]
    fn test_normal_cdf_reference_points() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((normal_cdf(1.96) - 0.975).abs() < 1e-4);
        assert!((normal_cdf(-1.282) - 0.1).abs() < 1e-3);
    }
}
