//! Series transforms shared by the model families.

/// Min-max scale into `[0, 1]`, returning `(scaled, min, max)`.
///
/// A constant series maps to 0.5 everywhere.
pub fn normalize(data: &[f64]) -> (Vec<f64>, f64, f64) {
    if data.is_empty() {
        return (Vec::new(), 0.0, 1.0);
    }

    let min = data.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    if range.abs() < 1e-10 {
        return (vec![0.5; data.len()], min, max);
    }

    let normalized: Vec<f64> = data.iter().map(|x| (x - min) / range).collect();

    (normalized, min, max)
}

/// Undo [`normalize`].
pub fn denormalize(data: &[f64], min: f64, max: f64) -> Vec<f64> {
    let range = max - min;
    data.iter().map(|x| x * range + min).collect()
}

/// Apply `order` rounds of first differencing.
pub fn difference(data: &[f64], order: usize) -> Vec<f64> {
    let mut result = data.to_vec();
    for _ in 0..order {
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Last value of the series at each differencing level `0..order`.
pub fn difference_tails(data: &[f64], order: usize) -> Vec<f64> {
    (0..order)
        .filter_map(|level| difference(data, level).last().copied())
        .collect()
}

/// Integrate forecasts of a differenced series back to the original scale.
pub fn undifference(forecasts: &[f64], tails: &[f64]) -> Vec<f64> {
    let mut result = forecasts.to_vec();
    for &last in tails.iter().rev() {
        let mut level = last;
        for value in result.iter_mut() {
            level += *value;
            *value = level;
        }
    }
    result
}
