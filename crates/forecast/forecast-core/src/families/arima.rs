//! ARIMA (AutoRegressive Integrated Moving Average) forecaster
//!
//! Orders are chosen by an exhaustive, sequential grid search over
//! `p in 0..=max_p`, `d in 0..=max_d`, `q in 0..=max_q`, keeping the fit with the
//! lowest Akaike Information Criterion. Each candidate is estimated by
//! conditional sum of squares:
//!
//! - **AR only**: ordinary least squares on lagged values
//! - **with MA terms**: Hannan-Rissanen, i.e. a long autoregression (solved by
//!   Levinson-Durbin) supplies innovation estimates that enter the final
//!   regression as MA regressors
//!
//! Candidates whose AR part is non-stationary or whose MA part is
//! non-invertible are rejected like any other failed fit.

use forecast_api::ArimaConfig;
use forecast_spi::{
    ArimaFit, ConfidenceKind, FittedState, ForecastError, ForecastModel, ForecastPoint,
    ForecastResult, ModelFamily, ModelHandle, Result, TrainingDataset,
};
use tracing::{debug, info, warn};

use super::{check_predict, forecast_dates};
use crate::confidence::ForecastWithConfidence;
use crate::math::linalg::LeastSquares;
use crate::math::stats::mean;
use crate::preprocessing::{difference, difference_tails, undifference};

/// Minimum observations for the autoregressive family
pub const MIN_SAMPLES: usize = 3;

const SIGMA2_FLOOR: f64 = 1e-12;

/// Grid-searched ARIMA forecaster
#[derive(Debug, Clone, Default)]
pub struct ArimaForecaster {
    config: ArimaConfig,
}

impl ArimaForecaster {
    pub fn new(config: ArimaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ArimaConfig {
        &self.config
    }

    /// Run the grid search and return the lowest-AIC fit.
    pub fn search(&self, values: &[f64]) -> Result<ArimaFit> {
        let mut best: Option<ArimaFit> = None;
        for p in 0..=self.config.max_p {
            for d in 0..=self.config.max_d {
                for q in 0..=self.config.max_q {
                    match fit_order(values, p, d, q) {
                        Ok(fit) => {
                            if best.as_ref().map(|b| fit.aic < b.aic).unwrap_or(true) {
                                best = Some(fit);
                            }
                        }
                        Err(e) => debug!(p, d, q, error = %e, "ARIMA candidate rejected"),
                    }
                }
            }
        }

        if let Some(fit) = best {
            return Ok(fit);
        }

        let (p, d, q) = self.config.fallback_order;
        warn!(p, d, q, "every ARIMA grid candidate failed, retrying fallback order");
        fit_order(values, p, d, q).map_err(|e| {
            ForecastError::Training(format!(
                "no ARIMA order could be fit (fallback ARIMA({},{},{}): {})",
                p, d, q, e
            ))
        })
    }
}

impl ForecastModel for ArimaForecaster {
    fn family(&self) -> ModelFamily {
        ModelFamily::Autoregressive
    }

    fn train(&self, dataset: &TrainingDataset) -> Result<ModelHandle> {
        if dataset.len() < MIN_SAMPLES {
            return Err(ForecastError::InsufficientData {
                required: MIN_SAMPLES,
                actual: dataset.len(),
            });
        }
        let fit = self.search(&dataset.values())?;
        info!(
            source = dataset.source(),
            order = %format!("({},{},{})", fit.p, fit.d, fit.q),
            aic = fit.aic,
            "ARIMA order selected"
        );
        Ok(ModelHandle::trained(FittedState::Autoregressive(fit), dataset))
    }

    fn predict(&self, handle: &ModelHandle, horizon: usize) -> Result<ForecastResult> {
        check_predict(handle, ModelFamily::Autoregressive, horizon)?;
        let FittedState::Autoregressive(fit) = handle.state() else {
            return Err(ForecastError::Usage("handle does not carry an ARIMA fit".to_string()));
        };

        let dates = forecast_dates(handle, horizon)?;
        let forecast = point_forecast(fit, horizon);
        let std_errors: Vec<f64> = psi_weights(fit, horizon)
            .iter()
            .scan(0.0, |acc, psi| {
                *acc += psi * psi;
                Some((fit.sigma2 * *acc).sqrt())
            })
            .collect();
        let band = ForecastWithConfidence::from_standard_errors(
            forecast,
            &std_errors,
            self.config.interval_level,
        );

        let points = dates
            .into_iter()
            .enumerate()
            .map(|(i, timestamp)| ForecastPoint {
                timestamp,
                value: band.forecast[i],
                lower: Some(band.lower[i]),
                upper: Some(band.upper[i]),
            })
            .collect();

        Ok(ForecastResult {
            family: ModelFamily::Autoregressive,
            model_used: handle.label(),
            points,
            confidence: self.config.interval_level,
            confidence_kind: ConfidenceKind::IntervalLevel,
        })
    }
}

/// Fit one ARIMA(p, d, q) candidate.
pub fn fit_order(values: &[f64], p: usize, d: usize, q: usize) -> Result<ArimaFit> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ForecastError::InvalidData(
            "Data contains NaN or infinite values".to_string(),
        ));
    }

    let differenced = difference(values, d);
    let include_mean = d == 0;
    let mu = if include_mean { mean(&differenced) } else { 0.0 };
    let working: Vec<f64> = differenced.iter().map(|x| x - mu).collect();

    let m = working.len();
    let k = p + q + usize::from(include_mean) + 1;
    if m <= p || m - p < k {
        return Err(ForecastError::InsufficientData {
            required: p + k + d,
            actual: values.len(),
        });
    }

    let (ar, ma) = if q == 0 {
        (estimate_ar(&working, p)?, Vec::new())
    } else {
        hannan_rissanen(&working, p, q)?
    };

    if !is_stable(&ar) {
        return Err(ForecastError::Training(format!(
            "AR part of ARIMA({},{},{}) is not stationary",
            p, d, q
        )));
    }
    let ma_as_ar: Vec<f64> = ma.iter().map(|t| -t).collect();
    if !is_stable(&ma_as_ar) {
        return Err(ForecastError::Training(format!(
            "MA part of ARIMA({},{},{}) is not invertible",
            p, d, q
        )));
    }

    let residuals = css_residuals(&working, &ar, &ma);
    let effective = (m - p) as f64;
    let sigma2 = (residuals[p..].iter().map(|e| e * e).sum::<f64>() / effective).max(SIGMA2_FLOOR);
    let log_likelihood = -0.5 * effective * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0);
    let aic = 2.0 * k as f64 - 2.0 * log_likelihood;
    if !aic.is_finite() {
        return Err(ForecastError::Training(format!(
            "ARIMA({},{},{}) produced a non-finite AIC",
            p, d, q
        )));
    }

    Ok(ArimaFit {
        p,
        d,
        q,
        ar,
        ma,
        mean: mu,
        sigma2,
        aic,
        working,
        residuals,
        tails: difference_tails(values, d),
    })
}

/// AR coefficients by least squares on lagged values.
fn estimate_ar(working: &[f64], p: usize) -> Result<Vec<f64>> {
    if p == 0 {
        return Ok(Vec::new());
    }
    let rows: Vec<Vec<f64>> = (p..working.len())
        .map(|t| (1..=p).map(|i| working[t - i]).collect())
        .collect();
    let y: Vec<f64> = working[p..].to_vec();
    LeastSquares::fit(&rows, &y)
        .map(|fit| fit.coefficients)
        .ok_or_else(|| ForecastError::Training(format!("AR({}) regression is singular", p)))
}

/// Two-stage Hannan-Rissanen estimate of ARMA(p, q).
fn hannan_rissanen(working: &[f64], p: usize, q: usize) -> Result<(Vec<f64>, Vec<f64>)> {
    let m = working.len();
    let long_order = (2 * (p + q)).max(3).min(m / 2);
    if long_order == 0 {
        return Err(ForecastError::Training("series too short for MA estimation".to_string()));
    }

    let long_ar = levinson_durbin(&autocovariance(working, long_order), long_order)
        .ok_or_else(|| ForecastError::Training("long autoregression is degenerate".to_string()))?;

    let mut innovations = vec![0.0; m];
    for t in long_order..m {
        let fitted: f64 = (1..=long_order).map(|i| long_ar[i - 1] * working[t - i]).sum();
        innovations[t] = working[t] - fitted;
    }

    let start = long_order + q.max(p);
    let rows: Vec<Vec<f64>> = (start..m)
        .map(|t| {
            (1..=p)
                .map(|i| working[t - i])
                .chain((1..=q).map(|j| innovations[t - j]))
                .collect()
        })
        .collect();
    if rows.len() <= p + q {
        return Err(ForecastError::Training(format!(
            "ARMA({},{}) needs more than {} usable rows, got {}",
            p,
            q,
            p + q,
            rows.len()
        )));
    }
    let y: Vec<f64> = working[start..].to_vec();
    let fit = LeastSquares::fit(&rows, &y).ok_or_else(|| {
        ForecastError::Training(format!("ARMA({},{}) regression is singular", p, q))
    })?;

    let (ar, ma) = fit.coefficients.split_at(p);
    Ok((ar.to_vec(), ma.to_vec()))
}

/// Biased sample autocovariances at lags `0..=max_lag`.
fn autocovariance(data: &[f64], max_lag: usize) -> Vec<f64> {
    let n = data.len();
    let mu = mean(data);
    (0..=max_lag)
        .map(|k| {
            (k..n)
                .map(|i| (data[i] - mu) * (data[i - k] - mu))
                .sum::<f64>()
                / n as f64
        })
        .collect()
}

/// Solve the Yule-Walker equations for an AR(`order`) model.
fn levinson_durbin(autocov: &[f64], order: usize) -> Option<Vec<f64>> {
    if autocov.len() <= order || autocov[0].abs() < 1e-10 {
        return None;
    }

    let mut coeffs = vec![0.0; order];
    let mut error = autocov[0];
    for k in 0..order {
        let mut acc = autocov[k + 1];
        for j in 0..k {
            acc -= coeffs[j] * autocov[k - j];
        }
        if error.abs() < 1e-12 {
            break;
        }
        let reflection = acc / error;
        let previous = coeffs.clone();
        coeffs[k] = reflection;
        for j in 0..k {
            coeffs[j] = previous[j] - reflection * previous[k - 1 - j];
        }
        error *= 1.0 - reflection * reflection;
    }
    Some(coeffs)
}

/// Roots of `1 - a_1 z - ... - a_k z^k` lie outside the unit circle.
fn is_stable(a: &[f64]) -> bool {
    match a.len() {
        0 => true,
        1 => a[0].abs() < 1.0,
        2 => a[1].abs() < 1.0 && a[0] + a[1] < 1.0 && a[1] - a[0] < 1.0,
        _ => a.iter().map(|c| c.abs()).sum::<f64>() < 1.0,
    }
}

/// In-sample innovations, conditioning on the first `p` values and zero pre-sample shocks.
fn css_residuals(working: &[f64], ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let p = ar.len();
    let mut residuals = vec![0.0; working.len()];
    for t in p..working.len() {
        let mut fitted = 0.0;
        for (i, phi) in ar.iter().enumerate() {
            fitted += phi * working[t - i - 1];
        }
        for (j, theta) in ma.iter().enumerate() {
            if t > j {
                fitted += theta * residuals[t - j - 1];
            }
        }
        residuals[t] = working[t] - fitted;
    }
    residuals
}

/// Point forecasts on the original scale.
fn point_forecast(fit: &ArimaFit, horizon: usize) -> Vec<f64> {
    let n = fit.working.len();
    let mut extended = fit.working.clone();
    let mut shocks = fit.residuals.clone();

    for _ in 0..horizon {
        let len = extended.len();
        let mut forecast = 0.0;
        for (i, phi) in fit.ar.iter().enumerate() {
            if len > i {
                forecast += phi * extended[len - i - 1];
            }
        }
        for (j, theta) in fit.ma.iter().enumerate() {
            if len > j {
                forecast += theta * shocks[len - j - 1];
            }
        }
        extended.push(forecast);
        shocks.push(0.0);
    }

    let differenced: Vec<f64> = extended[n..].iter().map(|z| z + fit.mean).collect();
    undifference(&differenced, &fit.tails)
}

/// MA(infinity) weights of the integrated model, `psi_0 = 1`.
fn psi_weights(fit: &ArimaFit, horizon: usize) -> Vec<f64> {
    // phi(B) (1 - B)^d expanded as 1 - sum(phi_star_i B^i)
    let mut poly = vec![1.0];
    poly.extend(fit.ar.iter().map(|phi| -phi));
    for _ in 0..fit.d {
        let mut next = vec![0.0; poly.len() + 1];
        for (i, c) in poly.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c;
        }
        poly = next;
    }
    let phi_star: Vec<f64> = poly[1..].iter().map(|c| -c).collect();

    let mut psi = vec![1.0];
    for j in 1..horizon {
        let mut value = fit.ma.get(j - 1).copied().unwrap_or(0.0);
        for (i, phi) in phi_star.iter().enumerate() {
            if j > i {
                value += phi * psi[j - i - 1];
            }
        }
        psi.push(value);
    }
    psi
}
