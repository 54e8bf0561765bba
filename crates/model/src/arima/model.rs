//! ARIMA(p, d, q) estimated by conditional sum of squares.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use meteocast_core::{PointForecast, Signal};

use crate::arima::diff::{difference, integrate};
use crate::error::ModelError;
use crate::fitter::ForecastModel;
use crate::optimization::{nelder_mead, NelderMeadConfig};

/// Model order: AR lags, differencing rounds, MA lags.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Estimated parameters: AR + MA coefficients, mean and innovation variance.
    pub fn num_params(&self) -> usize {
        self.p + self.q + 2
    }

    /// Minimum number of observations needed to estimate this order.
    pub fn min_observations(&self) -> usize {
        self.d + self.p.max(self.q) + self.num_params() + 2
    }
}

impl core::fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// A fitted ARIMA model. Immutable after [`ArimaModel::fit`].
#[derive(Debug, Clone)]
pub struct ArimaModel {
    signal: Signal,
    order: ArimaOrder,
    mean: f64,
    ar: Vec<f64>,
    ma: Vec<f64>,
    sigma2: f64,
    aic: f64,
    level: f64,
    original: Vec<f64>,
    differenced: Vec<f64>,
    residuals: Vec<f64>,
}

const COEFF_BOUND: f64 = 0.99;

impl ArimaModel {
    /// Estimate an ARIMA model of the given order on `values`.
    ///
    /// `level` is the coverage of the confidence intervals returned by `forecast`.
    pub fn fit(
        signal: Signal,
        values: &[f64],
        order: ArimaOrder,
        level: f64,
    ) -> Result<Self, ModelError> {
        let needed = order.min_observations();
        if values.len() < needed {
            return Err(ModelError::insufficient(
                signal,
                format!("{order} needs at least {needed} observations, got {}", values.len()),
            ));
        }

        let differenced = difference(values, order.d);
        let n = differenced.len();
        let mean = differenced.iter().sum::<f64>() / n as f64;

        let (mean, ar, ma) = if order.p == 0 && order.q == 0 {
            (mean, Vec::new(), Vec::new())
        } else {
            let mut initial = Vec::with_capacity(1 + order.p + order.q);
            initial.push(mean);
            initial.extend((0..order.p).map(|i| 0.1 / (i + 1) as f64));
            initial.extend((0..order.q).map(|i| 0.1 / (i + 1) as f64));

            let mut bounds = vec![(f64::NEG_INFINITY, f64::INFINITY)];
            bounds.extend(std::iter::repeat_n(
                (-COEFF_BOUND, COEFF_BOUND),
                order.p + order.q,
            ));

            let min = nelder_mead(
                |params| {
                    let (mu, rest) = params.split_at(1);
                    let (ar, ma) = rest.split_at(order.p);
                    css(&differenced, mu[0], ar, ma).0
                },
                &initial,
                &bounds,
                &NelderMeadConfig::default(),
            );

            let (mu, rest) = min.point.split_at(1);
            let (ar, ma) = rest.split_at(order.p);
            (mu[0], ar.to_vec(), ma.to_vec())
        };

        let (sum_sq, residuals) = css(&differenced, mean, &ar, &ma);
        let effective = n.saturating_sub(order.p.max(order.q));
        if effective == 0 || !sum_sq.is_finite() {
            return Err(ModelError::insufficient(signal, format!("{order} did not converge")));
        }

        let sigma2 = sum_sq / effective as f64;
        if sigma2 <= f64::EPSILON {
            return Err(ModelError::insufficient(
                signal,
                format!("{order} residual variance is zero (degenerate series)"),
            ));
        }

        let m = effective as f64;
        let log_lik = -0.5 * m * (1.0 + sigma2.ln() + (2.0 * std::f64::consts::PI).ln());
        let aic = -2.0 * log_lik + 2.0 * order.num_params() as f64;

        Ok(Self {
            signal,
            order,
            mean,
            ar,
            ma,
            sigma2,
            aic,
            level,
            original: values.to_vec(),
            differenced,
            residuals,
        })
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn aic(&self) -> f64 {
        self.aic
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    pub fn residual_variance(&self) -> f64 {
        self.sigma2
    }

    /// MA(∞) weights of the integrated process, used for forecast variance.
    fn psi_weights(&self, horizon: usize) -> Vec<f64> {
        // Full AR polynomial: phi(B) * (1 - B)^d, expressed as coefficients on lags 1..
        let mut poly = vec![1.0];
        for &phi in &self.ar {
            poly.push(-phi);
        }
        for _ in 0..self.order.d {
            let mut next = vec![0.0; poly.len() + 1];
            for (i, c) in poly.iter().enumerate() {
                next[i] += c;
                next[i + 1] -= c;
            }
            poly = next;
        }
        let phi_full: Vec<f64> = poly.iter().skip(1).map(|c| -c).collect();

        let mut psi = vec![1.0; horizon.max(1)];
        for j in 1..psi.len() {
            let mut value = self.ma.get(j - 1).copied().unwrap_or(0.0);
            for (i, phi) in phi_full.iter().enumerate().take(j) {
                value += phi * psi[j - 1 - i];
            }
            psi[j] = value;
        }
        psi
    }
}

/// Conditional sum of squares and the residual sequence for the given parameters.
fn css(series: &[f64], mean: f64, ar: &[f64], ma: &[f64]) -> (f64, Vec<f64>) {
    let n = series.len();
    let start = ar.len().max(ma.len());
    let mut residuals = vec![0.0; n];
    if n <= start {
        return (f64::INFINITY, residuals);
    }

    let mut sum = 0.0;
    for t in start..n {
        let mut pred = mean;
        for (i, phi) in ar.iter().enumerate() {
            pred += phi * (series[t - 1 - i] - mean);
        }
        for (i, theta) in ma.iter().enumerate() {
            pred += theta * residuals[t - 1 - i];
        }
        let e = series[t] - pred;
        residuals[t] = e;
        sum += e * e;
    }
    (sum, residuals)
}

impl ForecastModel for ArimaModel {
    fn signal(&self) -> Signal {
        self.signal
    }

    fn describe(&self) -> String {
        format!("{} aic={:.2}", self.order, self.aic)
    }

    fn forecast(&self, horizon: usize) -> Result<Vec<PointForecast>, ModelError> {
        if horizon == 0 {
            return Err(ModelError::ForecastUnavailable { horizon });
        }

        let mut extended = self.differenced.clone();
        let mut shocks = self.residuals.clone();
        for _ in 0..horizon {
            let t = extended.len();
            let mut pred = self.mean;
            for (i, phi) in self.ar.iter().enumerate() {
                pred += phi * (extended[t - 1 - i] - self.mean);
            }
            for (i, theta) in self.ma.iter().enumerate() {
                pred += theta * shocks[t - 1 - i];
            }
            extended.push(pred);
            shocks.push(0.0);
        }

        let ahead = &extended[self.differenced.len()..];
        let points = integrate(ahead, &self.original, self.order.d);

        let z = Normal::new(0.0, 1.0)
            .map(|n| n.inverse_cdf((1.0 + self.level) / 2.0))
            .unwrap_or(1.96);
        let psi = self.psi_weights(horizon);

        let mut cumulative = 0.0;
        Ok(points
            .into_iter()
            .zip(psi)
            .map(|(value, weight)| {
                cumulative += weight * weight;
                let half = z * (self.sigma2 * cumulative).sqrt();
                PointForecast::new(value).with_interval(value - half, value + half, self.level)
            })
            .collect())
    }
}
