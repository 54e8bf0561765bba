//! Naive last-value estimator.
//!
//! Forecasts the last observed value for every future step. Useful as a cheap
//! production fallback and as the deterministic stub in tests.

use statrs::distribution::{ContinuousCDF, Normal};

use meteocast_core::{ObservationSeries, PointForecast, Signal};

use crate::error::ModelError;
use crate::fitter::{ForecastModel, ModelFitter};

/// Fits a [`LastValueModel`].
#[derive(Debug, Clone, Copy)]
pub struct NaiveFitter {
    level: f64,
}

impl NaiveFitter {
    pub fn new() -> Self {
        Self { level: 0.95 }
    }

    /// Coverage of the confidence intervals attached to each forecast (e.g. 0.80).
    pub fn with_level(mut self, level: f64) -> Self {
        self.level = level;
        self
    }
}

impl Default for NaiveFitter {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelFitter for NaiveFitter {
    fn name(&self) -> &'static str {
        "naive"
    }

    fn fit(&self, series: &ObservationSeries) -> Result<Box<dyn ForecastModel>, ModelError> {
        let signal = series.signal();
        let values = series.values();

        let last = series
            .last()
            .ok_or_else(|| ModelError::insufficient(signal, "series is empty"))?;

        if values.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::invalid(signal, "series contains non-finite values"));
        }

        // Random-walk innovation scale: standard deviation of one-step changes.
        let steps: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
        let sigma = if steps.is_empty() {
            0.0
        } else {
            (steps.iter().map(|d| d * d).sum::<f64>() / steps.len() as f64).sqrt()
        };

        Ok(Box::new(LastValueModel {
            signal,
            last,
            sigma,
            level: self.level,
        }))
    }
}

/// Repeats the last training observation.
#[derive(Debug, Clone, PartialEq)]
pub struct LastValueModel {
    signal: Signal,
    last: f64,
    sigma: f64,
    level: f64,
}

impl ForecastModel for LastValueModel {
    fn signal(&self) -> Signal {
        self.signal
    }

    fn describe(&self) -> String {
        format!("naive(last={})", self.last)
    }

    fn forecast(&self, horizon: usize) -> Result<Vec<PointForecast>, ModelError> {
        if horizon == 0 {
            return Err(ModelError::ForecastUnavailable { horizon });
        }

        let z = Normal::new(0.0, 1.0)
            .map(|n| n.inverse_cdf((1.0 + self.level) / 2.0))
            .unwrap_or(1.96);

        Ok((1..=horizon)
            .map(|h| {
                let half = z * self.sigma * (h as f64).sqrt();
                PointForecast::new(self.last).with_interval(
                    self.last - half,
                    self.last + half,
                    self.level,
                )
            })
            .collect())
    }
}
