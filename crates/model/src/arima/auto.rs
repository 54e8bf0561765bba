//! Automatic ARIMA order selection (stepwise, AIC).

use std::collections::HashSet;
use std::time::Instant;

use tracing::debug;

use meteocast_core::ObservationSeries;

use crate::arima::diff::{suggest_differencing, variance};
use crate::arima::model::{ArimaModel, ArimaOrder};
use crate::error::ModelError;
use crate::fitter::{ForecastModel, ModelFitter};

/// Search space for [`AutoArimaFitter`].
///
/// Defaults describe a non-seasonal search starting at ARIMA(1,d,1) with
/// `p, q <= 3` and `d` picked automatically.
#[derive(Debug, Clone)]
pub struct AutoArimaConfig {
    pub start_p: usize,
    pub start_q: usize,
    pub max_p: usize,
    pub max_q: usize,
    pub max_d: usize,
    /// Fixed differencing order; `None` selects it from the data.
    pub d: Option<usize>,
    /// Stepwise neighbourhood search instead of the full grid.
    pub stepwise: bool,
    /// Coverage of the returned confidence intervals.
    pub level: f64,
    /// Minimum series length accepted at all.
    pub min_observations: usize,
}

impl Default for AutoArimaConfig {
    fn default() -> Self {
        Self {
            start_p: 1,
            start_q: 1,
            max_p: 3,
            max_q: 3,
            max_d: 2,
            d: None,
            stepwise: true,
            level: 0.95,
            min_observations: 10,
        }
    }
}

impl AutoArimaConfig {
    pub fn with_max_orders(mut self, max_p: usize, max_q: usize) -> Self {
        self.max_p = max_p;
        self.max_q = max_q;
        self
    }

    pub fn with_d(mut self, d: usize) -> Self {
        self.d = Some(d);
        self
    }

    pub fn exhaustive(mut self) -> Self {
        self.stepwise = false;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct AutoArimaFitter {
    config: AutoArimaConfig,
}

impl AutoArimaFitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AutoArimaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AutoArimaConfig {
        &self.config
    }

    /// Fit every candidate order the search visits and keep the lowest AIC.
    ///
    /// Candidates that fail to fit are skipped.
    pub fn select(&self, series: &ObservationSeries) -> Result<ArimaModel, ModelError> {
        let signal = series.signal();
        let values = series.values();
        let cfg = &self.config;

        if values.len() < cfg.min_observations {
            return Err(ModelError::insufficient(
                signal,
                format!(
                    "need at least {} observations, got {}",
                    cfg.min_observations,
                    values.len()
                ),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::invalid(signal, "series contains non-finite values"));
        }
        if variance(values) <= f64::EPSILON {
            return Err(ModelError::insufficient(signal, "series is constant"));
        }

        let d = cfg
            .d
            .unwrap_or_else(|| suggest_differencing(values, cfg.max_d));

        let started = Instant::now();
        let mut visited: HashSet<ArimaOrder> = HashSet::new();
        let mut best: Option<ArimaModel> = None;

        let mut try_order = |order: ArimaOrder, best: &mut Option<ArimaModel>| -> bool {
            if order.p > cfg.max_p || order.q > cfg.max_q || !visited.insert(order) {
                return false;
            }
            match ArimaModel::fit(signal, values, order, cfg.level) {
                Ok(model) => {
                    debug!(%signal, %order, aic = model.aic(), "candidate fitted");
                    let improves = best.as_ref().is_none_or(|b| model.aic() < b.aic());
                    if improves {
                        *best = Some(model);
                    }
                    improves
                }
                Err(e) => {
                    debug!(%signal, %order, error = %e, "candidate skipped");
                    false
                }
            }
        };

        if cfg.stepwise {
            let seeds = [
                ArimaOrder::new(cfg.start_p, d, cfg.start_q),
                ArimaOrder::new(0, d, 0),
                ArimaOrder::new(1, d, 0),
                ArimaOrder::new(0, d, 1),
            ];
            for order in seeds {
                try_order(order, &mut best);
            }

            // Move to a better neighbour until none improves.
            loop {
                let Some(current) = best.as_ref().map(|m| m.order()) else {
                    break;
                };
                let neighbours = [
                    (current.p + 1, current.q),
                    (current.p, current.q + 1),
                    (current.p.wrapping_sub(1), current.q),
                    (current.p, current.q.wrapping_sub(1)),
                    (current.p + 1, current.q + 1),
                    (current.p.wrapping_sub(1), current.q.wrapping_sub(1)),
                ];
                let mut improved = false;
                for (p, q) in neighbours {
                    // wrapping_sub underflow lands far above max_p/max_q and is filtered out.
                    improved |= try_order(ArimaOrder::new(p, d, q), &mut best);
                }
                if !improved {
                    break;
                }
            }
        } else {
            for p in 0..=cfg.max_p {
                for q in 0..=cfg.max_q {
                    try_order(ArimaOrder::new(p, d, q), &mut best);
                }
            }
        }

        let model = best.ok_or_else(|| {
            ModelError::insufficient(signal, format!("no ARIMA order with d={d} could be fitted"))
        })?;

        debug!(
            %signal,
            order = %model.order(),
            candidates = visited.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "order selected"
        );
        Ok(model)
    }
}

impl ModelFitter for AutoArimaFitter {
    fn name(&self) -> &'static str {
        "auto_arima"
    }

    fn fit(&self, series: &ObservationSeries) -> Result<Box<dyn ForecastModel>, ModelError> {
        Ok(Box::new(self.select(series)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meteocast_core::Signal;

    fn daily_cycle(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let hour = (i % 24) as f64;
                let noise = ((i as f64 * 78.233).sin() * 43758.5453).fract() * 0.4;
                15.0 + 5.0 * (hour / 24.0 * std::f64::consts::TAU).sin() + noise
            })
            .collect()
    }

    #[test]
    fn selects_a_model_within_the_search_space() {
        let series = ObservationSeries::new(Signal::Temperature, daily_cycle(240));
        let model = AutoArimaFitter::new().select(&series).unwrap();

        let order = model.order();
        assert!(order.p <= 3 && order.q <= 3 && order.d <= 2);
        assert!(model.aic().is_finite());
    }

    #[test]
    fn exhaustive_search_is_never_worse_than_stepwise() {
        let series = ObservationSeries::new(Signal::Humidity, daily_cycle(120));
        let stepwise = AutoArimaFitter::new().select(&series).unwrap();
        let full = AutoArimaFitter::with_config(AutoArimaConfig::default().exhaustive())
            .select(&series)
            .unwrap();

        if stepwise.order().d == full.order().d {
            assert!(full.aic() <= stepwise.aic() + 1e-9);
        }
    }

    #[test]
    fn forecast_through_trait_object() {
        let series = ObservationSeries::new(Signal::Temperature, daily_cycle(96));
        let model = AutoArimaFitter::new().fit(&series).unwrap();

        assert_eq!(model.signal(), Signal::Temperature);
        assert!(model.describe().starts_with("ARIMA("));
        assert_eq!(model.forecast(48).unwrap().len(), 48);
    }

    #[test]
    fn degenerate_series_are_rejected() {
        let fitter = AutoArimaFitter::new();

        let empty = ObservationSeries::new(Signal::Temperature, []);
        assert!(matches!(
            fitter.fit(&empty).unwrap_err(),
            ModelError::InsufficientData { .. }
        ));

        let constant = ObservationSeries::new(Signal::Temperature, vec![20.0; 200]);
        assert!(matches!(
            fitter.fit(&constant).unwrap_err(),
            ModelError::InsufficientData { .. }
        ));

        let short = ObservationSeries::new(Signal::Temperature, [1.0, 2.0, 4.0]);
        assert!(matches!(
            fitter.fit(&short).unwrap_err(),
            ModelError::InsufficientData { .. }
        ));

        let mut bad = daily_cycle(50);
        bad[10] = f64::NAN;
        let bad = ObservationSeries::new(Signal::Temperature, bad);
        assert!(matches!(
            fitter.fit(&bad).unwrap_err(),
            ModelError::InvalidData { .. }
        ));
    }

    #[test]
    fn order_bounds_limit_the_search() {
        let fitter = AutoArimaFitter::with_config(AutoArimaConfig::default().with_max_orders(1, 1));
        assert_eq!(fitter.config().max_p, 1);

        let series = ObservationSeries::new(Signal::Temperature, daily_cycle(120));
        let model = fitter.select(&series).unwrap();
        assert!(model.order().p <= 1 && model.order().q <= 1);
        assert_eq!(model.ar_coefficients().len(), model.order().p);
        assert_eq!(model.ma_coefficients().len(), model.order().q);
        assert!(model.residual_variance() > 0.0);
    }

    #[test]
    fn fixed_differencing_order_is_respected() {
        let trending: Vec<f64> = daily_cycle(120)
            .into_iter()
            .enumerate()
            .map(|(i, v)| v + 0.5 * i as f64)
            .collect();
        let series = ObservationSeries::new(Signal::Temperature, trending);

        for d in [0, 1] {
            let model = AutoArimaFitter::with_config(AutoArimaConfig::default().with_d(d))
                .select(&series)
                .unwrap();
            assert_eq!(model.order().d, d);
        }
    }
}
