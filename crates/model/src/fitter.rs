use std::sync::Arc;

use meteocast_core::{ObservationSeries, PointForecast, Signal};

use crate::error::ModelError;

/// A trained, immutable forecasting artifact bound to one signal.
///
/// Retraining produces a new instance; implementations must never mutate
/// their state after construction.
pub trait ForecastModel: Send + Sync + core::fmt::Debug + 'static {
    /// The signal this model was trained on.
    fn signal(&self) -> Signal;

    /// Short human-readable description (estimator + selected order), used in logs.
    fn describe(&self) -> String;

    /// Produce exactly `horizon` point forecasts in temporal order, starting one
    /// step after the last training observation.
    ///
    /// Must fail with [`ModelError::ForecastUnavailable`] when `horizon == 0`.
    fn forecast(&self, horizon: usize) -> Result<Vec<PointForecast>, ModelError>;
}

/// Estimator capability: turns an observation series into a trained model.
///
/// Fitting may block for a long time; callers decide where it runs.
pub trait ModelFitter: Send + Sync + 'static {
    /// Stable estimator name (used in logs and configuration).
    fn name(&self) -> &'static str;

    fn fit(&self, series: &ObservationSeries) -> Result<Box<dyn ForecastModel>, ModelError>;
}

impl<F> ModelFitter for Arc<F>
where
    F: ModelFitter + ?Sized,
{
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn fit(&self, series: &ObservationSeries) -> Result<Box<dyn ForecastModel>, ModelError> {
        (**self).fit(series)
    }
}
