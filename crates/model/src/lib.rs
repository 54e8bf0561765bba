//! `meteocast-model`
//!
//! **Responsibility:** the statistical forecasting capability boundary.
//!
//! Serving code only sees two traits:
//! - [`ModelFitter`]: `fit(series) -> model`
//! - [`ForecastModel`]: `forecast(horizon) -> point forecasts`
//!
//! Concrete estimators live behind them and can be swapped (or stubbed in tests)
//! without touching the cache or the HTTP layer.

pub mod arima;
pub mod error;
pub mod fitter;
pub mod naive;
pub mod optimization;

pub use arima::{ArimaModel, ArimaOrder, AutoArimaConfig, AutoArimaFitter};
pub use error::ModelError;
pub use fitter::{ForecastModel, ModelFitter};
pub use naive::{LastValueModel, NaiveFitter};
