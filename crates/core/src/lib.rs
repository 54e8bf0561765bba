//! `meteocast-core`: forecasting domain building blocks.
//!
//! This crate contains **pure domain** types (no IO, no model fitting, no HTTP).

pub mod error;
pub mod forecast;
pub mod horizon;
pub mod series;
pub mod signal;

pub use error::{DomainError, DomainResult};
pub use forecast::{ConfidenceInterval, PointForecast, hour_label, HOUR_LABELS};
pub use horizon::{ForecastRequest, Horizon, LIVENESS_TOKEN};
pub use series::{DatasetSnapshot, Observation, ObservationSeries};
pub use signal::Signal;
