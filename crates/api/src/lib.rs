//! HTTP API: forecast service, routing, and request/response mapping.

pub mod app;
pub mod config;

pub use app::{AppServices, ForecastService, build_app};
pub use config::{Config, FitterKind};
