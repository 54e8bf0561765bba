//! Autoregressive integrated moving-average models.

pub mod auto;
pub mod diff;
pub mod model;

pub use auto::{AutoArimaConfig, AutoArimaFitter};
pub use model::{ArimaModel, ArimaOrder};
