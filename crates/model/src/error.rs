use thiserror::Error;

use meteocast_core::Signal;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// The series is empty, too short or degenerate (e.g. constant) for the estimator.
    #[error("insufficient data for {signal}: {reason}")]
    InsufficientData { signal: Signal, reason: String },

    /// The series contains values the estimator cannot use (NaN, infinities).
    #[error("invalid data for {signal}: {reason}")]
    InvalidData { signal: Signal, reason: String },

    /// A forecast was requested for a horizon the model cannot produce (e.g. zero).
    #[error("forecast unavailable for horizon {horizon}")]
    ForecastUnavailable { horizon: usize },
}

impl ModelError {
    pub fn insufficient(signal: Signal, reason: impl Into<String>) -> Self {
        Self::InsufficientData {
            signal,
            reason: reason.into(),
        }
    }

    pub fn invalid(signal: Signal, reason: impl Into<String>) -> Self {
        Self::InvalidData {
            signal,
            reason: reason.into(),
        }
    }
}
