use axum::Json;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::app::dto::{Envelope, PredictionData, ResponseStatus};

/// Failures of `ForecastService::handle`, each with a fixed envelope shape.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// Unrecognized horizon token.
    #[error("method not implemented: {token:?}")]
    NotImplemented { token: String },

    /// Models not trained yet; answered with the degraded payload.
    #[error("models not ready for {token:?}")]
    NotReady { token: String },

    /// Last training attempt failed; callers see the same degraded payload as `NotReady`.
    #[error("model training failed: {reason}")]
    ModelTrainingFailed { token: String, reason: String },

    /// A validated horizon was refused by the model layer.
    #[error("forecast unavailable: {0}")]
    ForecastUnavailable(String),
}

impl ServiceError {
    pub fn envelope(&self) -> Envelope {
        match self {
            ServiceError::NotImplemented { token } => Envelope::new(
                ResponseStatus::NotImplemented,
                PredictionData::Text(token.clone()),
                "Error: method not implemented",
            ),
            ServiceError::NotReady { token } | ServiceError::ModelTrainingFailed { token, .. } => {
                Envelope::new(
                    ResponseStatus::BadRequest,
                    PredictionData::Text(token.clone()),
                    "Default",
                )
            }
            // Never leak internal state.
            ServiceError::ForecastUnavailable(_) => Envelope::new(
                ResponseStatus::InternalError,
                PredictionData::Empty,
                "Error: forecast unavailable",
            ),
        }
    }
}

/// Write an envelope as an HTTP response: status from the envelope, body = `data`.
pub fn envelope_response(envelope: Envelope) -> Response {
    (envelope.http_status(), Json(envelope.data)).into_response()
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        envelope_response(self.envelope())
    }
}
