use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::app::dto::{Envelope, PredictionData, PredictionQuery, ResponseStatus};
use crate::app::errors;
use crate::app::services::AppServices;

pub async fn get_prediction(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<PredictionQuery>,
) -> Response {
    let token = query.token();
    match services.forecast.handle(token) {
        Ok(envelope) => {
            info!(token, status = ?envelope.status, "prediction served");
            errors::envelope_response(envelope)
        }
        Err(e) => {
            info!(token, error = %e, "prediction refused");
            e.into_response()
        }
    }
}

/// Write path is not implemented; the body is ignored.
pub async fn post_prediction() -> Response {
    let envelope = Envelope::new(
        ResponseStatus::NotImplemented,
        PredictionData::Empty,
        "Error: method POST not implemented",
    );
    errors::envelope_response(envelope)
}
