use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use meteocast_core::{PointForecast, hour_label};

// -------------------------
// Request DTOs
// -------------------------

/// Query string of `GET /prediction`.
///
/// A missing `hours` parameter is the empty token.
#[derive(Debug, Default, Deserialize)]
pub struct PredictionQuery {
    #[serde(default)]
    pub hours: Option<String>,
}

impl PredictionQuery {
    pub fn token(&self) -> &str {
        self.hours.as_deref().unwrap_or("")
    }
}

// -------------------------
// Response DTOs
// -------------------------

/// Outcome class of an envelope; decides the HTTP status.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Ok,
    BadRequest,
    InternalError,
    NotImplemented,
}

impl ResponseStatus {
    pub fn http_status(&self) -> StatusCode {
        match self {
            ResponseStatus::Ok => StatusCode::OK,
            ResponseStatus::BadRequest => StatusCode::BAD_REQUEST,
            ResponseStatus::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ResponseStatus::NotImplemented => StatusCode::NOT_IMPLEMENTED,
        }
    }
}

/// One forecast step. Values are decimal strings, never rounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub hour: String,
    pub temperature: String,
    pub humidity: String,
}

/// The `data` field of an envelope. Serialized as-is into the HTTP body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredictionData {
    Text(String),
    Forecast(Vec<ForecastEntry>),
    Empty,
}

/// Three-field response envelope. Only `data` reaches the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub status: ResponseStatus,
    pub data: PredictionData,
    pub msg: String,
}

impl Envelope {
    pub fn new(status: ResponseStatus, data: PredictionData, msg: impl Into<String>) -> Self {
        Self {
            status,
            data,
            msg: msg.into(),
        }
    }

    pub fn liveness() -> Self {
        Self::new(ResponseStatus::Ok, PredictionData::Text("OK!".to_string()), "OK")
    }

    pub fn forecast(entries: Vec<ForecastEntry>) -> Self {
        Self::new(ResponseStatus::Ok, PredictionData::Forecast(entries), "Default")
    }

    pub fn http_status(&self) -> StatusCode {
        self.status.http_status()
    }
}

/// Render a forecast value without rounding (shortest round-trip decimal).
pub fn format_value(value: f64) -> String {
    format!("{value:?}")
}

/// Zip both signal forecasts into labelled entries (hour labels cycle every 24 steps).
pub fn shape_forecast(temperature: &[PointForecast], humidity: &[PointForecast]) -> Vec<ForecastEntry> {
    temperature
        .iter()
        .zip(humidity)
        .enumerate()
        .map(|(step, (t, h))| ForecastEntry {
            hour: hour_label(step).to_string(),
            temperature: format_value(t.value),
            humidity: format_value(h.value),
        })
        .collect()
}
