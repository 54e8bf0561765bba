use std::sync::Arc;

use axum::{Json, extract::Extension, response::IntoResponse};
use serde_json::Value;

use meteocast_infra::Readiness;

use crate::app::services::AppServices;

/// Process liveness plus model readiness.
pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(health_body(&services.cache().readiness()))
}

/// State and epoch come from one readiness snapshot.
pub fn health_body(readiness: &Readiness) -> Value {
    serde_json::json!({
        "status": "ok",
        "readiness": readiness.as_str(),
        "epoch": readiness.epoch(),
    })
}
