//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: forecast service and infrastructure wiring (dataset source, fitter, cache)
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: query/response DTOs and response shaping
//! - `errors.rs`: service errors and their envelope responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, ForecastService};

/// Build the full HTTP router (public entrypoint used by `main.rs` and the black-box tests).
pub fn build_app(services: AppServices) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes::router()
        .layer(Extension(Arc::new(services)))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}
