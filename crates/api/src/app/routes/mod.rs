use axum::{Router, routing::get};

pub mod prediction;
pub mod system;

/// Router for all public endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route(
            "/prediction",
            get(prediction::get_prediction).post(prediction::post_prediction),
        )
}
