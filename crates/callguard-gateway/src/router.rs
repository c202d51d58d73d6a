//! Axum router wiring.

use axum::{
    routing::{get, post},
    Router,
};

use crate::{app_state::AppState, ops, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/validate", post(transport::http::validate))
        .route("/v1/protocols", get(transport::http::list_protocols))
        .route("/v1/protocols/:origin", get(transport::http::get_protocol))
        .route(
            "/v1/protocols/:origin/conditions",
            get(transport::http::get_conditions),
        )
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}
