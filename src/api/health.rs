//! Liveness endpoint.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    pub environment: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/", get(health)).with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    env: String,
}

async fn health(State(state): State<HealthState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "OK",
        version: env!("CARGO_PKG_VERSION"),
        env: state.environment,
    })
}
