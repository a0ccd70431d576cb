use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use worker::CycleState;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cycle: Option<CycleState>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let cycle = state
        .integration
        .read()
        .await
        .as_ref()
        .map(|integration| integration.status().state);
    Json(HealthResponse { status: "ok", cycle })
}
