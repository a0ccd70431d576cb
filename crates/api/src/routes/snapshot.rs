use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use ghostwatch_core::sensors::{self, SensorReading};
use ghostwatch_core::types::Snapshot;
use serde_json::Value;
use worker::Coordinator;

use crate::{
    error::{ApiError, ApiResult, AppError},
    state::{AppState, RequestId},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/snapshot", get(get_snapshot))
        .route("/v1/sensors", get(list_sensors))
        .route("/v1/sensors/{key}", get(get_sensor))
        .route("/v1/diagnostics", get(diagnostics))
        .route("/v1/refresh", post(refresh))
        .with_state(state)
}

async fn coordinator(state: &AppState, request_id: &RequestId) -> ApiResult<Coordinator> {
    state
        .integration
        .read()
        .await
        .as_ref()
        .map(|integration| integration.coordinator().clone())
        .ok_or_else(|| unavailable("integration is not loaded", request_id))
}

async fn current(state: &AppState, request_id: &RequestId) -> ApiResult<std::sync::Arc<Snapshot>> {
    coordinator(state, request_id)
        .await?
        .snapshot()
        .ok_or_else(|| unavailable("no snapshot published yet", request_id))
}

fn unavailable(message: &str, request_id: &RequestId) -> ApiError {
    AppError::Unavailable(message.to_string()).with_request_id(&request_id.0)
}

async fn get_snapshot(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> ApiResult<Json<Snapshot>> {
    let snapshot = current(&state, &request_id).await?;
    Ok(Json(snapshot.as_ref().clone()))
}

async fn list_sensors(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> ApiResult<Json<Vec<SensorReading>>> {
    let snapshot = current(&state, &request_id).await?;
    Ok(Json(sensors::read_all(&snapshot)))
}

async fn get_sensor(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(key): Path<String>,
) -> ApiResult<Json<SensorReading>> {
    let snapshot = current(&state, &request_id).await?;
    sensors::read_all(&snapshot)
        .into_iter()
        .find(|reading| reading.key == key)
        .map(Json)
        .ok_or_else(|| {
            AppError::NotFound(format!("sensor {} not found", key)).with_request_id(&request_id.0)
        })
}

async fn diagnostics(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> ApiResult<Json<Value>> {
    let guard = state.integration.read().await;
    let integration = guard
        .as_ref()
        .ok_or_else(|| unavailable("integration is not loaded", &request_id))?;
    Ok(Json(integration.diagnostics()))
}

/// Runs a cycle now, or waits for the one already running.
async fn refresh(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> ApiResult<Json<Snapshot>> {
    let coordinator = coordinator(&state, &request_id).await?;
    let snapshot = coordinator
        .refresh()
        .await
        .map_err(|err| AppError::from(err).with_request_id(&request_id.0))?;
    Ok(Json(snapshot.as_ref().clone()))
}
