use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Extension, Router,
};
use tracing::warn;

use crate::{
    error::{AppError, ApiResult},
    state::{AppState, RequestId},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/webhook/{webhook_id}", post(receive))
        .with_state(state)
}

/// Inbound Ghost webhook. Any parseable body is acknowledged, whether or
/// not it describes a change we recognize.
async fn receive(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(webhook_id): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, &'static str)> {
    let guard = state.integration.read().await;
    let integration = guard
        .as_ref()
        .filter(|integration| integration.receiver_id() == webhook_id)
        .ok_or_else(|| {
            AppError::NotFound(format!("no receiver {}", webhook_id)).with_request_id(&request_id.0)
        })?;

    integration.receive(&body).map_err(|err| {
        warn!(receiver_id = %webhook_id, error = %err, "rejected webhook body");
        AppError::BadRequest(err.to_string()).with_request_id(&request_id.0)
    })?;

    Ok((StatusCode::OK, "OK"))
}
