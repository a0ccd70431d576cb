pub mod health;
pub mod receiver;
pub mod snapshot;


use axum::{middleware::from_fn, Router};

use crate::middleware::request_id::request_id;
use crate::state::AppState;

pub fn v1_router(state: AppState) -> Router {
    snapshot::router(state)
}

pub fn health_router(state: AppState) -> Router {
    health::router(state)
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health_router(state.clone()))
        .merge(receiver::router(state.clone()))
        .merge(v1_router(state))
        .layer(from_fn(request_id))
}
