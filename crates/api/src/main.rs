use std::net::SocketAddr;

use ghostwatch_core::config::Settings;
use tokio::net::TcpListener;
use tracing::{info, warn};
use worker::Integration;

mod error;
mod middleware;
mod routes;
mod state;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let settings = Settings::from_env()?;
    let addr: SocketAddr = settings.api_bind.parse()?;
    if settings.external_url.is_some() && settings.callback_base().is_none() {
        warn!("GHOSTWATCH_EXTERNAL_URL is not an https url, webhooks disabled");
    }

    let integration = Integration::setup(settings).await?;
    let state = AppState::new(integration);
    let app = routes::app(state.clone());

    info!(%addr, "starting api");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(integration) = state.unload().await {
        integration.teardown().await;
    }
    info!("api stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
