use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use client::{AdminApi, GhostClient};
use ghostwatch_core::config::Settings;
use ghostwatch_core::sensors;
use ghostwatch_core::types::Snapshot;
use tracing::{debug, info};
use worker::{Coordinator, Integration};

#[derive(Debug, Parser)]
#[command(name = "worker", about = "Polls a Ghost site and logs its metrics")]
struct Args {
    /// Validate the admin key against the site and exit.
    #[arg(long)]
    check: bool,

    /// Run a single refresh, print the sensor readings as JSON and exit.
    #[arg(long, conflicts_with = "check")]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let args = Args::parse();
    let mut settings = Settings::from_env()?;

    if args.check {
        return check(&settings).await;
    }
    if args.once {
        return once(&settings).await;
    }

    // Push delivery needs the api binary's receiver; this process only polls.
    settings.external_url = None;
    let integration = Integration::setup(settings).await?;
    let mut snapshots = integration.coordinator().subscribe();
    snapshots.mark_changed();

    info!(site = %integration.site_title(), "worker starting");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if let Some(snapshot) = snapshot {
                    log_snapshot(&snapshot);
                }
            }
        }
    }

    info!("worker stopping");
    integration.teardown().await;
    Ok(())
}

async fn check(settings: &Settings) -> Result<()> {
    let client = GhostClient::from_settings(settings)?;
    let result = client.validate_credentials().await;
    client.close().await;

    let site = result?;
    info!(site = %site.title, version = ?site.version, "credentials accepted");
    Ok(())
}

async fn once(settings: &Settings) -> Result<()> {
    let client = Arc::new(GhostClient::from_settings(settings)?);
    let coordinator = Coordinator::new(client.clone(), settings.optional_policy.clone());
    let result = coordinator.refresh().await;
    client.close().await;

    let snapshot = result?;
    println!("{}", serde_json::to_string_pretty(&sensors::read_all(&snapshot))?);
    Ok(())
}

fn log_snapshot(snapshot: &Snapshot) {
    info!(
        site = %snapshot.site.title,
        members = snapshot.members.total,
        paid_members = snapshot.members.paid,
        published_posts = snapshot.posts.published,
        mrr = ?snapshot.revenue.as_ref().map(|r| r.monthly),
        "snapshot updated"
    );
    for reading in sensors::read_all(snapshot) {
        debug!(key = %reading.key, value = ?reading.value, "sensor");
    }
}
