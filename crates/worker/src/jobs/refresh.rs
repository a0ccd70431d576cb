use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::coordinator::{Coordinator, CycleState};

/// Starts the periodic refresh. The first tick fires one `period` from now,
/// the initial cycle being run by setup.
pub fn spawn(coordinator: Coordinator, period: Duration) -> JoinHandle<()> {
    tokio::spawn(run(coordinator, period))
}

pub async fn run(coordinator: Coordinator, period: Duration) {
    info!(interval_secs = period.as_secs(), "refresh timer started");

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if coordinator.state() == CycleState::AuthFailed {
            debug!("skipping scheduled refresh, credentials were rejected");
            continue;
        }

        // Awaited inline so scheduled cycles never overlap.
        if let Err(err) = coordinator.refresh().await {
            debug!(error = %err, "scheduled refresh failed");
        }
    }
}
