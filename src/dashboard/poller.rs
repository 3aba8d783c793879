//! Periodic refresh driver.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::info;

use super::orchestrator::RefreshOrchestrator;

/// Default poll period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Requests a refresh on every tick of `period`, starting immediately.
///
/// Ticks that land while a refresh is in flight are dropped by the
/// orchestrator; missed ticks are skipped rather than replayed. Abort the
/// returned handle to stop polling.
pub fn spawn_poller(orchestrator: Arc<RefreshOrchestrator>, period: Duration) -> JoinHandle<()> {
    assert!(!period.is_zero(), "poll period must be non-zero");

    info!("Polling every {} ms", period.as_millis());
    let handle = orchestrator.handle().clone();

    handle.spawn(async move {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            orchestrator.request_refresh();
        }
    })
}
