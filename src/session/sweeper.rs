//! Periodic removal of idle exclusivity locks.

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};

use super::manager::SessionExclusivityManager;

/// Run [`SessionExclusivityManager::sweep`] every `period` until shutdown.
/// The first sweep happens one full period after start.
pub fn spawn_sweeper(
    manager: SessionExclusivityManager,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(
            interval_secs = period.as_secs(),
            inactivity_secs = manager.inactivity().as_secs(),
            "Session sweeper starting"
        );

        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    manager.sweep();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Session sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    })
}
