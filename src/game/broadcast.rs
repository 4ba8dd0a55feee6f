//! Fixed-rate snapshot broadcast loop

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use super::SyncEngine;

/// Broadcast the full player store to every connection once per `period`.
///
/// Runs until `shutdown` flips to true or its sender is dropped. Ticks that
/// are missed because the runtime was busy are skipped rather than bursted.
pub async fn run_broadcast_loop(
    engine: Arc<SyncEngine>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(period_ms = period.as_millis() as u64, "Broadcast loop started");

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                engine.broadcast_tick();
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!(ticks = engine.current_tick(), "Broadcast loop stopped");
}
