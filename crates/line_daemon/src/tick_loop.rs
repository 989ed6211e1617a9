use crate::state::{wall_clock_now, AppState};
use std::time::Duration;

/// Drive the line engine on a fixed period. A missed interval is simply
/// skipped: the next tick computes a larger elapsed delta from the stored
/// timestamps, so no backlog queue is needed.
pub async fn run_tick_loop(state: AppState, tick_ms: u64) {
    let mut interval = tokio::time::interval(Duration::from_millis(tick_ms));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        match state.line.tick(wall_clock_now()) {
            Ok(summary) => {
                for (zone_id, err) in &summary.failures {
                    tracing::warn!(%zone_id, error = %err, "tick commit skipped for zone");
                }
                if !summary.events.is_empty() {
                    let _ = state.event_tx.send(summary.events);
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "tick aborted before per-zone processing");
            }
        }
    }
}
