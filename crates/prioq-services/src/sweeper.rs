//! Sweeper — periodic promotion of delayed messages and lease expiry.
//!
//! Queues already do this lazily on every push and pop. The sweeper keeps
//! idle topics honest so stats and sizes reflect what a consumer would see.

use std::time::Duration;

use tokio::sync::broadcast;

use crate::engine::QueueEngine;

/// Runs until a shutdown signal arrives.
pub async fn run(engine: QueueEngine, every: Duration, mut shutdown: broadcast::Receiver<()>) {
    let mut interval = tokio::time::interval(every.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    tracing::info!(interval_ms = every.as_millis() as u64, "sweeper started");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let released = engine.sweep();
                if released.total() > 0 {
                    tracing::debug!(
                        promoted = released.promoted,
                        expired = released.expired,
                        "sweep released messages"
                    );
                }
            }
            _ = shutdown.recv() => break,
        }
    }

    tracing::info!("sweeper stopped");
}
