//! Periodic eviction of expired jobs.
//!
//! The status endpoint already sweeps on every poll. This loop bounds
//! memory when nobody is polling: jobs that were submitted and then
//! abandoned are still dropped once they exceed the retention window.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use toonify_store::JobStore;

/// Run the retention loop until `cancel` is triggered.
pub async fn run(
    store: Arc<dyn JobStore>,
    retention: Duration,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        retention_secs = retention.as_secs(),
        interval_secs = interval.as_secs(),
        "Job retention task started"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Job retention task stopping");
                break;
            }
            _ = ticker.tick() => {
                let removed = store.sweep_expired(retention).await;
                if removed > 0 {
                    tracing::info!(removed, "Job retention: evicted expired jobs");
                } else {
                    tracing::debug!("Job retention: nothing to evict");
                }
            }
        }
    }
}
