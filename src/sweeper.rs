use chrono::TimeDelta;
use std::sync::Arc;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::rate_limit::CountingStore;

// Stale bucket sweeper - runs every `sweep_interval`
pub async fn bucket_sweeper(store: Arc<dyn CountingStore>, sweep_interval: Duration, retention: TimeDelta) {
    let mut interval = interval(sweep_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(interval = ?sweep_interval, retention_minutes = retention.num_minutes(), "Bucket sweeper started");

    loop {
        interval.tick().await;
        sweep_once(store.as_ref(), retention).await;
    }
}

/// One cleanup pass. Failures are logged and reported as `None`.
pub async fn sweep_once(store: &dyn CountingStore, retention: TimeDelta) -> Option<usize> {
    match store.cleanup_expired(retention).await {
        Ok(Some(removed)) => {
            if removed > 0 {
                info!(removed, "Swept stale rate limit buckets");
            } else {
                debug!("No stale rate limit buckets");
            }
            Some(removed)
        }
        Ok(None) => {
            debug!("Stale bucket cleanup ran in the datastore");
            None
        }
        Err(e) => {
            warn!(error = %e, "Stale bucket cleanup failed");
            None
        }
    }
}
