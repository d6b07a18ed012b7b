//! Periodic retention cleanup.

use event_store::EventStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Deletes events older than `retention_days` once immediately, then every
/// `interval`, until `cancel` fires.
pub async fn run(
    store: Arc<EventStore>,
    retention_days: u32,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                cleanup_once(&store, retention_days).await;
            }
        }
    }

    info!("Retention worker stopped");
}

/// One cleanup pass; returns the number of deleted events, `None` on failure.
pub async fn cleanup_once(store: &Arc<EventStore>, retention_days: u32) -> Option<u64> {
    let store = store.clone();
    match tokio::task::spawn_blocking(move || store.cleanup(retention_days)).await {
        Ok(Ok(deleted)) => {
            info!(deleted, retention_days, "Retention cleanup complete");
            Some(deleted)
        }
        Ok(Err(e)) => {
            error!("Retention cleanup failed: {}", e);
            None
        }
        Err(e) => {
            error!("Retention cleanup task failed: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use event_store::{Action, ChangeEvent, Filter};

    fn store_with_old_and_new() -> Arc<EventStore> {
        let store = EventStore::open_in_memory().unwrap();
        store
            .save(
                ChangeEvent::new("Deployment", "prod", "old", Action::Added)
                    .at(Utc::now() - ChronoDuration::days(90)),
            )
            .unwrap();
        store
            .save(ChangeEvent::new("Deployment", "prod", "new", Action::Added))
            .unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_cleanup_once_is_idempotent() {
        let store = store_with_old_and_new();

        assert_eq!(cleanup_once(&store, 60).await, Some(1));
        assert_eq!(cleanup_once(&store, 60).await, Some(0));
        assert_eq!(store.count(&Filter::default()).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_worker_cleans_at_start_and_stops_on_cancel() {
        let store = store_with_old_and_new();
        let cancel = CancellationToken::new();

        let worker = tokio::spawn(run(
            store.clone(),
            60,
            Duration::from_secs(3600),
            cancel.clone(),
        ));

        for _ in 0..100 {
            if store.count(&Filter::default()).unwrap() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(store.count(&Filter::default()).unwrap(), 1);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), worker)
            .await
            .unwrap()
            .unwrap();
    }
}
