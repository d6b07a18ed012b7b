//! Resource watch coordinator.
//!
//! Owns one watch task per tracked kind plus the retention worker. All tasks
//! observe a single [`CancellationToken`]; [`Coordinator::stop`] cancels it
//! and waits a bounded time for every task to finish.

use crate::error::ControllerError;
use crate::recorder::EventRecorder;
use crate::policy::TrackedKind;
use crate::retention;
use crate::watcher::{KubeSource, SnapshotSource, WatchLoop};
use event_store::EventStore;
use futures::future::join_all;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Supervises the per-kind watch loops.
pub struct Coordinator {
    recorder: Arc<EventRecorder>,
    resync_interval: Duration,
    cancel: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Coordinator {
    pub fn new(recorder: Arc<EventRecorder>, resync_interval: Duration) -> Self {
        Self {
            recorder,
            resync_interval,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    /// Starts one watch loop per tracked kind and returns immediately.
    pub fn start(&mut self, client: Client) {
        self.spawn::<Deployment, _>(KubeSource::new(client.clone()));
        self.spawn::<ConfigMap, _>(KubeSource::new(client.clone()));
        self.spawn::<Secret, _>(KubeSource::new(client.clone()));
        self.spawn::<Service, _>(KubeSource::new(client.clone()));
        self.spawn::<Ingress, _>(KubeSource::new(client.clone()));
        self.spawn::<StatefulSet, _>(KubeSource::new(client.clone()));
        self.spawn::<DaemonSet, _>(KubeSource::new(client.clone()));
        self.spawn::<CronJob, _>(KubeSource::new(client.clone()));
        self.spawn::<Job, _>(KubeSource::new(client));

        info!(watchers = self.tasks.len(), "All watchers started");
    }

    /// Starts a watch loop for `K` over `source`.
    pub fn spawn<K, S>(&mut self, source: S)
    where
        K: TrackedKind,
        S: SnapshotSource<K> + 'static,
    {
        let watch = WatchLoop::new(source, self.recorder.clone(), self.resync_interval);
        self.spawn_loop(K::KIND, watch);
    }

    /// Starts a prepared watch loop.
    pub fn spawn_loop<K, S>(&mut self, kind: &'static str, watch: WatchLoop<K, S>)
    where
        K: TrackedKind,
        S: SnapshotSource<K> + 'static,
    {
        let cancel = self.cancel.child_token();
        self.tasks.push((kind, tokio::spawn(watch.run(cancel))));
    }

    /// Starts the retention worker.
    pub fn spawn_retention(
        &mut self,
        store: Arc<EventStore>,
        retention_days: u32,
        interval: Duration,
    ) {
        let cancel = self.cancel.child_token();
        self.tasks.push((
            "retention",
            tokio::spawn(retention::run(store, retention_days, interval, cancel)),
        ));
    }

    /// Signals every task and waits up to `timeout` for them to finish.
    /// Tasks still running after the grace period are aborted.
    pub async fn stop(mut self, timeout: Duration) -> Result<(), ControllerError> {
        info!("Stopping watchers");
        self.cancel.cancel();

        let joined = tokio::time::timeout(
            timeout,
            join_all(self.tasks.iter_mut().map(|(_, handle)| handle)),
        )
        .await;

        match joined {
            Ok(results) => {
                let mut failed = Vec::new();
                for ((kind, _), result) in self.tasks.iter().zip(results) {
                    if let Err(e) = result {
                        warn!(kind, "Task ended abnormally: {}", e);
                        failed.push(*kind);
                    }
                }
                if failed.is_empty() {
                    info!("Stopped all watchers");
                    Ok(())
                } else {
                    Err(ControllerError::Join(format!("tasks failed: {}", failed.join(", "))))
                }
            }
            Err(_) => {
                let pending: Vec<&str> = self
                    .tasks
                    .iter()
                    .filter(|(_, handle)| !handle.is_finished())
                    .map(|(kind, _)| *kind)
                    .collect();
                warn!(?timeout, ?pending, "Shutdown grace period elapsed, aborting");
                for (_, handle) in &self.tasks {
                    handle.abort();
                }
                Err(ControllerError::Join(format!(
                    "timed out waiting for: {}",
                    pending.join(", ")
                )))
            }
        }
    }
}
