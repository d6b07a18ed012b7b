//! Turns transitions into stored events and notifications.

use crate::notifier::Notifier;
use crate::policy::{self, TrackedKind};
use crate::watcher::Transition;
use event_store::{ChangeEvent, EventStore};
use kube::ResourceExt;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Shared by every watch loop; the store is the only cross-kind state.
pub struct EventRecorder {
    store: Arc<EventStore>,
    notifier: Notifier,
}

impl EventRecorder {
    pub fn new(store: Arc<EventStore>, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    pub fn store(&self) -> &Arc<EventStore> {
        &self.store
    }

    /// Filters, persists and announces one transition.
    ///
    /// The store write completes before this returns; the notification does
    /// not. Returns the saved event, or `None` when the transition was
    /// filtered out or the write failed.
    pub async fn record<K: TrackedKind>(&self, transition: Transition<K>) -> Option<ChangeEvent> {
        let event = build_event(&transition)?;

        let store = self.store.clone();
        let saved = match tokio::task::spawn_blocking(move || store.save(event)).await {
            Ok(Ok(saved)) => saved,
            Ok(Err(e)) => {
                error!(kind = K::KIND, "Failed to save change event: {}", e);
                return None;
            }
            Err(e) => {
                error!(kind = K::KIND, "Store write task failed: {}", e);
                return None;
            }
        };

        info!(
            kind = %saved.kind,
            namespace = %saved.namespace,
            name = %saved.name,
            action = %saved.action,
            "{}", saved.summary()
        );

        self.notifier.dispatch(&saved);
        Some(saved)
    }
}

/// Builds the event for a transition, or `None` when it is excluded or not
/// meaningful.
pub fn build_event<K: TrackedKind>(transition: &Transition<K>) -> Option<ChangeEvent> {
    let obj = transition.object();
    let namespace = obj.namespace().unwrap_or_default();
    let name = obj.name_any();

    if policy::is_excluded(obj) {
        debug!(kind = K::KIND, %namespace, %name, "Skipping excluded resource");
        return None;
    }

    let mut event = ChangeEvent::new(K::KIND, namespace, name, transition.action());

    match transition {
        Transition::Added(obj) => {
            event.diff = obj.describe_added();
            event.image_after = obj.primary_image();
        }
        Transition::Deleted(obj) => {
            event.diff = obj.describe_deleted();
            event.image_before = obj.primary_image();
        }
        Transition::Modified { old, new } => {
            if K::is_status_only(old, new) {
                debug!(
                    kind = K::KIND,
                    namespace = %event.namespace,
                    name = %event.name,
                    "Ignoring status-only update"
                );
                return None;
            }
            let Some(changes) = K::detect_change(old, new) else {
                debug!(
                    kind = K::KIND,
                    namespace = %event.namespace,
                    name = %event.name,
                    "No meaningful change"
                );
                return None;
            };
            event.diff = changes.render();
            event.image_before = old.primary_image();
            event.image_after = new.primary_image();
        }
    }

    event.metadata = obj
        .event_metadata()
        .map(|metadata| metadata.to_string())
        .unwrap_or_default();

    Some(event)
}
