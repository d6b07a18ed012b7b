//! Per-kind watch loops.
//!
//! A [`WatchLoop`] owns one [`SnapshotSource`] subscription for one tracked
//! kind. `kube_runtime::watcher` delivers `Apply`/`Delete` without the
//! previous object, so each loop keeps its own last-seen cache
//! ([`Subscription`]) to reconstruct ADDED / MODIFIED / DELETED transitions.
//! The cache is never shared across kinds.
//!
//! A periodic full resync lists every live object and replays it through the
//! same cache, which repairs transitions lost while the watch was
//! reconnecting.

use crate::backoff::FibonacciBackoff;
use crate::error::ControllerError;
use crate::policy::TrackedKind;
use crate::recorder::EventRecorder;
use async_trait::async_trait;
use event_store::Action;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use kube::api::ListParams;
use kube::{Api, Client, ResourceExt};
use kube_runtime::watcher::{self, Event};
use kube_runtime::WatchStreamExt;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Consecutive stream failures after which a kind is reported as degraded
const DEGRADED_AFTER: u32 = 5;

/// Typed list/watch capability for one kind across all namespaces.
#[async_trait]
pub trait SnapshotSource<K>: Send + Sync {
    /// Opens a list-then-watch stream. The stream ends when the subscription
    /// is lost.
    fn subscribe(&self) -> BoxStream<'static, Result<Event<K>, ControllerError>>;

    /// Lists every live object, used for the periodic resync.
    async fn list(&self) -> Result<Listing<K>, ControllerError>;
}

/// [`SnapshotSource`] backed by the cluster API.
pub struct KubeSource<K: TrackedKind> {
    api: Api<K>,
}

impl<K: TrackedKind> KubeSource<K> {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl<K: TrackedKind> SnapshotSource<K> for KubeSource<K> {
    fn subscribe(&self) -> BoxStream<'static, Result<Event<K>, ControllerError>> {
        watcher::watcher(self.api.clone(), watcher::Config::default())
            .default_backoff()
            .map_err(|e| ControllerError::Watch(e.to_string()))
            .boxed()
    }

    async fn list(&self) -> Result<Listing<K>, ControllerError> {
        let list = self.api.list(&ListParams::default()).await?;
        Ok(Listing::new(list.items, list.metadata.resource_version))
    }
}

/// One observed state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition<K> {
    Added(K),
    Modified { old: K, new: K },
    /// Carries the last-known snapshot.
    Deleted(K),
}

impl<K> Transition<K> {
    pub fn action(&self) -> Action {
        match self {
            Transition::Added(_) => Action::Added,
            Transition::Modified { .. } => Action::Modified,
            Transition::Deleted(_) => Action::Deleted,
        }
    }

    /// The snapshot the event describes (the new one for MODIFIED).
    pub fn object(&self) -> &K {
        match self {
            Transition::Added(obj) | Transition::Deleted(obj) => obj,
            Transition::Modified { new, .. } => new,
        }
    }
}

type ObjectKey = (String, String);

fn object_key<K: kube::Resource>(obj: &K) -> ObjectKey {
    (obj.namespace().unwrap_or_default(), obj.name_any())
}

fn version<K: kube::Resource>(obj: &K) -> Option<&str> {
    obj.meta().resource_version.as_deref()
}

/// Orders two resource versions when both are numeric, as the API server
/// issues them.
fn compare_versions(a: Option<&str>, b: Option<&str>) -> Option<Ordering> {
    let a = a?.parse::<u64>().ok()?;
    let b = b?.parse::<u64>().ok()?;
    Some(a.cmp(&b))
}

/// True when `candidate` is a later revision than `current`. Versions that
/// cannot be ordered count as newer unless they are identical.
fn is_newer(current: Option<&str>, candidate: Option<&str>) -> bool {
    match compare_versions(candidate, current) {
        Some(order) => order == Ordering::Greater,
        None => current.is_none() || candidate.is_none() || current != candidate,
    }
}

/// Result of a full list: the objects plus the collection resource version.
#[derive(Debug, Clone)]
pub struct Listing<K> {
    pub items: Vec<K>,
    pub resource_version: Option<String>,
}

impl<K> Listing<K> {
    pub fn new(items: Vec<K>, resource_version: Option<String>) -> Self {
        Self {
            items,
            resource_version,
        }
    }
}

impl<K> From<Vec<K>> for Listing<K> {
    fn from(items: Vec<K>) -> Self {
        Self::new(items, None)
    }
}

/// Last-seen snapshot cache for one kind, keyed by `(namespace, name)`.
///
/// The watch stream and the resync listing race each other, so every
/// object is only moved forward in resource version. Objects evicted by a
/// resync leave a tombstone holding their last version; the watch `Delete`
/// that follows is then already accounted for.
#[derive(Debug)]
pub struct Subscription<K> {
    cache: HashMap<ObjectKey, K>,
    tombstones: HashMap<ObjectKey, Option<String>>,
    /// Keys seen since the last `Init`, while a relist is in progress
    relisting: Option<HashSet<ObjectKey>>,
}

impl<K: TrackedKind> Default for Subscription<K> {
    fn default() -> Self {
        Self {
            cache: HashMap::new(),
            tombstones: HashMap::new(),
            relisting: None,
        }
    }
}

impl<K: TrackedKind> Subscription<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached objects.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_relisting(&self) -> bool {
        self.relisting.is_some()
    }

    /// Folds one watcher event into the cache and returns the resulting
    /// transitions, in delivery order.
    pub fn apply_event(&mut self, event: Event<K>) -> Vec<Transition<K>> {
        match event {
            Event::Init => {
                // A relist restarts the stream; no older delivery can follow it.
                self.tombstones.clear();
                self.relisting = Some(HashSet::new());
                Vec::new()
            }
            Event::InitApply(obj) => {
                if let Some(seen) = self.relisting.as_mut() {
                    seen.insert(object_key(&obj));
                }
                self.upsert(obj).into_iter().collect()
            }
            Event::InitDone => match self.relisting.take() {
                Some(seen) => self.evict_unseen(&seen),
                None => Vec::new(),
            },
            Event::Apply(obj) => self.upsert(obj).into_iter().collect(),
            Event::Delete(obj) => self.remove(obj).into_iter().collect(),
        }
    }

    /// Replays a full listing. Unknown objects become ADDED, newer revisions
    /// MODIFIED, and cached objects missing from the listing DELETED unless
    /// the cache already holds a revision later than the listing itself.
    pub fn resync(&mut self, listing: impl Into<Listing<K>>) -> Vec<Transition<K>> {
        let Listing {
            items,
            resource_version,
        } = listing.into();
        let seen: HashSet<ObjectKey> = items.iter().map(object_key).collect();
        let mut transitions: Vec<_> = items
            .into_iter()
            .filter_map(|obj| self.upsert(obj))
            .collect();

        let gone: Vec<ObjectKey> = self
            .cache
            .iter()
            .filter(|(key, obj)| {
                !seen.contains(*key)
                    && compare_versions(version(*obj), resource_version.as_deref())
                        != Some(Ordering::Greater)
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in gone {
            if let Some(last_known) = self.cache.remove(&key) {
                self.tombstones.insert(key, version(&last_known).map(str::to_string));
                transitions.push(Transition::Deleted(last_known));
            }
        }

        transitions
    }

    fn upsert(&mut self, obj: K) -> Option<Transition<K>> {
        let key = object_key(&obj);

        if let Some(tombstone) = self.tombstones.get(&key) {
            if !is_newer(tombstone.as_deref(), version(&obj)) {
                debug!(
                    kind = K::KIND,
                    namespace = %key.0,
                    name = %key.1,
                    "Ignoring stale update for evicted object"
                );
                return None;
            }
            self.tombstones.remove(&key);
        }

        if let Some(cached) = self.cache.get(&key) {
            if !is_newer(version(cached), version(&obj)) {
                return None;
            }
        }

        match self.cache.insert(key, obj.clone()) {
            None => Some(Transition::Added(obj)),
            Some(old) => Some(Transition::Modified { old, new: obj }),
        }
    }

    fn remove(&mut self, obj: K) -> Option<Transition<K>> {
        let key = object_key(&obj);
        match self.cache.remove(&key) {
            Some(last_known) => Some(Transition::Deleted(last_known)),
            // Already recorded when a resync evicted it.
            None if self.tombstones.remove(&key).is_some() => None,
            None => Some(Transition::Deleted(obj)),
        }
    }

    fn evict_unseen(&mut self, seen: &HashSet<ObjectKey>) -> Vec<Transition<K>> {
        let gone: Vec<ObjectKey> = self
            .cache
            .keys()
            .filter(|key| !seen.contains(*key))
            .cloned()
            .collect();
        gone.into_iter()
            .filter_map(|key| self.cache.remove(&key))
            .map(Transition::Deleted)
            .collect()
    }
}

/// Long-running watch loop for one kind.
pub struct WatchLoop<K: TrackedKind, S: SnapshotSource<K>> {
    source: S,
    recorder: Arc<EventRecorder>,
    resync_interval: Duration,
    backoff: FibonacciBackoff,
    subscription: Subscription<K>,
}

impl<K, S> WatchLoop<K, S>
where
    K: TrackedKind,
    S: SnapshotSource<K>,
{
    pub fn new(source: S, recorder: Arc<EventRecorder>, resync_interval: Duration) -> Self {
        Self {
            source,
            recorder,
            resync_interval,
            backoff: FibonacciBackoff::default(),
            subscription: Subscription::new(),
        }
    }

    /// Replaces the re-subscribe backoff.
    pub fn with_backoff(mut self, backoff: FibonacciBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Runs until `cancel` fires. Never returns early on errors.
    pub async fn run(mut self, cancel: CancellationToken) {
        let kind = K::KIND;
        info!(kind, "Starting watcher");

        let mut stream = self.source.subscribe();
        let mut resync = interval_at(Instant::now() + self.resync_interval, self.resync_interval);
        resync.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures: u32 = 0;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                item = stream.next() => match item {
                    Some(Ok(event)) => {
                        failures = 0;
                        self.backoff.reset();
                        self.handle_event(event).await;
                    }
                    Some(Err(e)) => {
                        failures += 1;
                        report_failure(kind, failures, &e);
                    }
                    None => {
                        failures += 1;
                        let delay = self.backoff.next_backoff();
                        let ended = ControllerError::Watch("stream ended".to_string());
                        report_failure(kind, failures, &ended);
                        info!(kind, ?delay, "Re-subscribing");

                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(delay) => {}
                        }
                        stream = self.source.subscribe();
                    }
                },

                _ = resync.tick() => self.resync().await,
            }
        }

        info!(kind, "Watcher stopped");
    }

    async fn handle_event(&mut self, event: Event<K>) {
        let initial_list_done = matches!(event, Event::InitDone);

        for transition in self.subscription.apply_event(event) {
            self.recorder.record(transition).await;
        }

        if initial_list_done {
            info!(
                kind = K::KIND,
                objects = self.subscription.len(),
                "Initial list complete"
            );
        }
    }

    async fn resync(&mut self) {
        if self.subscription.is_relisting() {
            debug!(kind = K::KIND, "Skipping resync during relist");
            return;
        }

        match self.source.list().await {
            Ok(listing) => {
                let transitions = self.subscription.resync(listing);
                debug!(kind = K::KIND, repaired = transitions.len(), "Resync complete");
                for transition in transitions {
                    self.recorder.record(transition).await;
                }
            }
            Err(e) => warn!(kind = K::KIND, "Resync list failed: {}", e),
        }
    }
}

fn report_failure(kind: &str, failures: u32, err: &ControllerError) {
    if failures >= DEGRADED_AFTER {
        error!(kind, failures, "Watch failing repeatedly, tracking degraded: {}", err);
    } else {
        warn!(kind, failures, "Watch error: {}", err);
    }
}
