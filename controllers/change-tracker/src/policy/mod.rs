//! Meaningful-change policies.
//!
//! Every tracked kind implements [`TrackedKind`]: a pure decision over two
//! typed snapshots plus the kind-specific extraction (primary image,
//! exclusion, ADDED/DELETED wording, metadata). The watch loop is generic
//! over this trait, so adding a kind means adding one policy file and one
//! registration in the coordinator.

mod configmap;
mod cronjob;
mod daemonset;
mod deployment;
mod ingress;
mod job;
mod secret;
mod service;
mod statefulset;

use k8s_openapi::api::core::v1::PodTemplateSpec;
use kube::ResourceExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use snapshot_diff::{containers, image_changes};
use std::fmt::Debug;

/// Namespaces owned by the platform; nothing in them is ever recorded.
pub const RESERVED_NAMESPACES: &[&str] = &["kube-system", "kube-public", "kube-node-lease"];

/// True for system-reserved namespaces.
pub fn is_reserved_namespace(namespace: &str) -> bool {
    RESERVED_NAMESPACES.contains(&namespace)
}

/// Ordered, human-readable description of a meaningful change.
///
/// Rendered as one summary line followed by optional detail:
/// - without a headline the first change is the summary and the remaining
///   changes follow one per line
/// - with a headline (`"Service configuration changed:"`) every change
///   follows the headline
/// - a free-text detail block (ConfigMap value diffs) follows after a blank
///   line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    headline: Option<String>,
    changes: Vec<String>,
    detail: Option<String>,
}

impl ChangeSet {
    /// Change set whose summary is its first change.
    pub fn new() -> Self {
        Self::default()
    }

    /// Change set summarised by a fixed headline.
    pub fn headed(headline: impl Into<String>) -> Self {
        Self {
            headline: Some(headline.into()),
            ..Default::default()
        }
    }

    pub fn push(&mut self, change: impl Into<String>) {
        self.changes.push(change.into());
    }

    pub fn set_detail(&mut self, detail: impl Into<String>) {
        self.detail = Some(detail.into());
    }

    pub fn changes(&self) -> &[String] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// `Some(self)` when at least one change was detected.
    pub fn into_meaningful(self) -> Option<Self> {
        (!self.is_empty()).then_some(self)
    }

    /// The one-line summary.
    pub fn summary(&self) -> &str {
        self.headline
            .as_deref()
            .or_else(|| self.changes.first().map(String::as_str))
            .unwrap_or_default()
    }

    /// Full `diff` text.
    pub fn render(&self) -> String {
        let mut out = self
            .headline
            .iter()
            .chain(self.changes.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        if let Some(detail) = &self.detail {
            out.push_str("\n\n");
            out.push_str(detail);
        }
        out
    }
}

/// A resource kind the tracker watches.
///
/// Implementations must be pure: no I/O, no panics on unexpected shapes.
/// Missing optional fields compare as their API defaults or as "unset".
pub trait TrackedKind:
    kube::Resource<DynamicType = ()>
    + k8s_openapi::Resource
    + Clone
    + DeserializeOwned
    + Debug
    + Send
    + Sync
    + 'static
{
    /// Decides whether `old → new` is worth recording.
    fn detect_change(old: &Self, new: &Self) -> Option<ChangeSet>;

    /// Image of the first container, for kinds that run pods.
    fn primary_image(&self) -> Option<String> {
        None
    }

    /// Kind-specific exclusion beyond the reserved namespaces.
    fn is_excluded(&self) -> bool {
        false
    }

    /// True when the transition only advanced controller-owned status.
    /// Checked before [`TrackedKind::detect_change`].
    fn is_status_only(_old: &Self, _new: &Self) -> bool {
        false
    }

    fn describe_added(&self) -> String {
        format!("{} created", Self::KIND)
    }

    fn describe_deleted(&self) -> String {
        format!("{} deleted", Self::KIND)
    }

    /// Structured side-channel stored with the event. Never secret values.
    fn event_metadata(&self) -> Option<Value> {
        None
    }
}

/// Full exclusion check for one snapshot.
pub fn is_excluded<K: TrackedKind>(obj: &K) -> bool {
    obj.namespace()
        .as_deref()
        .is_some_and(is_reserved_namespace)
        || obj.is_excluded()
}

/// Formats `old → new`.
pub(crate) fn arrow(old: impl std::fmt::Display, new: impl std::fmt::Display) -> String {
    format!("{} → {}", old, new)
}

/// Reports per-container image changes between two pod templates.
pub(crate) fn push_image_changes(
    changes: &mut ChangeSet,
    old: Option<&PodTemplateSpec>,
    new: Option<&PodTemplateSpec>,
) {
    let (Some(old), Some(new)) = (old, new) else {
        return;
    };
    for change in image_changes(containers(old), containers(new)) {
        changes.push(format!(
            "Container {} image: {}",
            change.container,
            arrow(change.before, change.after)
        ));
    }
}
