//! Change event models
//!
//! These models are the contract between the watch pipeline (writer) and
//! the query surface (reader). Field names serialize in snake_case to match
//! the JSON the dashboard consumes.

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Observed transition type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Added,
    Modified,
    Deleted,
}

impl Action {
    /// All actions, in declaration order
    pub const ALL: [Action; 3] = [Action::Added, Action::Modified, Action::Deleted];

    /// Wire/storage representation (`ADDED`, `MODIFIED`, `DELETED`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Added => "ADDED",
            Action::Modified => "MODIFIED",
            Action::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADDED" => Ok(Action::Added),
            "MODIFIED" => Ok(Action::Modified),
            "DELETED" => Ok(Action::Deleted),
            other => Err(StoreError::InvalidData(format!("unknown action: {}", other))),
        }
    }
}

/// A recorded, operator-meaningful change to one Kubernetes resource.
///
/// `id` is `None` until the store assigns it on insert; a persisted event is
/// never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Detection time (not the cluster mutation time)
    pub timestamp: DateTime<Utc>,
    pub namespace: String,
    pub kind: String,
    pub name: String,
    pub action: Action,
    /// One-line summary, optionally followed by multi-line detail
    pub diff: String,
    /// JSON side-channel (replica counts, key lists); never secret values
    pub metadata: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_after: Option<String>,
}

impl ChangeEvent {
    /// Creates an unsaved event stamped with the current time.
    pub fn new(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        action: Action,
    ) -> Self {
        Self {
            id: None,
            timestamp: Utc::now(),
            namespace: namespace.into(),
            kind: kind.into(),
            name: name.into(),
            action,
            diff: String::new(),
            metadata: String::new(),
            image_before: None,
            image_after: None,
        }
    }

    /// Sets the diff text.
    pub fn with_diff(mut self, diff: impl Into<String>) -> Self {
        self.diff = diff.into();
        self
    }

    /// Sets the detection timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// First line of the diff.
    pub fn summary(&self) -> &str {
        self.diff.lines().next().unwrap_or_default()
    }
}

/// Query descriptor; every field is optional and `None` means no constraint.
///
/// Empty strings are treated the same as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    /// Exact namespace
    pub namespace: Option<String>,
    /// Exact kind
    pub kind: Option<String>,
    /// Case-insensitive substring of the resource name
    pub name: Option<String>,
    pub action: Option<Action>,
    /// Inclusive lower bound
    pub start_time: Option<DateTime<Utc>>,
    /// Inclusive upper bound
    pub end_time: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Filter {
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    pub fn between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    pub fn page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }
}

/// Changes per resource name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppChangeCount {
    pub name: String,
    pub count: i64,
}

/// Aggregate dashboard view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_changes: i64,
    pub changes_last_24h: i64,
    pub changes_per_hour: f64,
    /// Top 10 most-changed resource names over the last 24h
    pub top_modified_apps: Vec<AppChangeCount>,
    /// Up to 10 most recent distinct non-empty `image_after` values
    pub recent_images: Vec<String>,
    pub changes_by_kind: BTreeMap<String, i64>,
    pub changes_by_action: BTreeMap<String, i64>,
}
