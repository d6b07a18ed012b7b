//! ConfigMap policy: key-set delta first, then full before/after values.

use super::{ChangeSet, TrackedKind};
use k8s_openapi::api::core::v1::ConfigMap;
use serde_json::{json, Value};
use snapshot_diff::maps::key_names;
use snapshot_diff::{diff_keys, line_diff};

fn value<'a>(cm: &'a ConfigMap, key: &str) -> &'a str {
    cm.data
        .as_ref()
        .and_then(|data| data.get(key))
        .map(String::as_str)
        .unwrap_or_default()
}

impl TrackedKind for ConfigMap {
    fn detect_change(old: &Self, new: &Self) -> Option<ChangeSet> {
        let delta = diff_keys(old.data.as_ref(), new.data.as_ref());
        if delta.is_empty() {
            return None;
        }

        let mut changes = ChangeSet::new();
        if !delta.added.is_empty() {
            changes.push(format!("Keys added: {}", delta.added.join(", ")));
        }
        if !delta.removed.is_empty() {
            changes.push(format!("Keys removed: {}", delta.removed.join(", ")));
        }
        if !delta.modified.is_empty() {
            changes.push(format!("Keys modified: {}", delta.modified.join(", ")));
            let blocks: Vec<String> = delta
                .modified
                .iter()
                .map(|key| line_diff(key, value(old, key), value(new, key)))
                .collect();
            changes.set_detail(blocks.join("\n\n"));
        }

        changes.into_meaningful()
    }

    fn describe_added(&self) -> String {
        let keys = self.data.as_ref().map_or(0, |data| data.len());
        format!("ConfigMap created with {} key(s)", keys)
    }

    fn event_metadata(&self) -> Option<Value> {
        Some(json!({ "keys": key_names(self.data.as_ref()) }))
    }
}
