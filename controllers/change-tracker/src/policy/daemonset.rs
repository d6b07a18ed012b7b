//! DaemonSet policy: images, update strategy, node selector.

use super::{arrow, push_image_changes, ChangeSet, TrackedKind};
use k8s_openapi::api::apps::v1::DaemonSet;
use serde_json::{json, Value};
use snapshot_diff::maps::format_map;
use snapshot_diff::{display_opt, first_image, maps_equal};
use std::collections::BTreeMap;

fn strategy_type(ds: &DaemonSet) -> Option<&str> {
    ds.spec
        .as_ref()
        .and_then(|spec| spec.update_strategy.as_ref())
        .and_then(|strategy| strategy.type_.as_deref())
}

fn node_selector(ds: &DaemonSet) -> Option<&BTreeMap<String, String>> {
    ds.spec
        .as_ref()
        .and_then(|spec| spec.template.spec.as_ref())
        .and_then(|pod| pod.node_selector.as_ref())
}

impl TrackedKind for DaemonSet {
    fn detect_change(old: &Self, new: &Self) -> Option<ChangeSet> {
        let mut changes = ChangeSet::headed("DaemonSet configuration changed:");

        push_image_changes(
            &mut changes,
            old.spec.as_ref().map(|spec| &spec.template),
            new.spec.as_ref().map(|spec| &spec.template),
        );

        if strategy_type(old) != strategy_type(new) {
            changes.push(format!(
                "Update strategy: {}",
                arrow(display_opt(strategy_type(old)), display_opt(strategy_type(new)))
            ));
        }

        if !maps_equal(node_selector(old), node_selector(new)) {
            changes.push(format!(
                "Node selector changed: {}",
                arrow(format_map(node_selector(old)), format_map(node_selector(new)))
            ));
        }

        changes.into_meaningful()
    }

    fn primary_image(&self) -> Option<String> {
        self.spec.as_ref().and_then(|spec| first_image(&spec.template))
    }

    fn event_metadata(&self) -> Option<Value> {
        Some(json!({ "nodeSelector": node_selector(self).cloned().unwrap_or_default() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn set_node_selector(ds: &mut DaemonSet, pairs: &[(&str, &str)]) {
        ds.spec
            .as_mut()
            .unwrap()
            .template
            .spec
            .as_mut()
            .unwrap()
            .node_selector = Some(string_map(pairs));
    }

    #[test]
    fn test_node_selector_is_compared_structurally() {
        let mut old = daemon_set("monitoring", "node-exporter", "prom/node-exporter:1.7");
        set_node_selector(&mut old, &[("kubernetes.io/os", "linux"), ("tier", "worker")]);
        let mut same = old.clone();
        set_node_selector(&mut same, &[("tier", "worker"), ("kubernetes.io/os", "linux")]);
        assert!(DaemonSet::detect_change(&old, &same).is_none());

        let mut new = old.clone();
        set_node_selector(&mut new, &[("kubernetes.io/os", "linux")]);
        let change = DaemonSet::detect_change(&old, &new).unwrap();
        assert_eq!(
            change.changes(),
            &["Node selector changed: kubernetes.io/os=linux,tier=worker → kubernetes.io/os=linux"
                .to_string()]
        );
    }

    #[test]
    fn test_image_change_and_metadata() {
        let old = daemon_set("monitoring", "node-exporter", "prom/node-exporter:1.7");
        let new = daemon_set("monitoring", "node-exporter", "prom/node-exporter:1.8");

        let change = DaemonSet::detect_change(&old, &new).unwrap();

        assert_eq!(
            change.render(),
            "DaemonSet configuration changed:\nContainer agent image: prom/node-exporter:1.7 → prom/node-exporter:1.8"
        );
        assert_eq!(new.event_metadata(), Some(json!({ "nodeSelector": {} })));
    }
}
