//! StatefulSet policy: replicas, images, service name, claim templates, strategy.

use super::{arrow, push_image_changes, ChangeSet, TrackedKind};
use k8s_openapi::api::apps::v1::StatefulSet;
use serde_json::{json, Value};
use snapshot_diff::{display_opt, first_image};

fn replicas(ss: &StatefulSet) -> i32 {
    ss.spec.as_ref().and_then(|spec| spec.replicas).unwrap_or(1)
}

fn service_name(ss: &StatefulSet) -> Option<String> {
    let spec = ss.spec.as_ref()?;
    let name: Option<String> = spec.service_name.clone().into();
    name.filter(|name| !name.is_empty())
}

fn claim_template_count(ss: &StatefulSet) -> usize {
    ss.spec
        .as_ref()
        .and_then(|spec| spec.volume_claim_templates.as_ref())
        .map_or(0, Vec::len)
}

fn strategy_type(ss: &StatefulSet) -> Option<&str> {
    ss.spec
        .as_ref()
        .and_then(|spec| spec.update_strategy.as_ref())
        .and_then(|strategy| strategy.type_.as_deref())
}

impl TrackedKind for StatefulSet {
    fn detect_change(old: &Self, new: &Self) -> Option<ChangeSet> {
        let mut changes = ChangeSet::headed("StatefulSet configuration changed:");

        if replicas(old) != replicas(new) {
            changes.push(format!("Replicas: {}", arrow(replicas(old), replicas(new))));
        }

        push_image_changes(
            &mut changes,
            old.spec.as_ref().map(|spec| &spec.template),
            new.spec.as_ref().map(|spec| &spec.template),
        );

        let (old_service, new_service) = (service_name(old), service_name(new));
        if old_service != new_service {
            changes.push(format!(
                "Service name: {}",
                arrow(display_opt(old_service), display_opt(new_service))
            ));
        }

        if claim_template_count(old) != claim_template_count(new) {
            changes.push(format!(
                "Volume claim templates: {}",
                arrow(claim_template_count(old), claim_template_count(new))
            ));
        }

        if strategy_type(old) != strategy_type(new) {
            changes.push(format!(
                "Update strategy: {}",
                arrow(display_opt(strategy_type(old)), display_opt(strategy_type(new)))
            ));
        }

        changes.into_meaningful()
    }

    fn primary_image(&self) -> Option<String> {
        self.spec.as_ref().and_then(|spec| first_image(&spec.template))
    }

    fn event_metadata(&self) -> Option<Value> {
        Some(json!({ "replicas": replicas(self) }))
    }
}
