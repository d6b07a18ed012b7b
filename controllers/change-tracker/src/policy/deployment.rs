//! Deployment policy: scale, first-container image, resources, env, strategy.

use super::{arrow, ChangeSet, TrackedKind};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Container;
use serde_json::{json, Value};
use snapshot_diff::{containers, display_opt, first_image, resource_lists_equal};

/// Resource names compared for requests and limits
const TRACKED_RESOURCES: &[&str] = &["cpu", "memory"];

/// Replica count, defaulting to the API default of 1 when unset.
fn replicas(deployment: &Deployment) -> i32 {
    deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(1)
}

fn first_container(deployment: &Deployment) -> Option<&Container> {
    deployment
        .spec
        .as_ref()
        .and_then(|spec| containers(&spec.template).first())
}

fn strategy_type(deployment: &Deployment) -> Option<&str> {
    deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.strategy.as_ref())
        .and_then(|strategy| strategy.type_.as_deref())
}

impl TrackedKind for Deployment {
    fn detect_change(old: &Self, new: &Self) -> Option<ChangeSet> {
        let mut changes = ChangeSet::new();

        let (old_replicas, new_replicas) = (replicas(old), replicas(new));
        if new_replicas > old_replicas {
            changes.push(format!("Scaled up: {} replicas", arrow(old_replicas, new_replicas)));
        } else if new_replicas < old_replicas {
            changes.push(format!("Scaled down: {} replicas", arrow(old_replicas, new_replicas)));
        }

        if let (Some(old_c), Some(new_c)) = (first_container(old), first_container(new)) {
            if old_c.image != new_c.image {
                changes.push(format!(
                    "Image updated: {}",
                    arrow(display_opt(old_c.image.as_deref()), display_opt(new_c.image.as_deref()))
                ));
            }

            let old_res = old_c.resources.as_ref();
            let new_res = new_c.resources.as_ref();
            if !resource_lists_equal(
                old_res.and_then(|r| r.limits.as_ref()),
                new_res.and_then(|r| r.limits.as_ref()),
                TRACKED_RESOURCES,
            ) {
                changes.push("Resource limits updated");
            }
            if !resource_lists_equal(
                old_res.and_then(|r| r.requests.as_ref()),
                new_res.and_then(|r| r.requests.as_ref()),
                TRACKED_RESOURCES,
            ) {
                changes.push("Resource requests updated");
            }

            let env_len = |c: &Container| c.env.as_ref().map_or(0, Vec::len);
            if env_len(old_c) != env_len(new_c) {
                changes.push("Environment variables updated");
            }
        }

        if strategy_type(old) != strategy_type(new) {
            changes.push(format!(
                "Deployment strategy changed: {}",
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use k8s_openapi::api::apps::v1::DeploymentStrategy;
    use k8s_openapi::api::core::v1::{EnvVar, ResourceRequirements};
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use std::collections::BTreeMap;

    fn resources(cpu: &str, memory: &str) -> ResourceRequirements {
        ResourceRequirements {
            limits: Some(BTreeMap::from([
                ("cpu".to_string(), Quantity(cpu.to_string())),
                ("memory".to_string(), Quantity(memory.to_string())),
            ])),
            ..Default::default()
        }
    }

    fn first_container_mut(d: &mut Deployment) -> &mut Container {
        &mut d.spec.as_mut().unwrap().template.spec.as_mut().unwrap().containers[0]
    }

    #[test]
    fn test_scale_up_and_down_are_directional() {
        let old = deployment("prod", "web", 2, "nginx:1.25");
        let mut up = old.clone();
        up.spec.as_mut().unwrap().replicas = Some(4);

        let change = Deployment::detect_change(&old, &up).unwrap();
        assert_eq!(change.summary(), "Scaled up: 2 → 4 replicas");

        let change = Deployment::detect_change(&up, &old).unwrap();
        assert_eq!(change.summary(), "Scaled down: 4 → 2 replicas");
    }

    #[test]
    fn test_first_detected_change_is_summary() {
        let old = deployment("prod", "web", 2, "nginx:1.25");
        let mut new = deployment("prod", "web", 3, "nginx:1.26");
        bump(&mut new);

        let change = Deployment::detect_change(&old, &new).unwrap();

        assert_eq!(change.summary(), "Scaled up: 2 → 3 replicas");
        assert_eq!(
            change.render(),
            "Scaled up: 2 → 3 replicas\nImage updated: nginx:1.25 → nginx:1.26"
        );
    }

    #[test]
    fn test_equivalent_resource_quantities_are_not_a_change() {
        let mut old = deployment("prod", "web", 2, "nginx:1.25");
        first_container_mut(&mut old).resources = Some(resources("1", "1Gi"));
        let mut new = old.clone();
        first_container_mut(&mut new).resources = Some(resources("1000m", "1024Mi"));

        assert!(Deployment::detect_change(&old, &new).is_none());

        first_container_mut(&mut new).resources = Some(resources("2", "1Gi"));
        let change = Deployment::detect_change(&old, &new).unwrap();
        assert_eq!(change.summary(), "Resource limits updated");
    }

    #[test]
    fn test_env_and_strategy_changes() {
        let old = deployment("prod", "web", 2, "nginx:1.25");
        let mut new = old.clone();
        first_container_mut(&mut new).env = Some(vec![EnvVar {
            name: "LOG_LEVEL".to_string(),
            value: Some("debug".to_string()),
            ..Default::default()
        }]);
        new.spec.as_mut().unwrap().strategy = Some(DeploymentStrategy {
            type_: Some("Recreate".to_string()),
            ..Default::default()
        });

        let change = Deployment::detect_change(&old, &new).unwrap();
        assert_eq!(
            change.changes(),
            &[
                "Environment variables updated".to_string(),
                "Deployment strategy changed: <unset> → Recreate".to_string(),
            ]
        );
    }

    #[test]
    fn test_status_only_update_is_not_meaningful() {
        let old = deployment("prod", "web", 2, "nginx:1.25");
        let mut new = old.clone();
        bump(&mut new);
        new.status = Some(Default::default());

        assert!(Deployment::detect_change(&old, &new).is_none());
    }

    #[test]
    fn test_image_and_metadata_extraction() {
        let d = deployment("prod", "web", 3, "nginx:1.25");
        assert_eq!(d.primary_image(), Some("nginx:1.25".to_string()));
        assert_eq!(d.event_metadata(), Some(json!({ "replicas": 3 })));
        assert_eq!(d.describe_added(), "Deployment created");
        assert_eq!(d.describe_deleted(), "Deployment deleted");
    }
}
