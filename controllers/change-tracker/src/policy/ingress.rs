//! Ingress policy: important annotations, class, rules, TLS.

use super::{arrow, ChangeSet, TrackedKind};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, Ingress, IngressRule, IngressServiceBackend,
};
use kube::ResourceExt;
use serde_json::{json, Value};
use snapshot_diff::{diff_keys, display_opt};
use std::collections::BTreeMap;

/// Annotations that change routing or certificates
const IMPORTANT_ANNOTATIONS: &[&str] = &[
    "kubernetes.io/ingress.class",
    "cert-manager.io/cluster-issuer",
    "cert-manager.io/issuer",
    "nginx.ingress.kubernetes.io/rewrite-target",
];

/// Annotation prefixes where every key counts
const IMPORTANT_ANNOTATION_PREFIXES: &[&str] = &["konghq.com/"];

fn is_important(key: &str) -> bool {
    IMPORTANT_ANNOTATIONS.contains(&key)
        || IMPORTANT_ANNOTATION_PREFIXES
            .iter()
            .any(|prefix| key.starts_with(prefix))
}

fn important_annotations(ingress: &Ingress) -> BTreeMap<String, String> {
    ingress
        .annotations()
        .iter()
        .filter(|(key, _)| is_important(key))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn rules(ingress: &Ingress) -> &[IngressRule] {
    ingress
        .spec
        .as_ref()
        .and_then(|spec| spec.rules.as_deref())
        .unwrap_or(&[])
}

fn hosts(ingress: &Ingress) -> Vec<String> {
    rules(ingress)
        .iter()
        .filter_map(|rule| rule.host.clone())
        .collect()
}

fn tls_count(ingress: &Ingress) -> usize {
    ingress
        .spec
        .as_ref()
        .and_then(|spec| spec.tls.as_ref())
        .map_or(0, Vec::len)
}

fn class_name(ingress: &Ingress) -> Option<&str> {
    ingress
        .spec
        .as_ref()
        .and_then(|spec| spec.ingress_class_name.as_deref())
}

fn compare_paths(
    host: &str,
    old: &[HTTPIngressPath],
    new: &[HTTPIngressPath],
    changes: &mut ChangeSet,
) {
    if old.len() != new.len() {
        changes.push(format!("Paths count for {}: {}", host, arrow(old.len(), new.len())));
        return;
    }

    for (o, n) in old.iter().zip(new) {
        if o.path != n.path {
            changes.push(format!(
                "Path for {}: {}",
                host,
                arrow(display_opt(o.path.as_deref()), display_opt(n.path.as_deref()))
            ));
        }

        if let (Some(old_svc), Some(new_svc)) = (&o.backend.service, &n.backend.service) {
            if old_svc.name != new_svc.name {
                changes.push(format!("Backend service: {}", arrow(&old_svc.name, &new_svc.name)));
            }
            let port = |svc: &IngressServiceBackend| {
                svc.port.as_ref().and_then(|p| p.number)
            };
            if port(old_svc) != port(new_svc) {
                changes.push(format!(
                    "Backend port: {}",
                    arrow(display_opt(port(old_svc)), display_opt(port(new_svc)))
                ));
            }
        }
    }
}

impl TrackedKind for Ingress {
    fn detect_change(old: &Self, new: &Self) -> Option<ChangeSet> {
        let mut changes = ChangeSet::headed("Ingress configuration changed:");

        let old_annotations = important_annotations(old);
        let new_annotations = important_annotations(new);
        let delta = diff_keys(Some(&old_annotations), Some(&new_annotations));
        let mut touched: Vec<&String> = delta
            .added
            .iter()
            .chain(&delta.modified)
            .chain(&delta.removed)
            .collect();
        touched.sort();
        for key in touched {
            match new_annotations.get(key) {
                Some(new_value) => {
                    let old_value = old_annotations
                        .get(key)
                        .map(String::as_str)
                        .unwrap_or_default();
                    changes.push(format!(
                        "Annotation {}: '{}' → '{}'",
                        key, old_value, new_value
                    ));
                }
                None => changes.push(format!("Annotation {} removed", key)),
            }
        }

        if class_name(old) != class_name(new) {
            changes.push(format!(
                "Ingress class: {}",
                arrow(display_opt(class_name(old)), display_opt(class_name(new)))
            ));
        }

        let (old_rules, new_rules) = (rules(old), rules(new));
        if old_rules.len() != new_rules.len() {
            changes.push(format!("Rules count: {}", arrow(old_rules.len(), new_rules.len())));
        } else {
            for (o, n) in old_rules.iter().zip(new_rules) {
                if o.host != n.host {
                    changes.push(format!(
                        "Host changed: {}",
                        arrow(display_opt(o.host.as_deref()), display_opt(n.host.as_deref()))
                    ));
                }
                if let (Some(old_http), Some(new_http)) = (&o.http, &n.http) {
                    let host = n.host.as_deref().unwrap_or("*");
                    compare_paths(host, &old_http.paths, &new_http.paths, &mut changes);
                }
            }
        }

        if tls_count(old) != tls_count(new) {
            changes.push(format!("TLS config count: {}", arrow(tls_count(old), tls_count(new))));
        }

        changes.into_meaningful()
    }

    fn event_metadata(&self) -> Option<Value> {
        Some(json!({ "hosts": hosts(self) }))
    }
}
