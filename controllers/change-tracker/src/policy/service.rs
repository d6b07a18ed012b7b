//! Service policy: type, selector, ports, external IPs.

use super::{arrow, ChangeSet, TrackedKind};
use k8s_openapi::api::core::v1::{Service, ServicePort};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde_json::{json, Value};
use snapshot_diff::maps::format_map;
use snapshot_diff::{display_opt, join_or_none, maps_equal};

fn service_type(svc: &Service) -> &str {
    svc.spec
        .as_ref()
        .and_then(|spec| spec.type_.as_deref())
        .unwrap_or("ClusterIP")
}

fn ports(svc: &Service) -> &[ServicePort] {
    svc.spec
        .as_ref()
        .and_then(|spec| spec.ports.as_deref())
        .unwrap_or(&[])
}

fn external_ips(svc: &Service) -> &[String] {
    svc.spec
        .as_ref()
        .and_then(|spec| spec.external_ips.as_deref())
        .unwrap_or(&[])
}

fn target_port(port: &ServicePort) -> String {
    match &port.target_port {
        Some(IntOrString::Int(n)) => n.to_string(),
        Some(IntOrString::String(name)) => name.clone(),
        // Unset target port defaults to the service port
        None => port.port.to_string(),
    }
}

impl TrackedKind for Service {
    fn detect_change(old: &Self, new: &Self) -> Option<ChangeSet> {
        let mut changes = ChangeSet::headed("Service configuration changed:");

        if service_type(old) != service_type(new) {
            changes.push(format!("Type: {}", arrow(service_type(old), service_type(new))));
        }

        let old_selector = old.spec.as_ref().and_then(|spec| spec.selector.as_ref());
        let new_selector = new.spec.as_ref().and_then(|spec| spec.selector.as_ref());
        if !maps_equal(old_selector, new_selector) {
            changes.push(format!(
                "Selector changed: {}",
                arrow(format_map(old_selector), format_map(new_selector))
            ));
        }

        let (old_ports, new_ports) = (ports(old), ports(new));
        if old_ports.len() != new_ports.len() {
            changes.push(format!("Ports count: {}", arrow(old_ports.len(), new_ports.len())));
        } else {
            for (o, n) in old_ports.iter().zip(new_ports) {
                let (old_target, new_target) = (target_port(o), target_port(n));
                if o.port != n.port || old_target != new_target {
                    changes.push(format!(
                        "Port {}: {}",
                        display_opt(n.name.as_deref()),
                        arrow(
                            format!("{}/{}", o.port, old_target),
                            format!("{}/{}", n.port, new_target)
                        )
                    ));
                }
            }
        }

        let (old_ips, new_ips) = (external_ips(old), external_ips(new));
        if old_ips != new_ips {
            changes.push(format!(
                "External IPs: {}",
                arrow(join_or_none(old_ips), join_or_none(new_ips))
            ));
        }

        changes.into_meaningful()
    }

    fn event_metadata(&self) -> Option<Value> {
        Some(json!({ "type": service_type(self), "ports": ports(self).len() }))
    }
}
