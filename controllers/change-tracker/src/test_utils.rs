//! Test utilities for policy and watch-loop tests
//!
//! Builders for typed snapshots with just enough fields populated to
//! exercise the change policies.

use k8s_openapi::api::apps::v1::{
    DaemonSet, DaemonSetSpec, Deployment, DeploymentSpec, StatefulSet, StatefulSetSpec,
};
use k8s_openapi::api::batch::v1::{CronJob, CronJobSpec, Job, JobSpec, JobTemplateSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, Container, PodSpec, PodTemplateSpec, Secret, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use k8s_openapi::ByteString;
use std::collections::BTreeMap;

/// Object metadata with namespace, name and a resource version.
pub fn meta(namespace: &str, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        resource_version: Some("1".to_string()),
        ..Default::default()
    }
}

pub fn container(name: &str, image: &str) -> Container {
    Container {
        name: name.to_string(),
        image: Some(image.to_string()),
        ..Default::default()
    }
}

pub fn pod_template(containers: Vec<Container>) -> PodTemplateSpec {
    PodTemplateSpec {
        metadata: None,
        spec: Some(PodSpec {
            containers,
            ..Default::default()
        }),
    }
}

pub fn string_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Bumps the resource version the way the API server does on every write.
pub fn bump<K: kube::Resource>(obj: &mut K) {
    let meta = obj.meta_mut();
    let next = meta
        .resource_version
        .as_deref()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0)
        + 1;
    meta.resource_version = Some(next.to_string());
}

pub fn deployment(namespace: &str, name: &str, replicas: i32, image: &str) -> Deployment {
    Deployment {
        metadata: meta(namespace, name),
        spec: Some(DeploymentSpec {
            replicas: Some(replicas),
            selector: LabelSelector {
                match_labels: Some(string_map(&[("app", name)])),
                ..Default::default()
            },
            template: pod_template(vec![container("app", image)]),
            ..Default::default()
        }),
        status: None,
    }
}

pub fn config_map(namespace: &str, name: &str, data: &[(&str, &str)]) -> ConfigMap {
    ConfigMap {
        metadata: meta(namespace, name),
        data: Some(string_map(data)),
        ..Default::default()
    }
}

pub fn secret(namespace: &str, name: &str, type_: &str, data: &[(&str, &[u8])]) -> Secret {
    Secret {
        metadata: meta(namespace, name),
        type_: Some(type_.to_string()),
        data: Some(
            data.iter()
                .map(|(k, v)| (k.to_string(), ByteString(v.to_vec())))
                .collect(),
        ),
        ..Default::default()
    }
}

pub fn service_port(name: &str, port: i32, target_port: i32) -> ServicePort {
    ServicePort {
        name: Some(name.to_string()),
        port,
        target_port: Some(IntOrString::Int(target_port)),
        ..Default::default()
    }
}

pub fn service(namespace: &str, name: &str, type_: &str, ports: Vec<ServicePort>) -> Service {
    Service {
        metadata: meta(namespace, name),
        spec: Some(ServiceSpec {
            type_: Some(type_.to_string()),
            selector: Some(string_map(&[("app", name)])),
            ports: Some(ports),
            ..Default::default()
        }),
        status: None,
    }
}

pub fn ingress_rule(host: &str, path: &str, backend: &str, port: i32) -> IngressRule {
    IngressRule {
        host: Some(host.to_string()),
        http: Some(HTTPIngressRuleValue {
            paths: vec![HTTPIngressPath {
                path: Some(path.to_string()),
                path_type: "Prefix".to_string(),
                backend: IngressBackend {
                    service: Some(IngressServiceBackend {
                        name: backend.to_string(),
                        port: Some(ServiceBackendPort {
                            number: Some(port),
                            ..Default::default()
                        }),
                    }),
                    ..Default::default()
                },
            }],
        }),
    }
}

pub fn ingress(namespace: &str, name: &str, rules: Vec<IngressRule>) -> Ingress {
    Ingress {
        metadata: meta(namespace, name),
        spec: Some(IngressSpec {
            rules: Some(rules),
            ..Default::default()
        }),
        status: None,
    }
}

pub fn stateful_set(namespace: &str, name: &str, replicas: i32, image: &str) -> StatefulSet {
    StatefulSet {
        metadata: meta(namespace, name),
        spec: Some(StatefulSetSpec {
            replicas: Some(replicas),
            service_name: name.to_string().into(),
            selector: LabelSelector {
                match_labels: Some(string_map(&[("app", name)])),
                ..Default::default()
            },
            template: pod_template(vec![container("main", image)]),
            ..Default::default()
        }),
        status: None,
    }
}

pub fn daemon_set(namespace: &str, name: &str, image: &str) -> DaemonSet {
    DaemonSet {
        metadata: meta(namespace, name),
        spec: Some(DaemonSetSpec {
            selector: LabelSelector {
                match_labels: Some(string_map(&[("app", name)])),
                ..Default::default()
            },
            template: pod_template(vec![container("agent", image)]),
            ..Default::default()
        }),
        status: None,
    }
}

pub fn job_spec(image: &str) -> JobSpec {
    JobSpec {
        parallelism: Some(1),
        completions: Some(1),
        backoff_limit: Some(6),
        template: pod_template(vec![container("task", image)]),
        ..Default::default()
    }
}

pub fn job(namespace: &str, name: &str, image: &str) -> Job {
    Job {
        metadata: meta(namespace, name),
        spec: Some(job_spec(image)),
        status: None,
    }
}

pub fn cron_job(namespace: &str, name: &str, schedule: &str, image: &str) -> CronJob {
    CronJob {
        metadata: meta(namespace, name),
        spec: Some(CronJobSpec {
            schedule: schedule.to_string(),
            job_template: JobTemplateSpec {
                metadata: None,
                spec: Some(job_spec(image)),
            },
            ..Default::default()
        }),
        status: None,
    }
}
