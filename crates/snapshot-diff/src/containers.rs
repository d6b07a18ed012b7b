//! Container helpers for pod-template-carrying workloads.

use k8s_openapi::api::core::v1::{Container, PodTemplateSpec};

/// An image change for one container slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageChange {
    /// Container name from the new snapshot
    pub container: String,
    /// Image before the change (empty when unset)
    pub before: String,
    /// Image after the change (empty when unset)
    pub after: String,
}

/// Returns the containers declared by a pod template, or an empty slice.
pub fn containers(template: &PodTemplateSpec) -> &[Container] {
    template
        .spec
        .as_ref()
        .map(|spec| spec.containers.as_slice())
        .unwrap_or(&[])
}

/// Image of the first container, when present and non-empty.
pub fn first_image(template: &PodTemplateSpec) -> Option<String> {
    containers(template)
        .first()
        .and_then(|c| c.image.clone())
        .filter(|image| !image.is_empty())
}

/// Index-aligned image comparison.
///
/// Containers are matched by position, so a container appended or removed
/// at the end is not reported here (callers compare counts separately).
pub fn image_changes(old: &[Container], new: &[Container]) -> Vec<ImageChange> {
    old.iter()
        .zip(new.iter())
        .filter(|(o, n)| o.image != n.image)
        .map(|(o, n)| ImageChange {
            container: n.name.clone(),
            before: o.image.clone().unwrap_or_default(),
            after: n.image.clone().unwrap_or_default(),
        })
        .collect()
}
