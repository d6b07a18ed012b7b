//! Secret policy. Only key names and the type ever leave this module.

use super::{arrow, ChangeSet, TrackedKind};
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use serde_json::{json, Value};
use snapshot_diff::diff_keys;
use snapshot_diff::maps::key_names;

/// Secret types written by the platform rather than by operators
const PLATFORM_SECRET_TYPES: &[&str] =
    &["kubernetes.io/service-account-token", "helm.sh/release.v1"];

const VALUES_HIDDEN: &str = "(Secret values are not displayed for security)";

fn secret_type(secret: &Secret) -> &str {
    secret.type_.as_deref().unwrap_or("Opaque")
}

impl TrackedKind for Secret {
    fn detect_change(old: &Self, new: &Self) -> Option<ChangeSet> {
        let mut changes = ChangeSet::new();

        if secret_type(old) != secret_type(new) {
            changes.push(format!(
                "Secret type changed: {}",
                arrow(secret_type(old), secret_type(new))
            ));
            return changes.into_meaningful();
        }

        let delta = diff_keys(old.data.as_ref(), new.data.as_ref());
        if !delta.added.is_empty() {
            changes.push(format!("Keys added: {}", delta.added.join(", ")));
        }
        if !delta.removed.is_empty() {
            changes.push(format!("Keys removed: {}", delta.removed.join(", ")));
        }
        if !delta.modified.is_empty() {
            changes.push(format!("Keys modified: {}", delta.modified.join(", ")));
            changes.set_detail(VALUES_HIDDEN);
        }

        changes.into_meaningful()
    }

    fn is_excluded(&self) -> bool {
        PLATFORM_SECRET_TYPES.contains(&secret_type(self)) || !self.owner_references().is_empty()
    }

    fn describe_added(&self) -> String {
        let keys = self.data.as_ref().map_or(0, |data| data.len());
        format!("Secret created ({}) with {} key(s)", secret_type(self), keys)
    }

    fn event_metadata(&self) -> Option<Value> {
        Some(json!({
            "type": secret_type(self),
            "keys": key_names(self.data.as_ref()),
        }))
    }
}
