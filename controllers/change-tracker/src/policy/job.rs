//! Job policy. Counter updates from the job controller never reach it.

use super::{arrow, push_image_changes, ChangeSet, TrackedKind};
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use serde_json::{json, Value};
use snapshot_diff::{display_opt, first_image};

impl TrackedKind for Job {
    fn detect_change(old: &Self, new: &Self) -> Option<ChangeSet> {
        let mut changes = ChangeSet::headed("Job configuration changed:");
        let (old_spec, new_spec) = (old.spec.as_ref(), new.spec.as_ref());

        let parallelism = |spec: Option<&JobSpec>| spec.and_then(|s| s.parallelism);
        if parallelism(old_spec) != parallelism(new_spec) {
            changes.push(format!(
                "Parallelism: {}",
                arrow(display_opt(parallelism(old_spec)), display_opt(parallelism(new_spec)))
            ));
        }

        let completions = |spec: Option<&JobSpec>| spec.and_then(|s| s.completions);
        if completions(old_spec) != completions(new_spec) {
            changes.push(format!(
                "Completions: {}",
                arrow(display_opt(completions(old_spec)), display_opt(completions(new_spec)))
            ));
        }

        push_image_changes(
            &mut changes,
            old_spec.map(|spec| &spec.template),
            new_spec.map(|spec| &spec.template),
        );

        let backoff_limit = |spec: Option<&JobSpec>| spec.and_then(|s| s.backoff_limit);
        if backoff_limit(old_spec) != backoff_limit(new_spec) {
            changes.push(format!(
                "Backoff limit: {}",
                arrow(display_opt(backoff_limit(old_spec)), display_opt(backoff_limit(new_spec)))
            ));
        }

        changes.into_meaningful()
    }

    fn is_status_only(old: &Self, new: &Self) -> bool {
        old.spec == new.spec
    }

    fn primary_image(&self) -> Option<String> {
        self.spec.as_ref().and_then(|spec| first_image(&spec.template))
    }

    fn event_metadata(&self) -> Option<Value> {
        let spec = self.spec.as_ref();
        Some(json!({
            "parallelism": spec.and_then(|s| s.parallelism),
            "completions": spec.and_then(|s| s.completions),
        }))
    }
}
