//! CronJob policy: schedule, suspend, template images, concurrency policy.

use super::{arrow, push_image_changes, ChangeSet, TrackedKind};
use k8s_openapi::api::batch::v1::CronJob;
use k8s_openapi::api::core::v1::PodTemplateSpec;
use serde_json::{json, Value};
use snapshot_diff::{display_opt, first_image};

fn schedule(cj: &CronJob) -> &str {
    cj.spec.as_ref().map_or("", |spec| spec.schedule.as_str())
}

fn suspended(cj: &CronJob) -> bool {
    cj.spec.as_ref().and_then(|spec| spec.suspend).unwrap_or(false)
}

fn concurrency_policy(cj: &CronJob) -> Option<&str> {
    cj.spec
        .as_ref()
        .and_then(|spec| spec.concurrency_policy.as_deref())
}

fn pod_template(cj: &CronJob) -> Option<&PodTemplateSpec> {
    cj.spec
        .as_ref()
        .and_then(|spec| spec.job_template.spec.as_ref())
        .map(|job| &job.template)
}

impl TrackedKind for CronJob {
    fn detect_change(old: &Self, new: &Self) -> Option<ChangeSet> {
        let mut changes = ChangeSet::headed("CronJob configuration changed:");

        if schedule(old) != schedule(new) {
            changes.push(format!("Schedule: {}", arrow(schedule(old), schedule(new))));
        }

        if suspended(old) != suspended(new) {
            changes.push(format!("Suspend: {}", arrow(suspended(old), suspended(new))));
        }

        push_image_changes(&mut changes, pod_template(old), pod_template(new));

        if concurrency_policy(old) != concurrency_policy(new) {
            changes.push(format!(
                "Concurrency policy: {}",
                arrow(
                    display_opt(concurrency_policy(old)),
                    display_opt(concurrency_policy(new))
                )
            ));
        }

        changes.into_meaningful()
    }

    fn primary_image(&self) -> Option<String> {
        pod_template(self).and_then(first_image)
    }

    fn event_metadata(&self) -> Option<Value> {
        Some(json!({ "schedule": schedule(self), "suspend": suspended(self) }))
    }
}
